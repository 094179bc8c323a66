//! The `Connector` capability: the abstract boundary between the core and a
//! concrete byte-oriented transport (spec §5, §1 out-of-scope line). Concrete
//! TCP/UDP/raw-IP wrappers live outside this crate; what's in scope is the
//! trait and a bounded-ring-buffer reference implementation, since that
//! ring buffer is the one place the spec requires intra-process parallelism.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::{CoreError, Result};

/// Past this many buffered entries, the oldest is dropped to make room for
/// the newest (spec §5: "drop-oldest past ~500 000 entries").
pub const RING_CAPACITY: usize = 500_000;

/// A byte-oriented capability a target-delivery implementation drives.
/// `send` pushes bytes out; `snapshot` is a non-blocking read of whatever
/// has arrived since the last call.
pub trait Connector: Send + Sync {
    fn send(&self, bytes: &[u8]) -> Result<()>;
    fn snapshot(&self) -> Vec<Vec<u8>>;
}

/// Reference `Connector`: an independent receive loop (a background task)
/// feeds a bounded ring buffer; reads are non-blocking snapshots of its
/// current contents. Mirrors the single-consumer-background-task shape of
/// `ob-workflow::listener::TaskQueueListener`, with the polled database
/// query replaced by an `mpsc` channel drain.
pub struct RingConnector {
    inbound: mpsc::UnboundedSender<Vec<u8>>,
    ring: Arc<Mutex<VecDeque<Vec<u8>>>>,
    closed: Arc<std::sync::atomic::AtomicBool>,
}

impl RingConnector {
    /// Spawn the background receive loop and return the connector handle.
    pub fn spawn() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let ring = Arc::new(Mutex::new(VecDeque::with_capacity(1024)));
        let ring_bg = Arc::clone(&ring);
        let closed = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let closed_bg = Arc::clone(&closed);

        tokio::spawn(async move {
            while let Some(bytes) = rx.recv().await {
                let mut guard = ring_bg.lock();
                if guard.len() >= RING_CAPACITY {
                    guard.pop_front();
                }
                guard.push_back(bytes);
            }
            closed_bg.store(true, std::sync::atomic::Ordering::SeqCst);
        });

        Self {
            inbound: tx,
            ring,
            closed,
        }
    }

    /// Feed bytes into the ring as if they'd arrived from the wire. Used by
    /// tests and by whatever glues a concrete transport to this connector.
    pub fn deliver(&self, bytes: Vec<u8>) -> Result<()> {
        self.inbound
            .send(bytes)
            .map_err(|_| CoreError::ConnectorClosed)
    }

    pub fn len(&self) -> usize {
        self.ring.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Connector for RingConnector {
    fn send(&self, bytes: &[u8]) -> Result<()> {
        self.deliver(bytes.to_vec())
    }

    fn snapshot(&self) -> Vec<Vec<u8>> {
        self.ring.lock().iter().cloned().collect()
    }
}
