//! The broker's event loop as a `tokio` task: one actor owns a [`Broker`]
//! exclusively and drains an inbound channel, firing [`Broker::sweep_timeouts`]
//! on an interval. Shape directly mirrors
//! `ob-workflow::listener::TaskQueueListener::run`'s
//! `tokio::select! { sleep => .., shutdown.changed() => .. }` loop, with the
//! polled database swapped for an `mpsc` channel since the broker's state
//! lives entirely in memory (spec §5).

use std::time::{Duration, Instant};

use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::error_log::ErrorLog;
use crate::state::{Broker, Outbound, PeerId};
use fathom_core::DeliveryStatus;
use fathom_protocol::Message;

/// One inbound event: a message from a peer, tagged with the peer it came
/// from so replies route back correctly.
pub struct Inbound {
    pub from: PeerId,
    pub message: Message,
}

pub struct BrokerActor {
    broker: Broker,
    inbox: mpsc::UnboundedReceiver<Inbound>,
    outbox: mpsc::UnboundedSender<Outbound>,
    sweep_interval: Duration,
    error_log: ErrorLog,
}

impl BrokerActor {
    pub fn new(
        dbq_max: usize,
        ack_timeout: Duration,
        sweep_interval: Duration,
        inbox: mpsc::UnboundedReceiver<Inbound>,
        outbox: mpsc::UnboundedSender<Outbound>,
        error_log_path: impl Into<std::path::PathBuf>,
    ) -> Self {
        Self {
            broker: Broker::new(dbq_max, ack_timeout),
            inbox,
            outbox,
            sweep_interval,
            error_log: ErrorLog::new(error_log_path),
        }
    }

    /// Run until `shutdown` fires. Every inbound message is applied to the
    /// broker state and any resulting outbound messages are pushed to the
    /// outbox; a periodic sweep fires timed-out acks.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        info!("broker event loop started");
        let mut ticker = tokio::time::interval(self.sweep_interval);

        loop {
            if *shutdown.borrow() {
                info!("broker event loop shutting down");
                break;
            }

            tokio::select! {
                maybe_event = self.inbox.recv() => {
                    match maybe_event {
                        Some(event) => self.dispatch(event),
                        None => break,
                    }
                }
                _ = ticker.tick() => {
                    let out = self.broker.sweep_timeouts(Instant::now());
                    self.send_all(out);
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("broker event loop shutting down");
                        break;
                    }
                }
            }
        }
    }

    fn dispatch(&mut self, event: Inbound) {
        let Inbound { from, message } = event;
        let out = match message {
            Message::ClientStartup { .. } => self.broker.handle_client_startup(from),
            Message::ClientReady { queue } => self.broker.handle_client_ready(from, queue),
            Message::DbReady {} => self.broker.handle_db_ready(from),
            Message::NewTestCase {
                id,
                data,
                crc32,
                queue,
                tag,
                options,
                producer_ack_id,
            } => self.broker.handle_new_test_case(
                from,
                id,
                data,
                crc32,
                queue,
                tag,
                options,
                producer_ack_id,
            ),
            Message::AckMsg { ack_id, extras } => self.dispatch_ack(ack_id, extras),
            // `deliver`/`test_result` only ever flow broker -> peer; a
            // peer sending one back is a protocol violation we just ignore.
            Message::Deliver { .. } | Message::TestResult { .. } => Vec::new(),
        };
        self.send_all(out);
    }

    /// `ack_msg` is overloaded: it's a worker's ack of a `deliver`, or a
    /// result-store's ack of a `test_result`. Dispatch on which extras are
    /// present, since the verb alone doesn't say which.
    fn dispatch_ack(&mut self, ack_id: String, extras: fathom_protocol::Extras) -> Vec<Outbound> {
        if let Some(db_id) = extras.get("db_id").and_then(|v| v.as_str()) {
            return self.broker.handle_test_result_ack(&ack_id, db_id.to_string());
        }
        if let Some(status) = extras.get("status").and_then(|v| v.as_str()) {
            let status = match status {
                "crash" => DeliveryStatus::Crash,
                "error" => DeliveryStatus::Error,
                _ => DeliveryStatus::Success,
            };
            let detail = extras
                .get("detail")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string());
            let tag = extras
                .get("tag")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string());
            let crc32 = extras.get("crc32").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
            return match self.broker.handle_deliver_ack(&ack_id, status, detail, tag, crc32) {
                Ok(out) => out,
                Err(msg) => {
                    warn!(ack_id, %msg, "crc mismatch on deliver ack, broker bug");
                    if let Err(e) = self.error_log.record(&msg) {
                        warn!(%e, "failed to write broker error log");
                    }
                    Vec::new()
                }
            };
        }
        Vec::new()
    }

    fn send_all(&self, out: Vec<Outbound>) {
        for item in out {
            let _ = self.outbox.send(item);
        }
    }
}
