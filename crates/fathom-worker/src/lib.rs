//! The worker harness (spec §4.8): a `client_ready`/`deliver` loop around a
//! user-supplied delivery hook. State is the host's stable UUID plus the
//! hook itself, owned by one event loop (spec §5) — no transport here,
//! since the connector/socket plumbing is out of scope.

use std::panic::{catch_unwind, AssertUnwindSafe};

use uuid::Uuid;

use fathom_core::DeliveryStatus;
use fathom_protocol::{Extras, Message};

/// What the delivery hook reports back after running one test.
#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    pub status: DeliveryStatus,
    pub detail: Option<String>,
}

impl DeliveryOutcome {
    pub fn success() -> Self {
        Self {
            status: DeliveryStatus::Success,
            detail: None,
        }
    }

    pub fn crash(detail: impl Into<String>) -> Self {
        Self {
            status: DeliveryStatus::Crash,
            detail: Some(detail.into()),
        }
    }
}

/// Runs one test case against the target and reports the outcome. Must
/// not panic for a sound result — a panic is caught and treated as a
/// dropped delivery (spec §4.8: "on any exception in the hook, silently
/// drop"), but catching it still means the hook's own state (if any) may
/// be left inconsistent, so hooks should avoid relying on that.
pub type DeliveryHook = Box<dyn Fn(&[u8]) -> DeliveryOutcome + Send + Sync>;

pub struct Worker {
    host_id: Uuid,
    queue: String,
    hook: DeliveryHook,
}

impl Worker {
    pub fn new(queue: impl Into<String>, hook: DeliveryHook) -> Self {
        Self {
            host_id: Uuid::new_v4(),
            queue: queue.into(),
            hook,
        }
    }

    /// The idle-loop heartbeat sent on startup and after finishing a
    /// delivery (spec §4.8: "after handling, resume the idle `client_ready`
    /// loop").
    pub fn client_ready(&self) -> Message {
        Message::ClientReady {
            queue: self.queue.clone(),
        }
    }

    /// Handle one `deliver` message. Returns `None` when nothing should be
    /// sent back to the broker: either the hook panicked (so the broker's
    /// ack-timeout will re-deliver) or `msg` wasn't a `deliver` at all.
    pub fn handle_deliver(&self, msg: &Message) -> Option<Message> {
        let Message::Deliver {
            ack_id,
            data,
            crc32,
            tag,
            ..
        } = msg
        else {
            return None;
        };

        if crc32fast::hash(data) != *crc32 {
            let mut extras = Extras::new();
            extras.insert("status".to_string(), DeliveryStatus::Error.as_str().into());
            return Some(Message::ack(ack_id.clone(), extras));
        }

        let outcome = catch_unwind(AssertUnwindSafe(|| (self.hook)(data)));
        let outcome = outcome.ok()?;

        let mut extras = Extras::new();
        extras.insert("status".to_string(), outcome.status.as_str().into());
        extras.insert("crc32".to_string(), (*crc32).into());
        if let Some(detail) = &outcome.detail {
            extras.insert("detail".to_string(), detail.clone().into());
        }

        let tag = if outcome.status == DeliveryStatus::Crash {
            self.crash_tag(data, outcome.detail.as_deref().unwrap_or(""), *crc32, tag)
        } else {
            tag.clone()
        };
        extras.insert("tag".to_string(), tag.into());

        Some(Message::ack(ack_id.clone(), extras))
    }

    /// Augment the producer's tag with a per-host UUID and MD5s of the
    /// data and debugger detail, so two crashes from different hosts
    /// against the same template are distinguishable (spec §4.8).
    fn crash_tag(&self, data: &[u8], detail: &str, crc32: u32, original_tag: &str) -> String {
        use md5::{Digest, Md5};
        let data_md5 = {
            let mut h = Md5::new();
            h.update(data);
            hex::encode(h.finalize())
        };
        let detail_md5 = {
            let mut h = Md5::new();
            h.update(detail.as_bytes());
            hex::encode(h.finalize())
        };
        format!(
            "{original_tag}|host={}|data_md5={data_md5}|detail_md5={detail_md5}|crc32={crc32:08x}|ts={}",
            self.host_id,
            chrono::Utc::now().to_rfc3339(),
        )
    }
}
