//! The producer harness (spec §4.9): on its `client_startup` ack, pull the
//! next value from a user-supplied [`fathom_generators::Generator`], tag
//! and checksum it, and submit a `new_test_case`. Stops when the
//! generator is exhausted; re-announces itself on a broker `reset`.

use fathom_core::DeliveryStatus;
use fathom_generators::Generator;
use fathom_protocol::Message;

/// Local bookkeeping the harness keeps as results come back (spec §4.9:
/// "track result in local counters").
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Counters {
    pub sent: u64,
    pub success: u64,
    pub crash: u64,
    pub error: u64,
}

pub struct Producer<G: Generator<Vec<u8>>> {
    queue: String,
    base_tag: String,
    generator: G,
    iteration: u64,
    counters: Counters,
    /// Set once the generator is exhausted; the event loop stops issuing
    /// new tests after this.
    done: bool,
}

impl<G: Generator<Vec<u8>>> Producer<G> {
    pub fn new(queue: impl Into<String>, base_tag: impl Into<String>, generator: G) -> Self {
        Self {
            queue: queue.into(),
            base_tag: base_tag.into(),
            generator,
            iteration: 0,
            counters: Counters::default(),
            done: false,
        }
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn startup(&self) -> Message {
        Message::ClientStartup {
            client_type: "producer".to_string(),
        }
    }

    /// Called on the broker's startup ack: pull the next test case and
    /// submit it. Returns `None` once the generator is exhausted, which
    /// signals the caller to stop the event loop.
    pub fn next_test_case(&mut self) -> Option<Message> {
        if self.done || !self.generator.has_next() {
            self.done = true;
            return None;
        }
        let data = match self.generator.next() {
            Ok(data) => data,
            Err(_) => {
                self.done = true;
                return None;
            }
        };

        let crc32 = crc32fast::hash(&data);
        let id = self.iteration.to_string();
        let tag = format!(
            "{}|producer_crc={crc32:08x}|ts={}|iter={}",
            self.base_tag,
            chrono::Utc::now().to_rfc3339(),
            self.iteration
        );
        self.iteration += 1;
        self.counters.sent += 1;

        Some(Message::NewTestCase {
            id: id.clone(),
            data,
            crc32,
            queue: self.queue.clone(),
            tag,
            options: serde_json::Value::Null,
            producer_ack_id: Some(id),
        })
    }

    /// Update local counters from the second-stage `ack_msg` (spec §4.7:
    /// carries `result`). The first-stage delivery-receipt ack has no
    /// `result` key and is ignored here.
    pub fn handle_ack(&mut self, msg: &Message) {
        let Message::AckMsg { extras, .. } = msg else {
            return;
        };
        let Some(result) = extras.get("result").and_then(|v| v.as_str()) else {
            return;
        };
        match result {
            "success" => self.counters.success += 1,
            "crash" => self.counters.crash += 1,
            "error" => self.counters.error += 1,
            _ => {}
        }
    }

    /// On a broker `reset`, re-announce presence (spec §4.9).
    pub fn on_reset(&self) -> Message {
        self.startup()
    }
}

/// Convenience for mapping a `result` string back to [`DeliveryStatus`]
/// in callers that need the typed form.
pub fn status_from_result(result: &str) -> Option<DeliveryStatus> {
    match result {
        "success" => Some(DeliveryStatus::Success),
        "error" => Some(DeliveryStatus::Error),
        "crash" => Some(DeliveryStatus::Crash),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fathom_generators::VecGenerator;

    #[test]
    fn submits_each_generator_value_then_stops() {
        let gen = VecGenerator::new(vec![b"a".to_vec(), b"b".to_vec()]);
        let mut producer = Producer::new("q", "base", gen);

        let first = producer.next_test_case().unwrap();
        let Message::NewTestCase { data, crc32, .. } = &first else {
            panic!("expected new_test_case");
        };
        assert_eq!(data, b"a");
        assert_eq!(*crc32, crc32fast::hash(b"a"));
        assert_eq!(producer.counters().sent, 1);

        assert!(producer.next_test_case().is_some());
        assert!(producer.next_test_case().is_none());
        assert!(producer.is_done());
    }

    #[test]
    fn handle_ack_updates_counters_by_result() {
        let gen = VecGenerator::new(vec![b"a".to_vec()]);
        let mut producer = Producer::new("q", "base", gen);
        let mut extras = fathom_protocol::Extras::new();
        extras.insert("result".to_string(), "crash".into());
        producer.handle_ack(&Message::ack("1", extras));
        assert_eq!(producer.counters().crash, 1);
    }

    #[test]
    fn delivery_receipt_without_result_key_is_ignored() {
        let gen = VecGenerator::new(vec![b"a".to_vec()]);
        let mut producer = Producer::new("q", "base", gen);
        producer.handle_ack(&Message::ack("1", fathom_protocol::Extras::new()));
        assert_eq!(producer.counters(), Counters::default());
    }
}
