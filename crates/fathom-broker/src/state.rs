//! The broker's single-writer event-loop state (spec §4.7): per-queue
//! pending-test/ready-worker FIFOs, the global result-store FIFOs, the
//! `unanswered`-ack timeout table, and `queue_shedding` backpressure.
//! Modelled as a plain struct mutated by handler methods, the way
//! `ob-workflow::listener::TaskQueueListener` keeps all mutable state on
//! `self` and drives it from one event loop — except here there's no
//! database backing the queues, since every networked component in this
//! system is single-threaded and owns its own state in memory (spec §5).

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use serde_json::Value;

use fathom_core::DeliveryStatus;
use fathom_protocol::Message;

pub type PeerId = String;
pub type AckId = String;

/// A test case queued for delivery, with everything needed to forward it
/// to a worker and, later, build the `test_result` message.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingTest {
    pub producer: PeerId,
    pub producer_ack_id: String,
    pub test_id: String,
    pub data: Vec<u8>,
    pub crc32: u32,
    pub queue: String,
    pub tag: String,
    pub options: Value,
}

/// A crash-or-plain result waiting to be handed to a result-store worker.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingResult {
    pub producer: PeerId,
    pub producer_ack_id: String,
    pub test_case_id: String,
    pub status: DeliveryStatus,
    pub payload: Vec<u8>,
    /// The worker's ack'd tag — for crashes this is the per-host-augmented
    /// tag from `crash_tag()`, not the producer's original (spec §4.7's
    /// second ack carries `tag`).
    pub tag: String,
    pub crc32: u32,
    pub raw_debug_detail: Option<String>,
}

/// What to do when an outstanding ack times out (spec §5: "either resends
/// (no-queue) or re-enqueues (queued)").
#[derive(Debug, Clone)]
enum TimeoutAction {
    RequeueTest { queue: String, test: PendingTest },
    RequeueResult { result: PendingResult },
}

struct Unanswered {
    action: TimeoutAction,
    deadline: Instant,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<PendingTest>,
    ready_workers: VecDeque<PeerId>,
}

/// One message the broker wants delivered to a peer.
pub type Outbound = (PeerId, Message);

pub struct Broker {
    queues: HashMap<String, QueueState>,
    pending_results: VecDeque<PendingResult>,
    ready_result_workers: VecDeque<PeerId>,
    unanswered: HashMap<AckId, Unanswered>,
    /// `in_flight_delivers[ack_id]` is the test awaiting a worker's
    /// `deliver` ack, plus the producer ack-id to fire the delivery
    /// receipt against.
    in_flight_delivers: HashMap<AckId, PendingTest>,
    in_flight_results: HashMap<AckId, PendingResult>,
    pub queue_shedding: bool,
    pub dbq_max: usize,
    pub ack_timeout: Duration,
    next_ack_id: u64,
}

impl Broker {
    pub fn new(dbq_max: usize, ack_timeout: Duration) -> Self {
        Self {
            queues: HashMap::new(),
            pending_results: VecDeque::new(),
            ready_result_workers: VecDeque::new(),
            unanswered: HashMap::new(),
            in_flight_delivers: HashMap::new(),
            in_flight_results: HashMap::new(),
            queue_shedding: false,
            dbq_max,
            ack_timeout,
            next_ack_id: 1,
        }
    }

    fn fresh_ack_id(&mut self) -> AckId {
        let id = self.next_ack_id;
        self.next_ack_id += 1;
        id.to_string()
    }

    fn arm(&mut self, ack_id: AckId, action: TimeoutAction) {
        self.unanswered.insert(
            ack_id,
            Unanswered {
                action,
                deadline: Instant::now() + self.ack_timeout,
            },
        );
    }

    /// Cancel a timer on ack receipt (spec §5: "a single table delete +
    /// callback fire").
    fn disarm(&mut self, ack_id: &str) {
        self.unanswered.remove(ack_id);
    }

    // ---- client_startup ----

    pub fn handle_client_startup(&mut self, from: PeerId) -> Vec<Outbound> {
        let ack_id = self.fresh_ack_id();
        vec![(from, Message::startup_ack(ack_id))]
    }

    // ---- client_ready / new_test_case matching ----

    pub fn handle_client_ready(&mut self, from: PeerId, queue: String) -> Vec<Outbound> {
        let mut out = Vec::new();
        if self.queue_shedding {
            // Invariant 10: stays unmatched even with pending tests.
            self.queues.entry(queue).or_default().ready_workers.push_back(from);
            return out;
        }
        let state = self.queues.entry(queue.clone()).or_default();
        if let Some(test) = state.pending.pop_front() {
            out.push(self.deliver(from, test));
        } else {
            state.ready_workers.push_back(from);
        }
        out
    }

    pub fn handle_new_test_case(
        &mut self,
        producer: PeerId,
        id: String,
        data: Vec<u8>,
        crc32: u32,
        queue: String,
        tag: String,
        options: Value,
        producer_ack_id: Option<String>,
    ) -> Vec<Outbound> {
        let producer_ack_id = producer_ack_id.unwrap_or_else(|| id.clone());

        // Invariant 9: duplicate producer_ack_id before first delivery is dropped.
        let already_pending = self
            .queues
            .get(&queue)
            .map(|q| q.pending.iter().any(|t| t.producer_ack_id == producer_ack_id))
            .unwrap_or(false)
            || self
                .in_flight_delivers
                .values()
                .any(|t| t.producer_ack_id == producer_ack_id);
        if already_pending {
            return Vec::new();
        }

        let test = PendingTest {
            producer,
            producer_ack_id,
            test_id: id,
            data,
            crc32,
            queue: queue.clone(),
            tag,
            options,
        };

        let mut out = Vec::new();
        let state = self.queues.entry(queue).or_default();
        if !self.queue_shedding {
            if let Some(worker) = state.ready_workers.pop_front() {
                out.push(self.deliver(worker, test));
                return out;
            }
        }
        state.pending.push_back(test);
        out
    }

    fn deliver(&mut self, worker: PeerId, test: PendingTest) -> Outbound {
        let ack_id = self.fresh_ack_id();
        let msg = Message::Deliver {
            ack_id: ack_id.clone(),
            data: test.data.clone(),
            server_id: test.test_id.clone(),
            producer_ack_id: test.producer_ack_id.clone(),
            crc32: test.crc32,
            tag: test.tag.clone(),
            options: test.options.clone(),
        };
        self.in_flight_delivers.insert(ack_id.clone(), test.clone());
        self.arm(
            ack_id.clone(),
            TimeoutAction::RequeueTest {
                queue: test.queue.clone(),
                test,
            },
        );
        (worker, msg)
    }

    /// A worker's ack for a `deliver` (spec §4.7's "on `deliver` ack from a
    /// worker"). `their_crc32` is what the worker echoed back against the
    /// broker's own stored `test.crc32`. The result payload is always the
    /// broker's own stored `test.data` — the worker's ack never carries the
    /// raw bytes back, only status/detail/tag.
    pub fn handle_deliver_ack(
        &mut self,
        ack_id: &str,
        status: DeliveryStatus,
        raw_debug_detail: Option<String>,
        tag: Option<String>,
        their_crc32: u32,
    ) -> Result<Vec<Outbound>, String> {
        self.disarm(ack_id);
        let Some(test) = self.in_flight_delivers.remove(ack_id) else {
            return Ok(Vec::new());
        };
        if test.crc32 != their_crc32 {
            // Broker bug, not a worker bug: the broker's own stored CRC
            // should always match what it sent.
            return Err(format!(
                "crc mismatch for ack {ack_id}: stored {} != echoed {their_crc32}",
                test.crc32
            ));
        }

        let mut out = Vec::new();
        // Delivery receipt: first of the two producer acks (spec §4.7).
        out.push((
            test.producer.clone(),
            Message::ack(test.producer_ack_id.clone(), Default::default()),
        ));

        if status == DeliveryStatus::Error {
            return Ok(out);
        }

        let result = PendingResult {
            producer: test.producer,
            producer_ack_id: test.producer_ack_id,
            test_case_id: test.test_id,
            status,
            payload: test.data,
            tag: tag.unwrap_or(test.tag),
            crc32: test.crc32,
            raw_debug_detail,
        };
        out.extend(self.enqueue_result(result));
        Ok(out)
    }

    // ---- result-store side ----

    /// Unlike `handle_new_test_case`/`handle_client_ready`, this never gates
    /// on `queue_shedding`: shedding only keeps *test*-delivery workers
    /// parked (invariant 10). The result-store side must keep draining
    /// while shedding is active, since that drainage is the only thing that
    /// can ever clear it (spec §4.7: "clears when the queue is drained to
    /// empty").
    fn enqueue_result(&mut self, result: PendingResult) -> Vec<Outbound> {
        let mut out = Vec::new();
        if let Some(worker) = self.ready_result_workers.pop_front() {
            out.push(self.deliver_result(worker, result));
            return out;
        }
        self.pending_results.push_back(result);
        self.update_shedding();
        out
    }

    fn deliver_result(&mut self, worker: PeerId, result: PendingResult) -> Outbound {
        let ack_id = self.fresh_ack_id();
        let msg = Message::TestResult {
            ack_id: ack_id.clone(),
            test_case_id: result.test_case_id.clone(),
            status: result.status,
            payload: result.payload.clone(),
            raw_debug_detail: result.raw_debug_detail.clone(),
        };
        self.in_flight_results.insert(ack_id.clone(), result.clone());
        self.arm(ack_id, TimeoutAction::RequeueResult { result });
        (worker, msg)
    }

    /// Always drains `pending_results` first, shedding or not — a result
    /// worker is only parked once the queue is actually empty. Gating this
    /// on `queue_shedding` (as invariant 10 does for test delivery) would
    /// mean shedding could never clear once set.
    pub fn handle_db_ready(&mut self, from: PeerId) -> Vec<Outbound> {
        let mut out = Vec::new();
        if let Some(result) = self.pending_results.pop_front() {
            out.push(self.deliver_result(from, result));
            self.update_shedding();
        } else {
            self.ready_result_workers.push_back(from);
        }
        out
    }

    /// Second producer ack: the result-store's ack of a `test_result`
    /// (spec §4.7: "carries `result`, `db_id`, and for crashes also
    /// `crashdetail`, `crc32`, `tag`").
    pub fn handle_test_result_ack(&mut self, ack_id: &str, db_id: String) -> Vec<Outbound> {
        self.disarm(ack_id);
        let Some(result) = self.in_flight_results.remove(ack_id) else {
            return Vec::new();
        };
        self.update_shedding();

        let mut extras = serde_json::Map::new();
        extras.insert("result".to_string(), Value::String(result.status.as_str().to_string()));
        extras.insert("db_id".to_string(), Value::String(db_id));
        if result.status == DeliveryStatus::Crash {
            extras.insert(
                "crashdetail".to_string(),
                Value::String(result.raw_debug_detail.clone().unwrap_or_default()),
            );
            extras.insert("crc32".to_string(), Value::from(result.crc32));
            extras.insert("tag".to_string(), Value::String(result.tag.clone()));
        }
        vec![(
            result.producer,
            Message::ack(result.producer_ack_id, extras),
        )]
    }

    /// Shedding clears only when the pending result-store queue drains to
    /// empty (spec §4.7); it's set as soon as the queue exceeds `dbq_max`.
    fn update_shedding(&mut self) {
        if self.pending_results.len() > self.dbq_max {
            self.queue_shedding = true;
        } else if self.pending_results.is_empty() {
            self.queue_shedding = false;
        }
    }

    /// Sweep timed-out acks: resend to the same peer, or re-enqueue onto
    /// the originating queue, per spec §5.
    pub fn sweep_timeouts(&mut self, now: Instant) -> Vec<Outbound> {
        let expired: Vec<AckId> = self
            .unanswered
            .iter()
            .filter(|(_, u)| u.deadline <= now)
            .map(|(id, _)| id.clone())
            .collect();

        let mut out = Vec::new();
        for ack_id in expired {
            let Some(entry) = self.unanswered.remove(&ack_id) else {
                continue;
            };
            match entry.action {
                TimeoutAction::RequeueTest { queue, test } => {
                    self.in_flight_delivers.remove(&ack_id);
                    out.extend(self.handle_client_ready_or_queue(queue, test));
                }
                TimeoutAction::RequeueResult { result } => {
                    self.in_flight_results.remove(&ack_id);
                    out.extend(self.enqueue_result(result));
                }
            }
        }
        out
    }

    /// Re-deliver a timed-out test to a ready worker if one is waiting,
    /// otherwise put it back on the pending FIFO.
    fn handle_client_ready_or_queue(&mut self, queue: String, test: PendingTest) -> Vec<Outbound> {
        let mut out = Vec::new();
        let state = self.queues.entry(queue).or_default();
        if !self.queue_shedding {
            if let Some(worker) = state.ready_workers.pop_front() {
                out.push(self.deliver(worker, test));
                return out;
            }
        }
        state.pending.push_front(test);
        out
    }

    pub fn pending_len(&self, queue: &str) -> usize {
        self.queues.get(queue).map(|q| q.pending.len()).unwrap_or(0)
    }

    pub fn ready_worker_len(&self, queue: &str) -> usize {
        self.queues.get(queue).map(|q| q.ready_workers.len()).unwrap_or(0)
    }

    pub fn pending_results_len(&self) -> usize {
        self.pending_results.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> Value {
        Value::Null
    }

    #[test]
    fn scenario_s1_two_acks_for_one_success() {
        let mut broker = Broker::new(1_000, Duration::from_secs(30));
        // Worker ready first.
        assert!(broker.handle_client_ready("worker-1".into(), "default".into()).is_empty());

        let out = broker.handle_new_test_case(
            "producer-1".into(),
            "1".into(),
            b"\x00\x01".to_vec(),
            0xB6CC4292,
            "default".into(),
            "".into(),
            opts(),
            None,
        );
        assert_eq!(out.len(), 1);
        let (worker, Message::Deliver { crc32, .. }) = &out[0] else {
            panic!("expected deliver");
        };
        assert_eq!(worker, "worker-1");
        assert_eq!(*crc32, 0xB6CC4292);

        // Find the ack_id the broker armed for this delivery.
        let ack_id = broker.in_flight_delivers.keys().next().unwrap().clone();
        let out = broker
            .handle_deliver_ack(&ack_id, DeliveryStatus::Success, None, None, 0xB6CC4292)
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].0, "producer-1");
        let Message::AckMsg { ack_id, .. } = &out[0].1 else {
            panic!("expected ack");
        };
        assert_eq!(ack_id, "1");

        // Result store becomes ready, picks up the pending result. The
        // payload forwarded is the broker's own stored test data, not
        // anything sourced from the worker's ack.
        let out = broker.handle_db_ready("store-1".into());
        assert_eq!(out.len(), 1);
        let Message::TestResult { payload, .. } = &out[0].1 else {
            panic!("expected test_result");
        };
        assert_eq!(payload, b"\x00\x01");
        let result_ack_id = broker.in_flight_results.keys().next().unwrap().clone();

        let out = broker.handle_test_result_ack(&result_ack_id, "db-1".into());
        assert_eq!(out.len(), 1);
        let (producer, Message::AckMsg { ack_id, extras }) = &out[0] else {
            panic!("expected ack");
        };
        assert_eq!(producer, "producer-1");
        assert_eq!(ack_id, "1");
        assert_eq!(extras["result"], "success");
        assert!(extras.contains_key("db_id"));
    }

    #[test]
    fn crash_ack_forwards_the_workers_augmented_tag_and_crc32() {
        let mut broker = Broker::new(1_000, Duration::from_secs(30));
        broker.handle_client_ready("worker-1".into(), "default".into());
        broker.handle_new_test_case(
            "producer-1".into(),
            "1".into(),
            b"\x00\x01".to_vec(),
            0xB6CC4292,
            "default".into(),
            "".into(),
            opts(),
            None,
        );
        let ack_id = broker.in_flight_delivers.keys().next().unwrap().clone();
        broker
            .handle_deliver_ack(
                &ack_id,
                DeliveryStatus::Crash,
                Some("EXCEPTION_TYPE:X\n".into()),
                Some("base|host=abc|data_md5=def".into()),
                0xB6CC4292,
            )
            .unwrap();

        broker.handle_db_ready("store-1".into());
        let result_ack_id = broker.in_flight_results.keys().next().unwrap().clone();
        let out = broker.handle_test_result_ack(&result_ack_id, "db-1".into());
        let Message::AckMsg { extras, .. } = &out[0].1 else {
            panic!("expected ack");
        };
        assert_eq!(extras["crashdetail"], "EXCEPTION_TYPE:X\n");
        assert_eq!(extras["crc32"], 0xB6CC4292);
        assert_eq!(extras["tag"], "base|host=abc|data_md5=def");
    }

    #[test]
    fn invariant_9_duplicate_producer_ack_id_is_dropped() {
        let mut broker = Broker::new(1_000, Duration::from_secs(30));
        // No worker ready: first test goes to pending.
        let out = broker.handle_new_test_case(
            "p".into(),
            "1".into(),
            b"x".to_vec(),
            1,
            "q".into(),
            "".into(),
            opts(),
            Some("dup".into()),
        );
        assert!(out.is_empty());
        assert_eq!(broker.pending_len("q"), 1);

        let out = broker.handle_new_test_case(
            "p".into(),
            "2".into(),
            b"y".to_vec(),
            2,
            "q".into(),
            "".into(),
            opts(),
            Some("dup".into()),
        );
        assert!(out.is_empty());
        assert_eq!(broker.pending_len("q"), 1, "duplicate must not be enqueued twice");
    }

    #[test]
    fn invariant_10_shedding_keeps_ready_worker_unmatched() {
        let mut broker = Broker::new(0, Duration::from_secs(30));
        broker.queue_shedding = true;
        let out = broker.handle_new_test_case(
            "p".into(),
            "1".into(),
            b"x".to_vec(),
            1,
            "q".into(),
            "".into(),
            opts(),
            None,
        );
        assert!(out.is_empty());
        assert_eq!(broker.pending_len("q"), 1);

        let out = broker.handle_client_ready("w".into(), "q".into());
        assert!(out.is_empty(), "ready worker must stay unmatched while shedding");
        assert_eq!(broker.ready_worker_len("q"), 1);
        assert_eq!(broker.pending_len("q"), 1);
    }

    #[test]
    fn shedding_clears_once_db_ready_drains_pending_results_to_empty() {
        let mut broker = Broker::new(0, Duration::from_secs(30));
        let result = PendingResult {
            producer: "p".into(),
            producer_ack_id: "1".into(),
            test_case_id: "t1".into(),
            status: DeliveryStatus::Success,
            payload: b"x".to_vec(),
            tag: "tag".into(),
            crc32: 1,
            raw_debug_detail: None,
        };
        broker.pending_results.push_back(result);
        broker.queue_shedding = true;

        // A db_ready worker must be handed the queued result immediately,
        // not parked, or shedding could never clear.
        let out = broker.handle_db_ready("store-1".into());
        assert_eq!(out.len(), 1);
        assert_eq!(broker.pending_results_len(), 0);
        assert!(
            !broker.queue_shedding,
            "shedding must clear once the result queue drains to empty"
        );
    }

    #[test]
    fn timeout_requeues_an_undelivered_test_for_redelivery() {
        let mut broker = Broker::new(1_000, Duration::from_millis(1));
        broker.handle_client_ready("worker-1".into(), "q".into());
        let out = broker.handle_new_test_case(
            "p".into(),
            "1".into(),
            b"x".to_vec(),
            1,
            "q".into(),
            "".into(),
            opts(),
            None,
        );
        assert_eq!(out.len(), 1);

        std::thread::sleep(Duration::from_millis(5));
        let out = broker.sweep_timeouts(Instant::now());
        // No ready worker now, so it's requeued rather than resent.
        assert!(out.is_empty());
        assert_eq!(broker.pending_len("q"), 1);
    }
}
