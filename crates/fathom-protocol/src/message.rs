//! The verb-dispatched message envelope (spec §4.6). Every message is a
//! mapping with a required `verb` key and freeform extras; modelled here as
//! an internally-tagged enum on `verb` so the receiver dispatches on one
//! field without hand-rolled matching, the same way `fathom_core::config`
//! leans on serde for the freeform `fuzzbot_options`/`worker_options` blobs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use fathom_core::DeliveryStatus;

/// Freeform extra keys carried on `ack_msg` (spec §4.6: "`ack_id` + extras").
pub type Extras = Map<String, Value>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "verb")]
pub enum Message {
    #[serde(rename = "client_startup")]
    ClientStartup { client_type: String },

    #[serde(rename = "client_ready")]
    ClientReady { queue: String },

    #[serde(rename = "db_ready")]
    DbReady {},

    #[serde(rename = "new_test_case")]
    NewTestCase {
        id: String,
        data: Vec<u8>,
        crc32: u32,
        queue: String,
        tag: String,
        #[serde(default)]
        options: Value,
        /// Producer-supplied idempotency key, not in spec §4.6's listed
        /// payload keys but required by §4.7's duplicate-suppression
        /// invariant ("scan for a matching producer_ack_id"); defaults to
        /// `id` when the producer doesn't set one.
        #[serde(default)]
        producer_ack_id: Option<String>,
    },

    #[serde(rename = "deliver")]
    Deliver {
        /// Not in spec §4.6's listed payload keys, but required by §4.7's
        /// "every outbound message carries an `ack_id`" invariant — the
        /// worker echoes it back on the `deliver` ack so the broker can
        /// discharge the right `unanswered` entry.
        ack_id: String,
        data: Vec<u8>,
        server_id: String,
        producer_ack_id: String,
        crc32: u32,
        tag: String,
        #[serde(default)]
        options: Value,
    },

    /// Payload keys mirror [`fathom_store::Store::insert_result`]'s
    /// arguments rather than the full crash-record field list: the broker
    /// forwards exactly what the result store needs to persist a row, and
    /// the store itself re-derives hash/desc/exception fields from
    /// `raw_debug_detail` via `fathom_crashparse`.
    #[serde(rename = "test_result")]
    TestResult {
        ack_id: String,
        test_case_id: String,
        status: DeliveryStatus,
        payload: Vec<u8>,
        #[serde(default)]
        raw_debug_detail: Option<String>,
    },

    #[serde(rename = "ack_msg")]
    AckMsg {
        ack_id: String,
        #[serde(flatten)]
        extras: Extras,
    },
}

impl Message {
    pub fn ack(ack_id: impl Into<String>, extras: Extras) -> Self {
        Message::AckMsg {
            ack_id: ack_id.into(),
            extras,
        }
    }

    /// The `startup_ack=true` reply to `client_startup` (spec §4.6).
    pub fn startup_ack(ack_id: impl Into<String>) -> Self {
        let mut extras = Extras::new();
        extras.insert("startup_ack".to_string(), Value::Bool(true));
        Message::ack(ack_id, extras)
    }

    /// The verb name as carried on the wire, for logging and dispatch.
    pub fn verb(&self) -> &'static str {
        match self {
            Message::ClientStartup { .. } => "client_startup",
            Message::ClientReady { .. } => "client_ready",
            Message::DbReady {} => "db_ready",
            Message::NewTestCase { .. } => "new_test_case",
            Message::Deliver { .. } => "deliver",
            Message::TestResult { .. } => "test_result",
            Message::AckMsg { .. } => "ack_msg",
        }
    }
}
