//! Shared data-model types that cross component boundaries: the test case
//! carried producer → broker → worker, and the crash record carried
//! worker → broker → result store (spec §3).

use serde::{Deserialize, Serialize};

/// `(id, payload_bytes, crc32, queue_name, tag_text, worker_options)` (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestCase {
    pub id: String,
    pub payload: Vec<u8>,
    pub crc32: u32,
    pub queue: String,
    pub tag: String,
    pub worker_options: serde_json::Value,
}

impl TestCase {
    pub fn new(id: impl Into<String>, payload: Vec<u8>, queue: impl Into<String>) -> Self {
        let crc32 = crc32fast::hash(&payload);
        Self {
            id: id.into(),
            payload,
            crc32,
            queue: queue.into(),
            tag: String::new(),
            worker_options: serde_json::Value::Null,
        }
    }

    /// Verify the carried checksum against the carried payload (spec §4.7,
    /// §4.8: every delivery/ack round-trip is CRC-checked end to end).
    pub fn crc_matches(&self) -> bool {
        crc32fast::hash(&self.payload) == self.crc32
    }
}

/// Outcome a worker reports back for one delivered test (spec §4.6/§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Success,
    Error,
    Crash,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Crash => "crash",
        }
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// `(timestamp, hash_string, short_desc, exception_type, exception_subtype,
/// classification, template_hash, stack_frames, loaded_modules, registers,
/// disassembly, raw_crash_file, raw_debug_detail)` (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CrashRecord {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub hash_string: String,
    pub short_desc: String,
    pub exception_type: String,
    pub exception_subtype: String,
    pub classification: String,
    pub template_hash: String,
    pub stack_frames: Vec<StackFrame>,
    pub loaded_modules: Vec<LoadedModule>,
    pub registers: Vec<(String, u64)>,
    pub disassembly: Vec<(usize, String)>,
    pub raw_crash_file: Vec<u8>,
    pub raw_debug_detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StackFrame {
    pub index: usize,
    pub module: Option<String>,
    pub func_name: Option<String>,
    pub offset: Option<String>,
    pub raw: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoadedModule {
    pub base_address: String,
    pub syms_loaded: bool,
    pub name: Option<String>,
    pub size: Option<String>,
    pub timestamp: Option<String>,
    pub version: Option<String>,
    pub checksum: Option<String>,
}
