//! Typed configuration for each component, merged over defaults the way
//! `sem_os_server::main` merges env vars over its own defaults. Loading env
//! vars into these structs is a binary-entry-point concern (out of scope for
//! the library surface); what's in scope is the shape and the defaults.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

fn default_listen_ip() -> String {
    "0.0.0.0".to_string()
}

fn default_listen_port() -> u16 {
    10001
}

fn default_poll_interval_ms() -> u64 {
    2_000
}

fn default_work_dir() -> PathBuf {
    PathBuf::from("./fathom-work")
}

/// Recognised broker options (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub listen_ip: String,
    pub listen_port: u16,
    pub poll_interval_ms: u64,
    pub debug: bool,
    /// When true, accepted connections are logged but never matched —
    /// used for harness smoke tests.
    pub dummy: bool,
    pub queue_shedding: bool,
    pub dbq_max: usize,
    pub work_dir: PathBuf,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            listen_ip: default_listen_ip(),
            listen_port: default_listen_port(),
            poll_interval_ms: default_poll_interval_ms(),
            debug: false,
            dummy: false,
            queue_shedding: false,
            dbq_max: 1_000,
            work_dir: default_work_dir(),
        }
    }
}

/// Recognised producer options (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProducerConfig {
    pub server_ip: String,
    pub server_port: u16,
    pub work_dir: PathBuf,
    pub poll_interval_ms: u64,
    /// Name of the generator this producer drives; resolved by the binary
    /// entry point, not by the library.
    pub production_generator: String,
    pub queue_name: String,
    pub debug: bool,
    pub base_tag: String,
    pub fuzzbot_options: serde_json::Value,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            server_ip: "127.0.0.1".to_string(),
            server_port: default_listen_port(),
            work_dir: default_work_dir(),
            poll_interval_ms: default_poll_interval_ms(),
            production_generator: String::new(),
            queue_name: "default".to_string(),
            debug: false,
            base_tag: String::new(),
            fuzzbot_options: serde_json::Value::Null,
        }
    }
}

/// Recognised worker options (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub server_ip: String,
    pub server_port: u16,
    pub work_dir: PathBuf,
    pub poll_interval_ms: u64,
    pub queue_name: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            server_ip: "127.0.0.1".to_string(),
            server_port: default_listen_port(),
            work_dir: default_work_dir(),
            poll_interval_ms: default_poll_interval_ms(),
            queue_name: "default".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broker_defaults_match_spec() {
        let cfg = BrokerConfig::default();
        assert_eq!(cfg.listen_ip, "0.0.0.0");
        assert_eq!(cfg.listen_port, 10001);
        assert!(!cfg.queue_shedding);
    }
}
