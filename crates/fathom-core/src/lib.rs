//! Shared types, config, and the `Connector` capability used across every
//! `fathom-*` crate: test cases, crash records, per-component config, and
//! the byte-oriented transport boundary (spec §3, §5, §6).

pub mod config;
pub mod connector;
pub mod error;
pub mod testcase;

pub use error::{CoreError, Result};
pub use testcase::{CrashRecord, DeliveryStatus, LoadedModule, StackFrame, TestCase};
