//! Append-only local error log for invariant violations the broker itself
//! would be responsible for (spec §4.7's CRC-mismatch case: "this indicates
//! broker bug"). Plain `OpenOptions::append`, not routed through the result
//! store, since it's diagnosing the broker rather than the target under
//! test.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::{BrokerError, Result};

pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self, message: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(BrokerError::Io)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(BrokerError::Io)?;
        writeln!(file, "[{}] {message}", Utc::now().to_rfc3339()).map_err(BrokerError::Io)?;
        Ok(())
    }
}
