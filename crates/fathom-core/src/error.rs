use thiserror::Error;

/// Errors raised by the shared core: config, connector, and test-case
/// plumbing. Component-specific errors (broker, store, ...) wrap this where
/// they need to surface it across a crate boundary.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("connector is closed")]
    ConnectorClosed,

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("internal: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
