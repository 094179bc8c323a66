use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("unknown peer: {0}")]
    UnknownPeer(String),
    #[error("unexpected verb {verb} from {peer}")]
    UnexpectedVerb { peer: String, verb: &'static str },
    #[error("io error writing broker error log: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BrokerError>;
