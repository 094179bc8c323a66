use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("message exceeds max frame size: {0} bytes")]
    FrameTooLarge(u32),
    #[error("malformed message body: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
