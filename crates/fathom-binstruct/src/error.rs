use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BinstructError {
    #[error("unknown field: {0}")]
    UnknownField(String),
    #[error("no such field: {0}")]
    NoSuchField(String),
    #[error("duplicate field name: {0}")]
    DuplicateName(String),
    #[error("invalid input for field {field}: {reason}")]
    FieldInput { field: String, reason: String },
}

pub type Result<T> = std::result::Result<T, BinstructError>;
