use fathom_binstruct::BinstructError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MutateError {
    #[error(transparent)]
    Binstruct(#[from] BinstructError),
    #[error("no replacement generator registered for field type {0:?}")]
    NoGenerator(String),
}

pub type Result<T> = std::result::Result<T, MutateError>;
