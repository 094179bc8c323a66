use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GeneratorError {
    /// `next()` was called after `has_next()` returned `false` (spec §4.1).
    #[error("generator exhausted")]
    Exhausted,
}

pub type Result<T> = std::result::Result<T, GeneratorError>;
