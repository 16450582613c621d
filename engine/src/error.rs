//! Error types for the favorites engine.

use thiserror::Error;

/// All possible errors from the favorites engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("unknown category: {0}")]
    UnknownCategory(String),

    #[error("invalid stored collection: {0}")]
    InvalidCollection(String),

    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
