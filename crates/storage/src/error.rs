//! Storage error types.

use thiserror::Error;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("integrity error: expected {expected}, got {actual}")]
    Integrity { expected: String, actual: String },

    #[error("corrupt stored state: {0}")]
    Corrupt(String),
}

impl StorageError {
    /// Whether this error means the requested entity does not exist,
    /// as opposed to an I/O or integrity failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;
