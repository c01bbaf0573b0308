//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid base32: {0}")]
    InvalidBase32(String),

    #[error("invalid hash: {0}")]
    InvalidHash(String),

    #[error("invalid store path: {0}")]
    InvalidStorePath(String),

    #[error("hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },

    #[error("invalid chunker parameters: {0}")]
    InvalidChunkerParams(String),

    #[error("narinfo parse error: {0}")]
    NarInfoParse(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
