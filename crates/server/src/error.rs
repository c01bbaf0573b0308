//! API error types.
//!
//! The adapter is the only place where engine errors are mapped to HTTP
//! statuses; the stores themselves never touch the response.

use crate::compression::UnsupportedCompression;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    UnsupportedCompression(#[from] UnsupportedCompression),

    #[error("storage error: {0}")]
    Storage(#[from] decant_storage::StorageError),

    #[error("metadata error: {0}")]
    Metadata(#[from] decant_metadata::MetadataError),

    #[error("core error: {0}")]
    Core(#[from] decant_core::Error),
}

impl ApiError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            // Unsupported ingress compression is a server limitation, not
            // malformed input. (On GET the handlers answer 404 themselves so
            // clients probing for a suffix get a plain miss.)
            Self::UnsupportedCompression(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Storage(e) => match e {
                decant_storage::StorageError::NotFound(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Metadata(e) => match e {
                decant_metadata::MetadataError::NotFound(_) => StatusCode::NOT_FOUND,
                decant_metadata::MetadataError::Conflict(_) => StatusCode::BAD_REQUEST,
                decant_metadata::MetadataError::InvalidEntity(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Core(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, self.to_string()).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
