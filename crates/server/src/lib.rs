//! HTTP protocol adapter for the Decant binary cache.
//!
//! This crate translates Nix binary-cache wire traffic into calls on the
//! blob store and the metadata store:
//! - Cache metadata endpoints
//! - `.narinfo` retrieval and ingest with invariant enforcement
//! - NAR upload (any supported compression envelope) and download
//!   (re-compressed on the fly)

pub mod compression;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
