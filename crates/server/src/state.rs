//! Application state shared across handlers.

use decant_core::config::AppConfig;
use decant_metadata::MetadataStore;
use decant_storage::BlobStore;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Chunked blob store holding the NAR payloads.
    pub blobs: BlobStore,
    /// Metadata store binding store paths to blobs.
    pub metadata: Arc<dyn MetadataStore>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(config: AppConfig, blobs: BlobStore, metadata: Arc<dyn MetadataStore>) -> Self {
        Self {
            config: Arc::new(config),
            blobs,
            metadata,
        }
    }
}
