//! Server test utilities.

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use decant_core::config::{AppConfig, CacheConfig, ServerConfig};
use decant_core::ChunkerParams;
use decant_metadata::{FileMetadataStore, MetadataStore};
use decant_server::{create_router, AppState};
use decant_storage::BlobStore;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a new test server over a temporary cache directory.
    ///
    /// Uses a small average chunk size so modest fixtures still span
    /// several chunks.
    pub async fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("failed to create temp directory");

        let config = AppConfig {
            server: ServerConfig {
                access_log: false,
                ..Default::default()
            },
            cache: CacheConfig {
                path: temp_dir.path().to_path_buf(),
                avg_chunk_size: 4096,
            },
        };

        let params = ChunkerParams::from_avg(config.cache.avg_chunk_size)
            .expect("invalid chunker params");
        let blobs = BlobStore::open_local(&config.cache.path, &params)
            .await
            .expect("failed to open blob store");
        let metadata: Arc<dyn MetadataStore> = Arc::new(
            FileMetadataStore::new(config.cache.path.join("narinfo"))
                .await
                .expect("failed to open metadata store"),
        );

        let state = AppState::new(config, blobs, metadata);
        let router = create_router(state.clone());

        Self {
            router,
            state,
            _temp_dir: temp_dir,
        }
    }

    /// Issue one request against the router.
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        body: Vec<u8>,
    ) -> (StatusCode, HeaderMap, Bytes) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::from(body))
            .expect("failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("request failed");

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("failed to read response body");

        (status, headers, body)
    }
}
