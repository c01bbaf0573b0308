//! Route configuration.

use crate::handlers;
use crate::state::AppState;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/", get(handlers::root))
        .route("/nix-cache-info", get(handlers::nix_cache_info))
        .route(
            "/nar/{nar_path}",
            get(handlers::get_nar).put(handlers::put_nar),
        )
        // Narinfo routes use a fallback handler since axum doesn't support
        // /{param}.suffix patterns.
        .fallback(handlers::narinfo_fallback);

    let router = if state.config.server.access_log {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    };

    router.with_state(state)
}
