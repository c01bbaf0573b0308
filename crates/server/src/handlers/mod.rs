//! HTTP handlers.

pub mod nar;
pub mod narinfo;

pub use nar::{get_nar, put_nar};
pub use narinfo::narinfo_fallback;

use crate::state::AppState;
use axum::extract::State;
use axum::response::IntoResponse;

/// Protocol banner served on `/`, kept for clients probing this cache
/// implementation.
const BANNER: &str = "nix-casync";

/// GET / - identification banner.
pub async fn root() -> &'static str {
    BANNER
}

/// GET /nix-cache-info - standard Nix cache metadata.
pub async fn nix_cache_info(State(state): State<AppState>) -> impl IntoResponse {
    format!(
        "StoreDir: /nix/store\nWantMassQuery: 1\nPriority: {}\n",
        state.config.server.priority
    )
}
