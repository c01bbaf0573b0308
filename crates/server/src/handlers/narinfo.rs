//! Narinfo retrieval and ingest.
//!
//! Routed through a fallback handler since axum does not support
//! `/{param}.suffix` patterns.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use decant_core::{NarInfo, OutputHash};
use decant_metadata::{render_narinfo, split_narinfo, MetadataStore};

/// Narinfo documents are small; anything bigger than this is not one.
const MAX_NARINFO_SIZE: usize = 1024 * 1024;

/// Fallback handler dispatching /{outputhash}.narinfo requests.
pub async fn narinfo_fallback(State(state): State<AppState>, req: Request) -> Response {
    let path = req.uri().path().to_string();
    let hash_str = match path.strip_prefix('/').and_then(|p| p.strip_suffix(".narinfo")) {
        Some(h) if h.len() == 32 => h.to_string(),
        _ => return (StatusCode::NOT_FOUND, "not found").into_response(),
    };

    let output_hash = match OutputHash::from_base32(&hash_str) {
        Ok(hash) => hash,
        Err(e) => {
            return ApiError::BadRequest(format!("invalid store path hash {hash_str}: {e}"))
                .into_response()
        }
    };

    let method = req.method().clone();
    let result = if method == Method::GET || method == Method::HEAD {
        get_narinfo(&state, &output_hash).await
    } else if method == Method::PUT {
        put_narinfo(&state, req).await.map(IntoResponse::into_response)
    } else {
        Err(ApiError::MethodNotAllowed)
    };

    result.unwrap_or_else(IntoResponse::into_response)
}

/// GET/HEAD /{outputhash}.narinfo - render the stored narinfo.
async fn get_narinfo(state: &AppState, output_hash: &OutputHash) -> ApiResult<Response> {
    let path_info = state.metadata.get_path_info(output_hash).await?;

    let nar_meta = state
        .metadata
        .get_nar_meta(&path_info.nar_hash)
        .await
        .map_err(|e| {
            if e.is_not_found() {
                // A PathInfo without its NarMeta is a store inconsistency,
                // not a missing entity.
                tracing::error!(
                    output_hash = %path_info.output_hash,
                    nar_hash = %path_info.nar_hash,
                    "PathInfo refers to missing NarMeta"
                );
                ApiError::Internal(format!(
                    "PathInfo {} refers to missing NarMeta",
                    path_info.output_hash
                ))
            } else {
                e.into()
            }
        })?;

    let text = render_narinfo(
        &path_info,
        &nar_meta,
        state.config.server.egress_compression,
    )?;

    Ok((
        StatusCode::OK,
        [(CONTENT_TYPE, "text/x-nix-narinfo")],
        text,
    )
        .into_response())
}

/// PUT /{outputhash}.narinfo - ingest a narinfo.
///
/// The archive must have been uploaded first; the sent metadata must agree
/// with what the upload recorded. The first narinfo describing an archive
/// donates its references to the stored NarMeta (the engine does not scan
/// NAR contents for references).
async fn put_narinfo(state: &AppState, req: Request) -> ApiResult<StatusCode> {
    let bytes = axum::body::to_bytes(req.into_body(), MAX_NARINFO_SIZE)
        .await
        .map_err(|e| ApiError::BadRequest(format!("reading narinfo body: {e}")))?;
    let text = std::str::from_utf8(&bytes)
        .map_err(|e| ApiError::BadRequest(format!("narinfo is not UTF-8: {e}")))?;

    let narinfo = NarInfo::parse(text)?;
    let (sent_path_info, sent_nar_meta) = split_narinfo(&narinfo)?;

    let existing = state
        .metadata
        .get_nar_meta(&sent_path_info.nar_hash)
        .await
        .map_err(|e| {
            if e.is_not_found() {
                ApiError::BadRequest("narinfo points to non-existent NarHash".to_string())
            } else {
                e.into()
            }
        })?;

    if !existing.is_equal_to(&sent_nar_meta, false) {
        return Err(ApiError::BadRequest("NarMeta is conflicting".to_string()));
    }

    if existing.references.is_empty() && !sent_nar_meta.references.is_empty() {
        // References backfill. The PathInfo goes in first so a
        // self-referencing path passes the reference FK check.
        state.metadata.put_path_info(&sent_path_info).await?;

        let mut completed = existing;
        completed.references = sent_nar_meta.references;
        completed.references_str = sent_nar_meta.references_str;
        state.metadata.put_nar_meta(&completed).await?;
    } else {
        if !existing.is_equal_to(&sent_nar_meta, true) {
            return Err(ApiError::BadRequest(
                "NarMeta references are conflicting".to_string(),
            ));
        }
        state.metadata.put_path_info(&sent_path_info).await?;
    }

    Ok(StatusCode::OK)
}
