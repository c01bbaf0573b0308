//! NAR upload and download.

use crate::compression::{self, Algorithm};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::Response;
use decant_core::config::EgressCompression;
use decant_core::{ContentHash, NarHash};
use decant_metadata::{MetadataStore, NarMeta};
use futures::StreamExt;
use tokio::io::AsyncReadExt;
use tokio_util::io::{ReaderStream, StreamReader};

/// Copy granularity between the decoded request body and the blob writer.
const UPLOAD_READ_SIZE: usize = 64 * 1024;

/// Split `<52 base32 chars>.nar<suffix>` into the blob digest and the
/// compression suffix.
fn parse_nar_path(path: &str) -> ApiResult<(ContentHash, &str)> {
    let malformed = || ApiError::NotFound(format!("no such NAR: {path}"));

    if !path.is_ascii() || path.len() < 52 + 4 {
        return Err(malformed());
    }
    let (digest, rest) = path.split_at(52);
    let suffix = rest.strip_prefix(".nar").ok_or_else(malformed)?;

    let hash = ContentHash::from_base32(digest)
        .map_err(|e| ApiError::BadRequest(format!("invalid NAR hash {digest}: {e}")))?;

    Ok((hash, suffix))
}

/// GET/HEAD /nar/{narhash}.nar[suffix] - stream a stored archive,
/// re-compressed according to the suffix.
pub async fn get_nar(
    State(state): State<AppState>,
    Path(nar_path): Path<String>,
) -> ApiResult<Response> {
    let (hash, suffix) = parse_nar_path(&nar_path)?;

    // Only the cheap egress set is served. Everything else answers 404 so
    // a client probing whether an .xz variant exists simply gets a miss.
    let egress = Algorithm::from_suffix(suffix)
        .and_then(|a| a.as_egress())
        .ok_or_else(|| ApiError::NotFound(format!("unsupported compression suffix: {suffix}")))?;

    let (stream, total) = state.blobs.get_blob(&hash).await?;
    let reader = StreamReader::new(stream.map(|res| res.map_err(std::io::Error::other)));
    let body = Body::from_stream(ReaderStream::new(compression::new_encoder(reader, egress)));

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "application/x-nix-nar");
    // The compressed length is unknowable in advance; only the native form
    // advertises one.
    if egress == EgressCompression::None {
        builder = builder.header(CONTENT_LENGTH, total.to_string());
    }

    builder
        .body(body)
        .map_err(|e| ApiError::Internal(e.to_string()))
}

/// PUT /nar/{hash}.nar[suffix] - ingest an archive.
///
/// The body is decompressed according to the suffix and content-addressed
/// under the digest of the decompressed payload; the digest in the URL is
/// not consulted (for compressed uploads Nix puts the file hash there, which
/// the engine discards along with the envelope).
pub async fn put_nar(
    State(state): State<AppState>,
    Path(nar_path): Path<String>,
    body: Body,
) -> ApiResult<StatusCode> {
    let (_, suffix) = parse_nar_path(&nar_path)?;
    let algo = Algorithm::from_suffix(suffix)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown compression suffix: {suffix}")))?;

    let body_reader =
        StreamReader::new(body.into_data_stream().map(|res| res.map_err(std::io::Error::other)));
    let mut reader = compression::new_decoder(body_reader, algo)?;

    let mut writer = state.blobs.put_blob().await?;
    let mut buf = vec![0u8; UPLOAD_READ_SIZE];
    loop {
        let n = reader
            .read(&mut buf)
            .await
            .map_err(|e| ApiError::Internal(format!("reading upload body: {e}")))?;
        if n == 0 {
            break;
        }
        writer.write(&buf[..n]).await?;
    }
    let summary = writer.finish().await?;

    tracing::debug!(
        nar_hash = %summary.hash,
        size = summary.size,
        deduplicated = summary.deduplicated,
        "NAR ingested"
    );

    let nar_hash = NarHash::from_content_hash(summary.hash);
    match state.metadata.get_nar_meta(&nar_hash).await {
        // Already known: nothing to record.
        Ok(_) => Ok(StatusCode::OK),
        Err(e) if e.is_not_found() => {
            // References are attached later, by the first narinfo
            // describing this archive.
            let nar_meta = NarMeta {
                nar_hash,
                size: summary.size,
                references: Vec::new(),
                references_str: Vec::new(),
            };
            state.metadata.put_nar_meta(&nar_meta).await?;
            Ok(StatusCode::OK)
        }
        Err(e) => Err(e.into()),
    }
}
