//! Metadata store trait and the shared write policy.

use crate::error::{MetadataError, MetadataResult};
use crate::models::{NarMeta, PathInfo};
use async_trait::async_trait;
use decant_core::{NarHash, OutputHash};

/// The metadata engine: two entity tables with referential integrity.
///
/// Writes are conflict-checked, not last-writer-wins: re-putting an equal
/// value is a no-op, re-putting a different value under the same key is a
/// conflict. The one sanctioned mutation is the reference backfill on
/// NarMeta (empty -> populated), performed when the first `.narinfo`
/// describing an archive arrives.
#[async_trait]
pub trait MetadataStore: Send + Sync + 'static {
    /// Look up a PathInfo by its output hash.
    async fn get_path_info(&self, output_hash: &OutputHash) -> MetadataResult<PathInfo>;

    /// Store a PathInfo. Fails `NotFound` when the referred NarMeta does
    /// not exist, `Conflict` when a different value is already stored.
    async fn put_path_info(&self, path_info: &PathInfo) -> MetadataResult<()>;

    /// Look up a NarMeta by its NAR hash.
    async fn get_nar_meta(&self, nar_hash: &NarHash) -> MetadataResult<NarMeta>;

    /// Store a NarMeta. Fails `NotFound` when any referenced PathInfo does
    /// not exist, `Conflict` when a different value is already stored and
    /// the write is not a reference backfill.
    async fn put_nar_meta(&self, nar_meta: &NarMeta) -> MetadataResult<()>;

    /// Remove everything. Testing and administration only.
    async fn drop_all(&self) -> MetadataResult<()>;
}

/// What a conflict-checked put should do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Upsert {
    Write,
    Noop,
}

/// Write policy for PathInfo: identical values are idempotent, anything
/// else under the same key is a conflict.
pub(crate) fn path_info_upsert(
    existing: Option<&PathInfo>,
    incoming: &PathInfo,
) -> MetadataResult<Upsert> {
    match existing {
        None => Ok(Upsert::Write),
        Some(e) if e == incoming => Ok(Upsert::Noop),
        Some(e) => Err(MetadataError::Conflict(format!(
            "PathInfo {} already stored with different contents",
            e.output_hash
        ))),
    }
}

/// Write policy for NarMeta: idempotent on equal values, one backfill of
/// references is allowed, anything else is a conflict.
pub(crate) fn nar_meta_upsert(
    existing: Option<&NarMeta>,
    incoming: &NarMeta,
) -> MetadataResult<Upsert> {
    match existing {
        None => Ok(Upsert::Write),
        Some(e) if e.is_equal_to(incoming, true) => Ok(Upsert::Noop),
        Some(e)
            if e.references.is_empty()
                && !incoming.references.is_empty()
                && e.is_equal_to(incoming, false) =>
        {
            Ok(Upsert::Write)
        }
        Some(e) => Err(MetadataError::Conflict(format!(
            "NarMeta {} already stored with different contents",
            e.nar_hash
        ))),
    }
}
