//! File-backed metadata store.
//!
//! One JSON document per entity, sharded by the first four hex characters
//! of the key, written to a sibling temp file and renamed so a reader
//! never observes a partial document.

use crate::error::{MetadataError, MetadataResult};
use crate::models::{NarMeta, PathInfo};
use crate::store::{nar_meta_upsert, path_info_upsert, MetadataStore, Upsert};
use async_trait::async_trait;
use decant_core::{NarHash, OutputHash};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Metadata store persisting JSON documents under
/// `<root>/pathinfo/` and `<root>/narmeta/`.
pub struct FileMetadataStore {
    path_info_dir: PathBuf,
    nar_meta_dir: PathBuf,
}

impl FileMetadataStore {
    /// Create a store rooted at `root`, creating both table directories.
    pub async fn new(root: impl AsRef<Path>) -> MetadataResult<Self> {
        let root = root.as_ref();
        let path_info_dir = root.join("pathinfo");
        let nar_meta_dir = root.join("narmeta");
        fs::create_dir_all(&path_info_dir).await?;
        fs::create_dir_all(&nar_meta_dir).await?;
        Ok(Self {
            path_info_dir,
            nar_meta_dir,
        })
    }

    fn path_info_path(&self, output_hash: &OutputHash) -> PathBuf {
        let hex = output_hash.to_hex();
        self.path_info_dir.join(&hex[..4]).join(format!("{hex}.json"))
    }

    fn nar_meta_path(&self, nar_hash: &NarHash) -> PathBuf {
        let hex = nar_hash.content_hash().to_hex();
        self.nar_meta_dir.join(&hex[..4]).join(format!("{hex}.json"))
    }

    async fn read_document<T: DeserializeOwned>(
        path: &Path,
        entity: &str,
    ) -> MetadataResult<T> {
        let data = fs::read(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MetadataError::NotFound(entity.to_string())
            } else {
                MetadataError::Io(e)
            }
        })?;
        serde_json::from_slice(&data)
            .map_err(|e| MetadataError::Serialization(format!("{entity}: {e}")))
    }

    async fn read_existing<T: DeserializeOwned>(
        path: &Path,
        entity: &str,
    ) -> MetadataResult<Option<T>> {
        match Self::read_document(path, entity).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn write_document<T: Serialize>(
        path: &Path,
        entity: &str,
        value: &T,
    ) -> MetadataResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let data = serde_json::to_vec(value)
            .map_err(|e| MetadataError::Serialization(format!("{entity}: {e}")))?;

        let temp_path = path.with_extension(format!("tmp.{}", Uuid::new_v4()));
        {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(&data).await?;
            file.sync_all().await?;
        }
        fs::rename(&temp_path, path).await?;

        Ok(())
    }
}

#[async_trait]
impl MetadataStore for FileMetadataStore {
    async fn get_path_info(&self, output_hash: &OutputHash) -> MetadataResult<PathInfo> {
        let path = self.path_info_path(output_hash);
        Self::read_document(&path, &format!("PathInfo {output_hash}")).await
    }

    async fn put_path_info(&self, path_info: &PathInfo) -> MetadataResult<()> {
        path_info.check()?;

        // Foreign key: the referred NarMeta must exist.
        self.get_nar_meta(&path_info.nar_hash).await.map_err(|e| {
            if e.is_not_found() {
                MetadataError::NotFound(format!(
                    "PathInfo {} refers to unknown NarMeta {}",
                    path_info.output_hash, path_info.nar_hash
                ))
            } else {
                e
            }
        })?;

        let path = self.path_info_path(&path_info.output_hash);
        let entity = format!("PathInfo {}", path_info.output_hash);
        let existing: Option<PathInfo> = Self::read_existing(&path, &entity).await?;
        match path_info_upsert(existing.as_ref(), path_info)? {
            Upsert::Noop => Ok(()),
            Upsert::Write => Self::write_document(&path, &entity, path_info).await,
        }
    }

    async fn get_nar_meta(&self, nar_hash: &NarHash) -> MetadataResult<NarMeta> {
        let path = self.nar_meta_path(nar_hash);
        Self::read_document(&path, &format!("NarMeta {nar_hash}")).await
    }

    async fn put_nar_meta(&self, nar_meta: &NarMeta) -> MetadataResult<()> {
        nar_meta.check()?;

        // Foreign key: every referenced store path must exist.
        for (i, reference) in nar_meta.references.iter().enumerate() {
            self.get_path_info(reference).await.map_err(|e| {
                if e.is_not_found() {
                    MetadataError::NotFound(format!(
                        "NarMeta {} refers to unknown store path {}",
                        nar_meta.nar_hash, nar_meta.references_str[i]
                    ))
                } else {
                    e
                }
            })?;
        }

        let path = self.nar_meta_path(&nar_meta.nar_hash);
        let entity = format!("NarMeta {}", nar_meta.nar_hash);
        let existing: Option<NarMeta> = Self::read_existing(&path, &entity).await?;
        match nar_meta_upsert(existing.as_ref(), nar_meta)? {
            Upsert::Noop => Ok(()),
            Upsert::Write => Self::write_document(&path, &entity, nar_meta).await,
        }
    }

    async fn drop_all(&self) -> MetadataResult<()> {
        fs::remove_dir_all(&self.path_info_dir).await?;
        fs::remove_dir_all(&self.nar_meta_dir).await?;
        fs::create_dir_all(&self.path_info_dir).await?;
        fs::create_dir_all(&self.nar_meta_dir).await?;
        Ok(())
    }
}
