//! Blob index store.
//!
//! An index is the ordered chunk list that reconstitutes a blob, keyed by
//! the SHA-256 of the reconstructed payload. Indices are immutable once
//! stored.

use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use decant_core::{ChunkInfo, ContentHash};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Ordered chunk list describing one blob.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobIndex {
    entries: Vec<ChunkInfo>,
}

impl BlobIndex {
    /// Build an index from ordered entries.
    pub fn new(entries: Vec<ChunkInfo>) -> Self {
        Self { entries }
    }

    /// The ordered entries.
    pub fn entries(&self) -> &[ChunkInfo] {
        &self.entries
    }

    /// Consume into the ordered entries.
    pub fn into_entries(self) -> Vec<ChunkInfo> {
        self.entries
    }

    /// Number of chunks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index describes the empty blob.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total uncompressed size of the payload this index reconstructs.
    pub fn total_size(&self) -> u64 {
        self.entries.iter().map(|e| e.size).sum()
    }
}

/// Persistent map from payload digest to [`BlobIndex`].
#[async_trait]
pub trait IndexStore: Send + Sync + 'static {
    /// Check whether an index is present.
    async fn has_index(&self, key: &ContentHash) -> StorageResult<bool>;

    /// Fetch an index. Absence is reported as [`StorageError::NotFound`],
    /// distinguishable from I/O failure.
    async fn get_index(&self, key: &ContentHash) -> StorageResult<BlobIndex>;

    /// Store an index atomically: readers never observe a partial index.
    async fn put_index(&self, key: &ContentHash, index: &BlobIndex) -> StorageResult<()>;
}

/// Filesystem index store, one `<hex>.caibx` document per blob.
pub struct LocalIndexStore {
    root: PathBuf,
}

impl LocalIndexStore {
    /// Create a store rooted at `root`, creating the directory if needed.
    pub async fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    fn index_path(&self, key: &ContentHash) -> PathBuf {
        self.root.join(format!("{}.caibx", key.to_hex()))
    }
}

#[async_trait]
impl IndexStore for LocalIndexStore {
    async fn has_index(&self, key: &ContentHash) -> StorageResult<bool> {
        Ok(fs::try_exists(&self.index_path(key)).await?)
    }

    async fn get_index(&self, key: &ContentHash) -> StorageResult<BlobIndex> {
        let path = self.index_path(key);
        let data = fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(format!("index {key}"))
            } else {
                StorageError::Io(e)
            }
        })?;

        serde_json::from_slice(&data)
            .map_err(|e| StorageError::Corrupt(format!("index {key}: {e}")))
    }

    async fn put_index(&self, key: &ContentHash, index: &BlobIndex) -> StorageResult<()> {
        let path = self.index_path(key);
        let data = serde_json::to_vec(index)
            .map_err(|e| StorageError::Corrupt(format!("index {key}: {e}")))?;

        let temp_path = path.with_extension(format!("tmp.{}", Uuid::new_v4()));
        {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(&data).await?;
            file.sync_all().await?;
        }
        fs::rename(&temp_path, &path).await?;

        Ok(())
    }
}
