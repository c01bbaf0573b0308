//! Content-addressed chunk pool.

use crate::error::{StorageError, StorageResult};
use async_compression::tokio::bufread::ZstdDecoder;
use async_compression::tokio::write::ZstdEncoder;
use async_trait::async_trait;
use bytes::Bytes;
use decant_core::ChunkHash;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use uuid::Uuid;

/// A content-addressed set of chunk payloads.
///
/// Chunk identity is the SHA-256 of the chunk contents, so concurrent
/// writers of the same id are trivially consistent: all of them succeed
/// and at most one write becomes durable.
#[async_trait]
pub trait ChunkStore: Send + Sync + 'static {
    /// Check whether a chunk is present.
    async fn has_chunk(&self, id: &ChunkHash) -> StorageResult<bool>;

    /// Fetch a chunk, verifying its content hash on the way out.
    async fn get_chunk(&self, id: &ChunkHash) -> StorageResult<Bytes>;

    /// Store a chunk. Idempotent: an already-present chunk is left
    /// untouched and the call reports success.
    async fn put_chunk(&self, id: &ChunkHash, data: Bytes) -> StorageResult<()>;
}

/// Filesystem chunk pool.
///
/// Chunks live in a sharded directory tree (first four hex characters of
/// the id), zstd-compressed at rest, written via unique temp file + rename.
pub struct LocalChunkStore {
    root: PathBuf,
}

impl LocalChunkStore {
    /// Create a pool rooted at `root`, creating the directory if needed.
    pub async fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    fn chunk_path(&self, id: &ChunkHash) -> PathBuf {
        let hex = id.to_hex();
        self.root.join(&hex[..4]).join(format!("{hex}.chunk"))
    }
}

#[async_trait]
impl ChunkStore for LocalChunkStore {
    async fn has_chunk(&self, id: &ChunkHash) -> StorageResult<bool> {
        Ok(fs::try_exists(&self.chunk_path(id)).await?)
    }

    async fn get_chunk(&self, id: &ChunkHash) -> StorageResult<Bytes> {
        let path = self.chunk_path(id);
        let compressed = fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(format!("chunk {id}"))
            } else {
                StorageError::Io(e)
            }
        })?;

        let mut decoder = ZstdDecoder::new(&compressed[..]);
        let mut data = Vec::new();
        decoder.read_to_end(&mut data).await?;

        let actual = ChunkHash::compute(&data);
        if actual != *id {
            return Err(StorageError::Integrity {
                expected: id.to_hex(),
                actual: actual.to_hex(),
            });
        }

        Ok(Bytes::from(data))
    }

    async fn put_chunk(&self, id: &ChunkHash, data: Bytes) -> StorageResult<()> {
        let path = self.chunk_path(id);
        if fs::try_exists(&path).await? {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut encoder = ZstdEncoder::new(Vec::new());
        encoder.write_all(&data).await?;
        encoder.shutdown().await?;
        let compressed = encoder.into_inner();

        // Unique temp name, then rename: concurrent writers of the same id
        // never observe a partial file.
        let temp_path = path.with_extension(format!("tmp.{}", Uuid::new_v4()));
        {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(&compressed).await?;
            file.sync_all().await?;
        }
        fs::rename(&temp_path, &path).await?;

        Ok(())
    }
}
