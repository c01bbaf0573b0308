//! In-memory chunk pool and index store.
//!
//! Ephemeral counterparts of the filesystem backends, with the same
//! idempotence and conflict behavior. Used by tests and throwaway
//! deployments.

use crate::chunks::ChunkStore;
use crate::error::{StorageError, StorageResult};
use crate::index::{BlobIndex, IndexStore};
use async_trait::async_trait;
use bytes::Bytes;
use decant_core::{ChunkHash, ContentHash};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Chunk pool keeping payloads in a map.
#[derive(Default)]
pub struct MemoryChunkStore {
    chunks: Mutex<HashMap<ChunkHash, Bytes>>,
}

impl MemoryChunkStore {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChunkStore for MemoryChunkStore {
    async fn has_chunk(&self, id: &ChunkHash) -> StorageResult<bool> {
        Ok(self.chunks.lock().await.contains_key(id))
    }

    async fn get_chunk(&self, id: &ChunkHash) -> StorageResult<Bytes> {
        self.chunks
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("chunk {id}")))
    }

    async fn put_chunk(&self, id: &ChunkHash, data: Bytes) -> StorageResult<()> {
        self.chunks.lock().await.entry(*id).or_insert(data);
        Ok(())
    }
}

/// Index store keeping chunk lists in a map.
#[derive(Default)]
pub struct MemoryIndexStore {
    indices: Mutex<HashMap<ContentHash, BlobIndex>>,
}

impl MemoryIndexStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IndexStore for MemoryIndexStore {
    async fn has_index(&self, key: &ContentHash) -> StorageResult<bool> {
        Ok(self.indices.lock().await.contains_key(key))
    }

    async fn get_index(&self, key: &ContentHash) -> StorageResult<BlobIndex> {
        self.indices
            .lock()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("index {key}")))
    }

    async fn put_index(&self, key: &ContentHash, index: &BlobIndex) -> StorageResult<()> {
        self.indices
            .lock()
            .await
            .entry(*key)
            .or_insert_with(|| index.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_chunk_put_keeps_first_write() {
        let store = MemoryChunkStore::new();
        let data = Bytes::from_static(b"payload");
        let id = ChunkHash::compute(&data);

        store.put_chunk(&id, data.clone()).await.unwrap();
        // Same id, same content by construction: a no-op.
        store.put_chunk(&id, data.clone()).await.unwrap();
        assert_eq!(store.get_chunk(&id).await.unwrap(), data);
    }

    #[tokio::test]
    async fn test_missing_entries_are_not_found() {
        let chunks = MemoryChunkStore::new();
        let indices = MemoryIndexStore::new();
        let key = ContentHash::compute(b"absent");

        assert!(chunks
            .get_chunk(&ChunkHash::from_content_hash(key))
            .await
            .unwrap_err()
            .is_not_found());
        assert!(indices.get_index(&key).await.unwrap_err().is_not_found());
    }
}
