//! The blob store: streaming put/get of whole NAR payloads.
//!
//! A put tees incoming bytes into a running SHA-256 and an unlinked spill
//! file; on finish the payload is chunked, the chunks are uploaded into the
//! pool with bounded parallelism, and an index is written under the payload
//! digest. A get streams the chunks of a stored index back in order.

use crate::chunks::{ChunkStore, LocalChunkStore};
use crate::error::{StorageError, StorageResult};
use crate::index::{BlobIndex, IndexStore, LocalIndexStore};
use crate::memory::{MemoryChunkStore, MemoryIndexStore};
use bytes::Bytes;
use decant_core::{ChunkHash, ChunkInfo, Chunker, ChunkerParams, ContentHash, ContentHasher};
use futures::stream::{FuturesUnordered, Stream, StreamExt};
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

/// Read size when draining the spill file through the chunker.
const SPILL_READ_SIZE: usize = 64 * 1024;

/// Upper bound on in-flight chunk writes per put.
const MAX_PUT_CONCURRENCY: usize = 4;

fn put_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(MAX_PUT_CONCURRENCY)
}

/// An ordered stream of verified chunk payloads.
pub type BlobStream = Pin<Box<dyn Stream<Item = StorageResult<Bytes>> + Send>>;

/// Outcome of a completed blob put.
#[derive(Clone, Copy, Debug)]
pub struct BlobSummary {
    /// SHA-256 of the payload.
    pub hash: ContentHash,
    /// Payload length in bytes.
    pub size: u64,
    /// Whether an identical blob was already stored.
    pub deduplicated: bool,
}

/// Content-addressed blob store over a chunk pool and an index store.
#[derive(Clone)]
pub struct BlobStore {
    chunks: Arc<dyn ChunkStore>,
    indices: Arc<dyn IndexStore>,
    chunker: Chunker,
    concurrency: usize,
}

impl BlobStore {
    /// Combine a chunk pool and an index store.
    pub fn new(
        chunks: Arc<dyn ChunkStore>,
        indices: Arc<dyn IndexStore>,
        params: &ChunkerParams,
    ) -> Self {
        Self {
            chunks,
            indices,
            chunker: Chunker::new(params),
            concurrency: put_concurrency(),
        }
    }

    /// Open a filesystem-backed blob store under `cache_path`
    /// (`castr/` for chunks, `caibx/` for indices).
    pub async fn open_local(
        cache_path: impl AsRef<Path>,
        params: &ChunkerParams,
    ) -> StorageResult<Self> {
        let cache_path = cache_path.as_ref();
        let chunks = LocalChunkStore::new(cache_path.join("castr")).await?;
        let indices = LocalIndexStore::new(cache_path.join("caibx")).await?;
        Ok(Self::new(Arc::new(chunks), Arc::new(indices), params))
    }

    /// Open an ephemeral in-memory blob store.
    pub fn in_memory(params: &ChunkerParams) -> Self {
        Self::new(
            Arc::new(MemoryChunkStore::new()),
            Arc::new(MemoryIndexStore::new()),
            params,
        )
    }

    /// Start a streaming blob write.
    pub async fn put_blob(&self) -> StorageResult<BlobWriter> {
        // The spill file is created unlinked, so it is reclaimed on every
        // exit path, including a request future dropped mid-write.
        let spill = tokio::task::spawn_blocking(tempfile::tempfile)
            .await
            .map_err(|e| StorageError::Io(std::io::Error::other(e)))??;

        Ok(BlobWriter {
            spill: File::from_std(spill),
            hasher: ContentHash::hasher(),
            bytes_written: 0,
            chunks: Arc::clone(&self.chunks),
            indices: Arc::clone(&self.indices),
            chunker: self.chunker,
            concurrency: self.concurrency,
        })
    }

    /// Stream a stored blob back, in chunk order.
    ///
    /// Returns the stream plus the total payload length from the index.
    /// Chunk payloads are fetched lazily as the stream is polled.
    pub async fn get_blob(&self, hash: &ContentHash) -> StorageResult<(BlobStream, u64)> {
        let index = self.indices.get_index(hash).await?;
        let total = index.total_size();

        let chunks = Arc::clone(&self.chunks);
        let stream = futures::stream::iter(index.into_entries()).then(move |entry| {
            let chunks = Arc::clone(&chunks);
            async move { chunks.get_chunk(&entry.hash).await }
        });

        Ok((Box::pin(stream), total))
    }

    /// Check whether a blob is stored.
    pub async fn has_blob(&self, hash: &ContentHash) -> StorageResult<bool> {
        self.indices.has_index(hash).await
    }
}

/// Streaming sink for one blob payload.
pub struct BlobWriter {
    spill: File,
    hasher: ContentHasher,
    bytes_written: u64,
    chunks: Arc<dyn ChunkStore>,
    indices: Arc<dyn IndexStore>,
    chunker: Chunker,
    concurrency: usize,
}

impl BlobWriter {
    /// Append payload bytes.
    pub async fn write(&mut self, data: &[u8]) -> StorageResult<()> {
        self.hasher.update(data);
        self.spill.write_all(data).await?;
        self.bytes_written += data.len() as u64;
        Ok(())
    }

    /// Number of payload bytes written so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Seal the blob: dedup against the index store, or chunk the spill,
    /// upload the chunks and commit the index.
    pub async fn finish(mut self) -> StorageResult<BlobSummary> {
        let hash = self.hasher.finalize();

        if self.indices.has_index(&hash).await? {
            tracing::debug!(blob = %hash, "blob already stored, skipping chunking");
            return Ok(BlobSummary {
                hash,
                size: self.bytes_written,
                deduplicated: true,
            });
        }

        self.spill.flush().await?;
        self.spill.seek(std::io::SeekFrom::Start(0)).await?;

        let mut entries: Vec<ChunkInfo> = Vec::new();
        let mut in_flight = FuturesUnordered::new();
        let mut buffer: Vec<u8> = Vec::new();
        let mut read_buf = vec![0u8; SPILL_READ_SIZE];
        let mut offset = 0u64;
        let mut eof = false;

        'chunking: loop {
            // Grow the window until the chunker commits to a boundary.
            let cut = loop {
                match self.chunker.next_cut(&buffer, eof) {
                    Some(cut) => break cut,
                    None if eof => break 'chunking,
                    None => {
                        let n = self.spill.read(&mut read_buf).await?;
                        if n == 0 {
                            eof = true;
                        } else {
                            buffer.extend_from_slice(&read_buf[..n]);
                        }
                    }
                }
            };

            let data = Bytes::copy_from_slice(&buffer[..cut]);
            buffer.drain(..cut);

            let id = ChunkHash::compute(&data);
            entries.push(ChunkInfo::new(id, offset, data.len() as u64));
            offset += data.len() as u64;

            let store = Arc::clone(&self.chunks);
            in_flight.push(async move { store.put_chunk(&id, data).await });
            if in_flight.len() >= self.concurrency {
                if let Some(result) = in_flight.next().await {
                    result?;
                }
            }
        }

        while let Some(result) = in_flight.next().await {
            result?;
        }

        let index = BlobIndex::new(entries);
        self.indices.put_index(&hash, &index).await?;

        tracing::debug!(
            blob = %hash,
            size = self.bytes_written,
            chunks = index.len(),
            "blob stored"
        );

        Ok(BlobSummary {
            hash,
            size: self.bytes_written,
            deduplicated: false,
        })
    }
}
