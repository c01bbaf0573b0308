//! Chunked content-addressed blob storage for Decant.
//!
//! This crate provides:
//! - A content-addressed chunk pool with idempotent, atomic writes
//! - An index store persisting ordered chunk lists keyed by payload digest
//! - The `BlobStore` combining both behind streaming put/get of whole
//!   NAR payloads

pub mod blob;
pub mod chunks;
pub mod error;
pub mod index;
pub mod memory;

pub use blob::{BlobStore, BlobStream, BlobSummary, BlobWriter};
pub use chunks::{ChunkStore, LocalChunkStore};
pub use error::{StorageError, StorageResult};
pub use index::{BlobIndex, IndexStore, LocalIndexStore};
pub use memory::{MemoryChunkStore, MemoryIndexStore};
