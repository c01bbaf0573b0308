//! Chunk identities.

use crate::hash::ContentHash;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A chunk hash (SHA-256 of chunk contents).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkHash(ContentHash);

impl ChunkHash {
    /// Create from a ContentHash.
    pub fn from_content_hash(hash: ContentHash) -> Self {
        Self(hash)
    }

    /// Compute the hash of chunk data.
    pub fn compute(data: &[u8]) -> Self {
        Self(ContentHash::compute(data))
    }

    /// Get the underlying content hash.
    pub fn content_hash(&self) -> &ContentHash {
        &self.0
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> crate::Result<Self> {
        Ok(Self(ContentHash::from_hex(s)?))
    }

    /// Encode as hex string.
    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }
}

impl fmt::Debug for ChunkHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkHash({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for ChunkHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// One entry of a blob index: a chunk and where it lands in the
/// reconstructed payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkInfo {
    /// The chunk hash.
    pub hash: ChunkHash,
    /// Offset into the uncompressed payload.
    pub offset: u64,
    /// Size in bytes.
    pub size: u64,
}

impl ChunkInfo {
    /// Create new chunk info.
    pub fn new(hash: ChunkHash, offset: u64, size: u64) -> Self {
        Self { hash, offset, size }
    }
}
