//! Core domain types and shared logic for the Decant binary cache.
//!
//! This crate defines the canonical data model used across all other crates:
//! - Content and NAR hashes, Nix base-32 encoding
//! - Store path identifiers
//! - Chunk identities and the content-defined chunker
//! - The `.narinfo` text format
//! - Configuration

pub mod base32;
pub mod chunk;
pub mod chunker;
pub mod config;
pub mod error;
pub mod hash;
pub mod narinfo;
pub mod store_path;

pub use chunk::{ChunkHash, ChunkInfo};
pub use chunker::{Chunker, ChunkerParams, DEFAULT_AVG_CHUNK_SIZE};
pub use error::{Error, Result};
pub use hash::{ContentHash, ContentHasher, NarHash};
pub use narinfo::{NarInfo, Signature};
pub use store_path::{OutputHash, StorePath};
