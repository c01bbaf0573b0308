//! Metadata engine for Decant.
//!
//! This crate provides the referentially consistent data model binding
//! store paths to stored archives:
//! - `PathInfo` (one per store path) and `NarMeta` (one per archive)
//! - Foreign-key and content-equality invariants across uploads
//! - Conversion between entities and the `.narinfo` text format
//! - A file-backed store (JSON documents, atomic renames) and an
//!   in-memory store

pub mod error;
pub mod file;
pub mod memory;
pub mod models;
pub mod store;

pub use error::{MetadataError, MetadataResult};
pub use file::FileMetadataStore;
pub use memory::MemoryMetadataStore;
pub use models::{render_narinfo, split_narinfo, NarMeta, PathInfo};
pub use store::MetadataStore;
