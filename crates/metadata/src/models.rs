//! Metadata entities and their narinfo conversion.

use crate::error::{MetadataError, MetadataResult};
use decant_core::config::EgressCompression;
use decant_core::{NarHash, NarInfo, OutputHash, Signature, StorePath};
use serde::{Deserialize, Serialize};

/// Per-store-path metadata, keyed by the output hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathInfo {
    /// The store path identifier.
    pub output_hash: OutputHash,
    /// The store path name (the part after `<hash>-`).
    pub name: String,
    /// Archive this path is served from (FK into NarMeta).
    pub nar_hash: NarHash,
    /// Deriver basename, empty when unknown.
    pub deriver: String,
    /// Platform string, empty when absent.
    pub system: String,
    /// Signatures, stored verbatim and echoed.
    pub signatures: Vec<Signature>,
    /// Content-addressability assertion, empty when absent.
    pub ca: String,
}

impl PathInfo {
    /// Render the full `/nix/store/...` path.
    pub fn store_path(&self) -> String {
        format!(
            "{}/{}-{}",
            StorePath::STORE_DIR,
            self.output_hash.to_base32(),
            self.name
        )
    }

    /// Sanity-check field shapes before a write.
    pub fn check(&self) -> MetadataResult<()> {
        if self.name.is_empty() {
            return Err(MetadataError::InvalidEntity("empty name".to_string()));
        }
        // Derivers can be empty (imported store paths); when present they
        // must hold at least a base32 hash, a dash, a name and `.drv`.
        if !self.deriver.is_empty()
            && !(self.deriver.ends_with(".drv") && self.deriver.len() > 32 + 1 + 1)
        {
            return Err(MetadataError::InvalidEntity(format!(
                "invalid deriver: {}",
                self.deriver
            )));
        }
        Ok(())
    }
}

/// Per-archive metadata, keyed by the NAR hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarMeta {
    /// SHA-256 of the decompressed archive; primary key.
    pub nar_hash: NarHash,
    /// Decompressed size in bytes.
    pub size: u64,
    /// Output hashes of the referenced store paths, in narinfo order.
    pub references: Vec<OutputHash>,
    /// The reference basenames, kept so rendering does not need to look up
    /// the referenced PathInfo entities.
    pub references_str: Vec<String>,
}

impl NarMeta {
    /// Sanity-check field shapes before a write: non-empty archive and
    /// reference lists that agree with each other.
    pub fn check(&self) -> MetadataResult<()> {
        if self.size == 0 {
            return Err(MetadataError::InvalidEntity("zero archive size".to_string()));
        }

        if self.references.len() != self.references_str.len() {
            return Err(MetadataError::InvalidEntity(
                "inconsistent reference list lengths".to_string(),
            ));
        }

        for (i, basename) in self.references_str.iter().enumerate() {
            if basename.len() < 32 || !basename.is_char_boundary(32) {
                return Err(MetadataError::InvalidEntity(format!(
                    "reference too short: {basename}"
                )));
            }
            let decoded = OutputHash::from_base32(&basename[..32]).map_err(|e| {
                MetadataError::InvalidEntity(format!("undecodable reference {basename}: {e}"))
            })?;
            if decoded != self.references[i] {
                return Err(MetadataError::InvalidEntity(format!(
                    "reference {i} does not match its decoded form: {basename}"
                )));
            }
        }

        Ok(())
    }

    /// Equality under the store's conflict policy. Size and NAR hash are
    /// always compared; `compare_references` additionally compares both
    /// reference forms in order.
    pub fn is_equal_to(&self, other: &NarMeta, compare_references: bool) -> bool {
        if self.size != other.size || self.nar_hash != other.nar_hash {
            return false;
        }
        if compare_references {
            if self.references != other.references {
                return false;
            }
            if self.references_str != other.references_str {
                return false;
            }
        }
        true
    }
}

/// Split a parsed narinfo into the two stored entities.
pub fn split_narinfo(narinfo: &NarInfo) -> MetadataResult<(PathInfo, NarMeta)> {
    let path_info = PathInfo {
        output_hash: *narinfo.store_path.output_hash(),
        name: narinfo.store_path.name().to_string(),
        nar_hash: narinfo.nar_hash,
        deriver: narinfo.deriver.clone(),
        system: narinfo.system.clone(),
        signatures: narinfo.signatures.clone(),
        ca: narinfo.ca.clone(),
    };

    let mut references = Vec::with_capacity(narinfo.references.len());
    for basename in &narinfo.references {
        let hash = OutputHash::from_base32(&basename[..32]).map_err(|e| {
            MetadataError::InvalidEntity(format!("undecodable reference {basename}: {e}"))
        })?;
        references.push(hash);
    }

    let nar_meta = NarMeta {
        nar_hash: narinfo.nar_hash,
        size: narinfo.nar_size,
        references,
        references_str: narinfo.references.clone(),
    };

    Ok((path_info, nar_meta))
}

/// Render a narinfo from stored entities.
///
/// The URL points at the logical archive
/// (`nar/<nar hash>.nar<egress suffix>`); `FileHash`/`FileSize` are
/// omitted since the file is materialized on demand and its compressed
/// size is unknown in advance.
pub fn render_narinfo(
    path_info: &PathInfo,
    nar_meta: &NarMeta,
    egress: EgressCompression,
) -> MetadataResult<String> {
    let store_path = StorePath::new(path_info.output_hash, &path_info.name)
        .map_err(|e| MetadataError::InvalidEntity(e.to_string()))?;

    let narinfo = NarInfo {
        store_path,
        url: format!(
            "nar/{}.nar{}",
            nar_meta.nar_hash.to_base32(),
            egress.suffix()
        ),
        compression: egress.narinfo_name().to_string(),
        file_hash: None,
        file_size: None,
        nar_hash: nar_meta.nar_hash,
        nar_size: nar_meta.size,
        references: nar_meta.references_str.clone(),
        deriver: path_info.deriver.clone(),
        system: path_info.system.clone(),
        signatures: path_info.signatures.clone(),
        ca: path_info.ca.clone(),
    };

    Ok(narinfo.to_text())
}
