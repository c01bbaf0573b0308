//! Nix store path types and parsing.

use crate::base32;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The store path identifier: 20 bytes, rendered as 32 Nix base-32 chars.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputHash([u8; 20]);

impl OutputHash {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Decode from the 32-character base-32 form.
    pub fn from_base32(s: &str) -> crate::Result<Self> {
        if s.len() != 32 {
            return Err(crate::Error::InvalidStorePath(format!(
                "store path hash must be 32 chars, got {}",
                s.len()
            )));
        }
        let bytes = base32::decode(s)
            .map_err(|e| crate::Error::InvalidStorePath(format!("invalid hash part: {e}")))?;
        let arr: [u8; 20] = bytes.try_into().map_err(|v: Vec<u8>| {
            crate::Error::InvalidStorePath(format!("expected 20 bytes, got {}", v.len()))
        })?;
        Ok(Self(arr))
    }

    /// Encode as the 32-character base-32 form.
    pub fn to_base32(&self) -> String {
        base32::encode(&self.0)
    }

    /// Encode as lowercase hex (used for on-disk file names).
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Debug for OutputHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OutputHash({})", self.to_base32())
    }
}

impl fmt::Display for OutputHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base32())
    }
}

/// A full Nix store path (`/nix/store/<hash>-<name>`).
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorePath {
    output_hash: OutputHash,
    name: String,
}

impl StorePath {
    /// The standard Nix store directory.
    pub const STORE_DIR: &'static str = "/nix/store";

    /// Parse a full store path string.
    pub fn parse(path: &str) -> crate::Result<Self> {
        let prefix = format!("{}/", Self::STORE_DIR);
        let rest = path
            .strip_prefix(&prefix)
            .ok_or_else(|| crate::Error::InvalidStorePath(format!("must start with {prefix}")))?;
        Self::from_basename(rest)
    }

    /// Construct a `StorePath` from a basename (`hash-name`) string.
    pub fn from_basename(basename: &str) -> crate::Result<Self> {
        if !basename.is_ascii() {
            return Err(crate::Error::InvalidStorePath(
                "store path contains non-ASCII characters".to_string(),
            ));
        }

        if basename.len() < 34 {
            return Err(crate::Error::InvalidStorePath("path too short".to_string()));
        }

        let hash_part = &basename[..32];
        if basename.as_bytes()[32] != b'-' {
            return Err(crate::Error::InvalidStorePath(
                "expected '-' after hash".to_string(),
            ));
        }

        let name = &basename[33..];
        if name.is_empty() {
            return Err(crate::Error::InvalidStorePath(
                "name cannot be empty".to_string(),
            ));
        }
        for c in name.chars() {
            if !matches!(c, 'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' | '+' | '=' | '?') {
                return Err(crate::Error::InvalidStorePath(format!(
                    "invalid character in name: {c}"
                )));
            }
        }

        Ok(Self {
            output_hash: OutputHash::from_base32(hash_part)?,
            name: name.to_string(),
        })
    }

    /// Create from components.
    pub fn new(output_hash: OutputHash, name: impl Into<String>) -> crate::Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(crate::Error::InvalidStorePath(
                "name cannot be empty".to_string(),
            ));
        }
        Ok(Self { output_hash, name })
    }

    /// Get the store path identifier.
    pub fn output_hash(&self) -> &OutputHash {
        &self.output_hash
    }

    /// Get the name portion.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the full path string.
    pub fn to_path_string(&self) -> String {
        format!("{}/{}-{}", Self::STORE_DIR, self.output_hash, self.name)
    }

    /// Get the basename (`hash-name`) without the `/nix/store/` prefix.
    pub fn basename(&self) -> String {
        format!("{}-{}", self.output_hash, self.name)
    }
}

impl fmt::Debug for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StorePath({})", self.to_path_string())
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_path_string())
    }
}
