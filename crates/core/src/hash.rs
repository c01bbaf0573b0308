//! Cryptographic hash types and utilities.

use crate::base32;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A SHA-256 content hash represented as 32 bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Create a new ContentHash from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Compute SHA-256 hash of data.
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Create an incremental hasher.
    pub fn hasher() -> ContentHasher {
        ContentHasher(Sha256::new())
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> crate::Result<Self> {
        if s.len() != 64 {
            return Err(crate::Error::InvalidHash(format!(
                "expected 64 hex chars, got {}",
                s.len()
            )));
        }
        let mut bytes = [0u8; 32];
        for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
            let hex_str =
                std::str::from_utf8(chunk).map_err(|e| crate::Error::InvalidHash(e.to_string()))?;
            bytes[i] = u8::from_str_radix(hex_str, 16)
                .map_err(|e| crate::Error::InvalidHash(e.to_string()))?;
        }
        Ok(Self(bytes))
    }

    /// Encode as lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse from a 52-character Nix base-32 string.
    pub fn from_base32(s: &str) -> crate::Result<Self> {
        let bytes = base32::decode(s)?;
        let arr: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            crate::Error::InvalidHash(format!("expected 32 bytes, got {}", v.len()))
        })?;
        Ok(Self(arr))
    }

    /// Encode as a 52-character Nix base-32 string.
    pub fn to_base32(&self) -> String {
        base32::encode(&self.0)
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Incremental SHA-256 hasher.
pub struct ContentHasher(Sha256);

impl ContentHasher {
    /// Update the hasher with data.
    pub fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> ContentHash {
        ContentHash(self.0.finalize().into())
    }
}

/// The SHA-256 of a decompressed NAR archive.
///
/// Rendered in narinfo files as `sha256:` followed by 52 Nix base-32
/// characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NarHash(ContentHash);

impl NarHash {
    /// Create from a ContentHash.
    pub fn from_content_hash(hash: ContentHash) -> Self {
        Self(hash)
    }

    /// Get the underlying content hash.
    pub fn content_hash(&self) -> &ContentHash {
        &self.0
    }

    /// Get the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }

    /// Parse from the narinfo representation (`sha256:<52 base32 chars>`).
    pub fn from_nix_string(s: &str) -> crate::Result<Self> {
        let digest = s.strip_prefix("sha256:").ok_or_else(|| {
            crate::Error::InvalidHash(format!("expected sha256: prefix, got: {s}"))
        })?;
        if digest.len() != 52 {
            return Err(crate::Error::InvalidHash(format!(
                "expected 52 base32 chars, got {}",
                digest.len()
            )));
        }
        Ok(Self(ContentHash::from_base32(digest)?))
    }

    /// Encode in the narinfo representation.
    pub fn to_nix_string(&self) -> String {
        format!("sha256:{}", self.0.to_base32())
    }

    /// Encode the digest alone as Nix base-32 (used in NAR URLs).
    pub fn to_base32(&self) -> String {
        self.0.to_base32()
    }
}

impl fmt::Debug for NarHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NarHash({})", self.to_nix_string())
    }
}

impl fmt::Display for NarHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_nix_string())
    }
}
