//! Configuration types shared across crates.

use crate::chunker::{self, DEFAULT_AVG_CHUNK_SIZE};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Compression algorithm advertised for NAR downloads.
///
/// Deliberately restricted to cheap algorithms: the payload is re-compressed
/// on every GET, so xz-class codecs are never advertised.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EgressCompression {
    #[default]
    Zstd,
    Gzip,
    Brotli,
    None,
}

impl EgressCompression {
    /// The URL suffix appended to `.nar`.
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Zstd => ".zst",
            Self::Gzip => ".gz",
            Self::Brotli => ".br",
            Self::None => "",
        }
    }

    /// The value of the narinfo `Compression` field.
    pub fn narinfo_name(&self) -> &'static str {
        match self {
            Self::Zstd => "zstd",
            Self::Gzip => "gzip",
            Self::Brotli => "br",
            Self::None => "none",
        }
    }
}

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "[::]:9000").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Priority advertised in nix-cache-info. Lower is preferred.
    #[serde(default = "default_priority")]
    pub priority: u32,
    /// Compression algorithm advertised for NAR downloads.
    #[serde(default)]
    pub egress_compression: EgressCompression,
    /// Enable access logging.
    #[serde(default = "default_access_log")]
    pub access_log: bool,
}

fn default_bind() -> String {
    "[::]:9000".to_string()
}

fn default_priority() -> u32 {
    40
}

fn default_access_log() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            priority: default_priority(),
            egress_compression: EgressCompression::default(),
            access_log: default_access_log(),
        }
    }
}

/// Local cache configuration.
///
/// `path` holds the chunk pool (`castr/`), the blob indices (`caibx/`) and
/// the metadata documents (`narinfo/`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Root directory for all persisted state.
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,
    /// Average chunk size used when chunking NAR payloads, in bytes.
    /// Minimum cut is a quarter of this, maximum is four times.
    #[serde(default = "default_avg_chunk_size")]
    pub avg_chunk_size: usize,
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("/var/cache/decant")
}

fn default_avg_chunk_size() -> usize {
    DEFAULT_AVG_CHUNK_SIZE
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
            avg_chunk_size: default_avg_chunk_size(),
        }
    }
}

impl CacheConfig {
    /// Validate cache configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        chunker::ChunkerParams::from_avg(self.avg_chunk_size)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Local cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,
}

impl AppConfig {
    /// Validate the whole configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.cache.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.bind, "[::]:9000");
        assert_eq!(config.server.priority, 40);
        assert_eq!(config.server.egress_compression, EgressCompression::Zstd);
        assert!(config.server.access_log);
        assert_eq!(config.cache.avg_chunk_size, DEFAULT_AVG_CHUNK_SIZE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_partial_config() {
        let json = r#"{"server": {"priority": 10}}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.server.priority, 10);
        assert_eq!(config.server.bind, "[::]:9000");
    }

    #[test]
    fn test_egress_compression_lowercase_names() {
        let decoded: EgressCompression = serde_json::from_str("\"brotli\"").unwrap();
        assert_eq!(decoded, EgressCompression::Brotli);
        assert_eq!(decoded.narinfo_name(), "br");
        assert_eq!(decoded.suffix(), ".br");
    }

    #[test]
    fn test_validate_rejects_tiny_chunk_size() {
        let config = AppConfig {
            cache: CacheConfig {
                avg_chunk_size: 16,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
