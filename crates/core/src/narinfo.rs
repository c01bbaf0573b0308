//! The `.narinfo` text format.
//!
//! Line-oriented `Key: value` pairs tying a store path to a NAR archive,
//! its hashes and its runtime references. Parsing accepts everything a Nix
//! client may upload (including `FileHash`/`FileSize` and repeated `Sig`
//! lines); rendering is handled by the metadata layer, which synthesizes
//! narinfos from stored entities.

use crate::hash::NarHash;
use crate::store_path::StorePath;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Parsed contents of a `.narinfo` file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NarInfo {
    /// The store path this narinfo describes.
    pub store_path: StorePath,
    /// URL to download the NAR (relative path).
    pub url: String,
    /// Compression of the file behind `url`.
    pub compression: String,
    /// Hash of the compressed file, kept verbatim. Unused by the engine:
    /// archives are stored decompressed and re-compressed on the way out.
    pub file_hash: Option<String>,
    /// Size of the compressed file, kept verbatim.
    pub file_size: Option<u64>,
    /// Hash of the uncompressed NAR.
    pub nar_hash: NarHash,
    /// Size of the uncompressed NAR.
    pub nar_size: u64,
    /// References to other store paths, as basenames (`hash-name`).
    pub references: Vec<String>,
    /// Deriver basename, empty when unknown.
    pub deriver: String,
    /// Platform string, empty when absent.
    pub system: String,
    /// Signatures, echoed verbatim.
    pub signatures: Vec<Signature>,
    /// Content-addressability assertion, empty when absent.
    pub ca: String,
}

impl NarInfo {
    /// Parse narinfo text.
    pub fn parse(text: &str) -> crate::Result<Self> {
        let mut store_path: Option<StorePath> = None;
        let mut url: Option<String> = None;
        let mut compression: Option<String> = None;
        let mut file_hash: Option<String> = None;
        let mut file_size: Option<u64> = None;
        let mut nar_hash: Option<NarHash> = None;
        let mut nar_size: Option<u64> = None;
        let mut references = Vec::new();
        let mut deriver = String::new();
        let mut system = String::new();
        let mut signatures = Vec::new();
        let mut ca = String::new();

        for line in text.lines() {
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }

            let (key, value) = line
                .split_once(": ")
                .ok_or_else(|| crate::Error::NarInfoParse(format!("invalid line: {line}")))?;

            match key {
                "StorePath" => store_path = Some(StorePath::parse(value)?),
                "URL" => url = Some(value.to_string()),
                "Compression" => compression = Some(value.to_string()),
                "FileHash" => file_hash = Some(value.to_string()),
                "FileSize" => {
                    file_size = Some(value.parse().map_err(|e| {
                        crate::Error::NarInfoParse(format!("invalid FileSize: {e}"))
                    })?)
                }
                "NarHash" => nar_hash = Some(NarHash::from_nix_string(value)?),
                "NarSize" => {
                    nar_size =
                        Some(value.parse().map_err(|e| {
                            crate::Error::NarInfoParse(format!("invalid NarSize: {e}"))
                        })?)
                }
                "References" => {
                    for r in value.split_whitespace() {
                        StorePath::from_basename(r).map_err(|e| {
                            crate::Error::NarInfoParse(format!("invalid reference '{r}': {e}"))
                        })?;
                        references.push(r.to_string());
                    }
                }
                "Deriver" => {
                    StorePath::from_basename(value).map_err(|e| {
                        crate::Error::NarInfoParse(format!("invalid deriver '{value}': {e}"))
                    })?;
                    deriver = value.to_string();
                }
                "System" => system = value.to_string(),
                "Sig" => signatures.push(Signature::parse(value)?),
                "CA" => ca = value.to_string(),
                _ => {} // Ignore unknown fields
            }
        }

        Ok(Self {
            store_path: store_path
                .ok_or_else(|| crate::Error::NarInfoParse("missing StorePath".to_string()))?,
            url: url.ok_or_else(|| crate::Error::NarInfoParse("missing URL".to_string()))?,
            compression: compression.unwrap_or_else(|| "none".to_string()),
            file_hash,
            file_size,
            nar_hash: nar_hash
                .ok_or_else(|| crate::Error::NarInfoParse("missing NarHash".to_string()))?,
            nar_size: nar_size
                .ok_or_else(|| crate::Error::NarInfoParse("missing NarSize".to_string()))?,
            references,
            deriver,
            system,
            signatures,
            ca,
        })
    }

    /// Format as narinfo text.
    pub fn to_text(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("StorePath: {}", self.store_path));
        lines.push(format!("URL: {}", self.url));
        lines.push(format!("Compression: {}", self.compression));

        if let Some(ref file_hash) = self.file_hash {
            lines.push(format!("FileHash: {file_hash}"));
        }
        if let Some(file_size) = self.file_size {
            lines.push(format!("FileSize: {file_size}"));
        }

        lines.push(format!("NarHash: {}", self.nar_hash.to_nix_string()));
        lines.push(format!("NarSize: {}", self.nar_size));

        if !self.references.is_empty() {
            lines.push(format!("References: {}", self.references.join(" ")));
        }
        if !self.deriver.is_empty() {
            lines.push(format!("Deriver: {}", self.deriver));
        }
        if !self.system.is_empty() {
            lines.push(format!("System: {}", self.system));
        }
        for sig in &self.signatures {
            lines.push(format!("Sig: {sig}"));
        }
        if !self.ca.is_empty() {
            lines.push(format!("CA: {}", self.ca));
        }

        lines.join("\n") + "\n"
    }
}

/// A narinfo signature.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Key name (e.g., "cache.example.com-1").
    pub key_name: String,
    /// Base64-encoded signature bytes, stored verbatim.
    pub signature: String,
}

impl Signature {
    /// Create a new signature.
    pub fn new(key_name: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            key_name: key_name.into(),
            signature: signature.into(),
        }
    }

    /// Parse from "keyname:signature" format.
    pub fn parse(s: &str) -> crate::Result<Self> {
        let (key_name, signature) = s
            .split_once(':')
            .ok_or_else(|| crate::Error::NarInfoParse(format!("invalid signature format: {s}")))?;
        Ok(Self {
            key_name: key_name.to_string(),
            signature: signature.to_string(),
        })
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.key_name, self.signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::ContentHash;

    fn sample_nar_hash() -> NarHash {
        NarHash::from_content_hash(ContentHash::compute(b"sample nar"))
    }

    fn sample_text() -> String {
        format!(
            "StorePath: /nix/store/aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa-test\n\
             URL: nar/{digest}.nar.zst\n\
             Compression: zstd\n\
             NarHash: sha256:{digest}\n\
             NarSize: 12345\n",
            digest = sample_nar_hash().to_base32()
        )
    }

    #[test]
    fn test_parse_minimal() {
        let ni = NarInfo::parse(&sample_text()).unwrap();
        assert_eq!(ni.store_path.name(), "test");
        assert_eq!(ni.compression, "zstd");
        assert_eq!(ni.nar_size, 12345);
        assert!(ni.references.is_empty());
        assert!(ni.file_hash.is_none());
    }

    #[test]
    fn test_text_roundtrip() {
        let text = sample_text();
        let ni = NarInfo::parse(&text).unwrap();
        assert_eq!(ni.to_text(), text);
    }

    #[test]
    fn test_roundtrip_with_references_and_sigs() {
        let text = format!(
            "StorePath: /nix/store/cccccccccccccccccccccccccccccccc-pkg\n\
             URL: nar/{digest}.nar\n\
             Compression: none\n\
             NarHash: sha256:{digest}\n\
             NarSize: 99\n\
             References: aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa-dep1 bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb-dep2\n\
             Deriver: dddddddddddddddddddddddddddddddd-pkg.drv\n\
             System: x86_64-linux\n\
             Sig: cache.example.org-1: AAAA\n\
             Sig: backup.example.org-1:BBBB\n\
             CA: fixed:r:sha256:{digest}\n",
            digest = sample_nar_hash().to_base32()
        );
        let ni = NarInfo::parse(&text).unwrap();
        assert_eq!(ni.references.len(), 2);
        assert_eq!(ni.deriver, "dddddddddddddddddddddddddddddddd-pkg.drv");
        assert_eq!(ni.signatures.len(), 2);
        assert_eq!(ni.signatures[0].key_name, "cache.example.org-1");

        // Sig values may themselves contain what looks like key separators;
        // everything after the first ':' is the signature payload.
        assert_eq!(ni.signatures[0].signature, " AAAA");
    }

    #[test]
    fn test_parse_keeps_file_fields() {
        let text = format!(
            "{}FileHash: sha256:{digest}\nFileSize: 4242\n",
            sample_text(),
            digest = sample_nar_hash().to_base32()
        );
        let ni = NarInfo::parse(&text).unwrap();
        assert_eq!(ni.file_size, Some(4242));
        assert!(ni.file_hash.is_some());
    }

    #[test]
    fn test_parse_rejects_sri_nar_hash() {
        let text = "\
StorePath: /nix/store/aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa-test
URL: nar/abc.nar
Compression: none
NarHash: sha256-LCa0a2j/xo/5m0U8HTBBNBNCLXBkg7+g+YpeiGJm564=
NarSize: 100
";
        assert!(NarInfo::parse(text).is_err());
    }

    #[test]
    fn test_parse_rejects_invalid_reference() {
        let text = format!("{}References: not-a-store-path\n", sample_text());
        assert!(NarInfo::parse(&text).is_err());
    }

    #[test]
    fn test_parse_non_ascii_reference_does_not_panic() {
        let text = format!(
            "{}References: aaaaaaaaaaaaaaaaaaaaaaaaaaaaaa\u{00e9}\u{00e9}-foo\n",
            sample_text()
        );
        assert!(NarInfo::parse(&text).is_err());
    }

    #[test]
    fn test_parse_missing_store_path() {
        let text = format!(
            "URL: nar/x.nar\nNarHash: sha256:{}\nNarSize: 1\n",
            sample_nar_hash().to_base32()
        );
        assert!(NarInfo::parse(&text).is_err());
    }

    #[test]
    fn test_signature_parse() {
        let sig = Signature::parse("cache.example.com-1:ABCD1234").unwrap();
        assert_eq!(sig.key_name, "cache.example.com-1");
        assert_eq!(sig.signature, "ABCD1234");
        assert_eq!(sig.to_string(), "cache.example.com-1:ABCD1234");
    }
}
