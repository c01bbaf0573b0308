//! Streaming NAR compression and decompression.
//!
//! Uploads arrive in whatever envelope the client chose; the full set of
//! Nix upload compressions is accepted on the way in. Downloads are
//! re-compressed on the fly, which makes egress a poor man's
//! content-encoding: only cheap algorithms are offered, and encoders run at
//! best-speed levels without ever buffering the payload.

use async_compression::tokio::bufread::{
    BrotliDecoder, BrotliEncoder, BzDecoder, GzipDecoder, GzipEncoder, Lz4Decoder, LzmaDecoder,
    XzDecoder, ZstdDecoder, ZstdEncoder,
};
use async_compression::Level;
use decant_core::config::EgressCompression;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncRead};

/// The requested algorithm exists but this server will not run it for the
/// attempted direction.
#[derive(Debug, Error)]
#[error("unsupported compression: {0}")]
pub struct UnsupportedCompression(pub String);

/// Compression algorithms appearing in NAR URL suffixes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Algorithm {
    None,
    Brotli,
    Bzip2,
    Gzip,
    Lz4,
    Lzip,
    Lzma,
    Xz,
    Zstd,
}

impl Algorithm {
    /// Map a URL suffix (`""`, `".zst"`, `".xz"`, ...) to its algorithm.
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "" => Some(Self::None),
            ".br" => Some(Self::Brotli),
            ".bz2" => Some(Self::Bzip2),
            ".gz" => Some(Self::Gzip),
            ".lz4" => Some(Self::Lz4),
            ".lzip" => Some(Self::Lzip),
            ".lzma" => Some(Self::Lzma),
            ".xz" => Some(Self::Xz),
            ".zst" => Some(Self::Zstd),
            _ => None,
        }
    }

    /// Canonical name for error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Brotli => "br",
            Self::Bzip2 => "bzip2",
            Self::Gzip => "gzip",
            Self::Lz4 => "lz4",
            Self::Lzip => "lzip",
            Self::Lzma => "lzma",
            Self::Xz => "xz",
            Self::Zstd => "zstd",
        }
    }

    /// The egress algorithm for this suffix, if the server serves it.
    pub fn as_egress(&self) -> Option<EgressCompression> {
        match self {
            Self::None => Some(EgressCompression::None),
            Self::Brotli => Some(EgressCompression::Brotli),
            Self::Gzip => Some(EgressCompression::Gzip),
            Self::Zstd => Some(EgressCompression::Zstd),
            _ => None,
        }
    }
}

/// Wrap `reader` so that reads yield the decompressed payload.
pub fn new_decoder<'a, R>(
    reader: R,
    algo: Algorithm,
) -> Result<Box<dyn AsyncRead + Send + Unpin + 'a>, UnsupportedCompression>
where
    R: AsyncBufRead + Send + Unpin + 'a,
{
    Ok(match algo {
        Algorithm::None => Box::new(reader),
        Algorithm::Brotli => Box::new(BrotliDecoder::new(reader)),
        Algorithm::Bzip2 => Box::new(BzDecoder::new(reader)),
        Algorithm::Gzip => Box::new(GzipDecoder::new(reader)),
        Algorithm::Lz4 => Box::new(Lz4Decoder::new(reader)),
        Algorithm::Lzma => Box::new(LzmaDecoder::new(reader)),
        Algorithm::Xz => Box::new(XzDecoder::new(reader)),
        Algorithm::Zstd => Box::new(ZstdDecoder::new(reader)),
        Algorithm::Lzip => return Err(UnsupportedCompression(algo.name().to_string())),
    })
}

/// Wrap `reader` so that reads yield the compressed payload.
pub fn new_encoder<'a, R>(
    reader: R,
    egress: EgressCompression,
) -> Box<dyn AsyncRead + Send + Unpin + 'a>
where
    R: AsyncBufRead + Send + Unpin + 'a,
{
    match egress {
        EgressCompression::None => Box::new(reader),
        EgressCompression::Gzip => Box::new(GzipEncoder::with_quality(reader, Level::Fastest)),
        EgressCompression::Brotli => Box::new(BrotliEncoder::with_quality(reader, Level::Fastest)),
        EgressCompression::Zstd => Box::new(ZstdEncoder::with_quality(reader, Level::Fastest)),
    }
}
