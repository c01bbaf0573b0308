//! Content-defined chunking.
//!
//! Blob payloads are split at boundaries chosen by a gear rolling hash over
//! a fixed 256-entry table, so identical data produces identical chunks
//! regardless of what surrounds it. The chunker is deterministic: the same
//! input always yields the same boundaries.

/// Default average chunk size: 64 KiB.
pub const DEFAULT_AVG_CHUNK_SIZE: usize = 64 * 1024;

/// Smallest accepted average chunk size: 1 KiB.
pub const MIN_AVG_CHUNK_SIZE: usize = 1024;

/// Largest accepted average chunk size: 16 MiB.
pub const MAX_AVG_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// Gear hash lookup table, generated from a fixed LCG so chunk boundaries
/// are stable across builds and platforms.
static GEAR_TABLE: [u64; 256] = {
    let mut table = [0u64; 256];
    let mut state: u64 = 0x9e37_79b9_7f4a_7c15;
    let mut i = 0;
    while i < 256 {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        table[i] = state;
        i += 1;
    }
    table
};

/// Chunk size parameters: `min = avg / 4`, `max = avg * 4`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkerParams {
    pub min: usize,
    pub avg: usize,
    pub max: usize,
}

impl ChunkerParams {
    /// Derive parameters from an average chunk size.
    pub fn from_avg(avg: usize) -> crate::Result<Self> {
        if !(MIN_AVG_CHUNK_SIZE..=MAX_AVG_CHUNK_SIZE).contains(&avg) {
            return Err(crate::Error::InvalidChunkerParams(format!(
                "average chunk size {avg} outside {MIN_AVG_CHUNK_SIZE}..={MAX_AVG_CHUNK_SIZE}"
            )));
        }
        Ok(Self {
            min: avg / 4,
            avg,
            max: avg * 4,
        })
    }
}

impl Default for ChunkerParams {
    fn default() -> Self {
        Self::from_avg(DEFAULT_AVG_CHUNK_SIZE).expect("default average is valid")
    }
}

/// Content-defined chunker using a gear rolling hash.
#[derive(Clone, Copy, Debug)]
pub struct Chunker {
    min: usize,
    max: usize,
    mask: u64,
}

impl Chunker {
    /// Create a chunker for the given parameters.
    pub fn new(params: &ChunkerParams) -> Self {
        // A boundary fires when the low `log2(avg)` bits of the rolling
        // hash are zero, giving chunks of `avg` expected size past `min`.
        let bits = params.avg.ilog2();
        Self {
            min: params.min,
            max: params.max,
            mask: (1u64 << bits) - 1,
        }
    }

    /// Length of the next chunk at the start of `data`.
    ///
    /// Returns `None` when more input could still move the boundary; with
    /// `eof` set the remainder always forms the final chunk. A cut is never
    /// shorter than `min` (except the final chunk) and never longer than
    /// `max`.
    pub fn next_cut(&self, data: &[u8], eof: bool) -> Option<usize> {
        if data.is_empty() {
            return None;
        }
        if data.len() <= self.min {
            return eof.then_some(data.len());
        }

        let mut hash: u64 = 0;
        for i in self.min..data.len() {
            if i >= self.max {
                return Some(self.max);
            }
            hash = (hash << 1).wrapping_add(GEAR_TABLE[data[i] as usize]);
            if hash & self.mask == 0 {
                return Some(i + 1);
            }
        }

        if eof {
            Some(data.len())
        } else if data.len() >= self.max {
            Some(self.max)
        } else {
            None
        }
    }

    /// Split a whole in-memory buffer into chunks.
    pub fn split<'a>(&self, data: &'a [u8]) -> Vec<&'a [u8]> {
        let mut chunks = Vec::new();
        let mut rest = data;
        while !rest.is_empty() {
            let cut = self
                .next_cut(rest, true)
                .expect("eof cut always present for non-empty input");
            let (chunk, tail) = rest.split_at(cut);
            chunks.push(chunk);
            rest = tail;
        }
        chunks
    }
}
