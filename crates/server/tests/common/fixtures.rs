//! Deterministic NAR and narinfo fixtures.

use decant_core::{ContentHash, OutputHash};

/// Deterministic pseudo-random payload; different seeds give unrelated
/// content.
#[allow(dead_code)]
pub fn nar_fixture(seed: u64, len: usize) -> Vec<u8> {
    let mut state = seed.wrapping_mul(0x9e37_79b9_7f4a_7c15) | 1;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (state >> 52) as u8
        })
        .collect()
}

/// The download/upload URL for a payload, `suffix` like `""` or `".zst"`.
#[allow(dead_code)]
pub fn nar_url(data: &[u8], suffix: &str) -> String {
    format!("/nar/{}.nar{}", ContentHash::compute(data).to_base32(), suffix)
}

/// A fixed store-path identifier per seed.
#[allow(dead_code)]
pub fn output_hash(seed: u8) -> OutputHash {
    OutputHash::from_bytes([seed; 20])
}

/// Build narinfo text describing `data` for the given store path.
#[allow(dead_code)]
pub fn narinfo_text(
    output_hash: &OutputHash,
    name: &str,
    data: &[u8],
    references: &[String],
) -> String {
    let digest = ContentHash::compute(data).to_base32();
    let mut text = format!(
        "StorePath: /nix/store/{out}-{name}\n\
         URL: nar/{digest}.nar\n\
         Compression: none\n\
         NarHash: sha256:{digest}\n\
         NarSize: {size}\n",
        out = output_hash.to_base32(),
        size = data.len(),
    );
    if !references.is_empty() {
        text.push_str(&format!("References: {}\n", references.join(" ")));
    }
    text.push_str("System: x86_64-linux\n");
    text.push_str("Sig: cache.example.org-1:dGVzdHNpZw==\n");
    text
}

/// The basename a narinfo References entry would use for this path.
#[allow(dead_code)]
pub fn basename(output_hash: &OutputHash, name: &str) -> String {
    format!("{}-{}", output_hash.to_base32(), name)
}
