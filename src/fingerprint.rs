//! Chunk identity for deduplication.

use std::fmt;

use xxhash_rust::xxh3::xxh3_128;

/// 128-bit content digest used as the deduplication key.
///
/// A pure function of the chunk's bytes: equal content yields an equal
/// fingerprint regardless of which file or offset it came from. At this
/// width, accidental collisions stay negligible even for corpora with
/// millions of chunks; the hash is not adversarially secure and does not
/// need to be.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(u128);

impl Fingerprint {
    /// Digests one chunk's bytes.
    pub fn of(bytes: &[u8]) -> Self {
        Fingerprint(xxh3_128(bytes))
    }

    /// Raw digest value.
    pub fn as_u128(self) -> u128 {
        self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({:032x})", self.0)
    }
}
