//! Chunking bounds and boundary-mask derivation.

use crate::error::{EstimateError, Result};

/// Default expected chunk length: 256 KiB.
pub const DEFAULT_TARGET_SIZE: usize = 256 * 1024;

/// Controls the chunk size distribution of the content-defined chunker.
///
/// `target_size` sets the expected average chunk length; `min_size` and
/// `max_size` bound every chunk (except a stream's final remainder, which
/// may come up short). The boundary test is tuned so that it fires with
/// probability `~= 1/target_size` per scanned byte.
///
/// The defaults keep the conventional geometry of a quarter floor and a
/// four-times ceiling around a 256 KiB target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerConfig {
    /// Expected average chunk length in bytes.
    pub target_size: usize,
    /// Hard floor: no boundary is taken before this many bytes.
    pub min_size: usize,
    /// Hard ceiling: a cut is forced once a chunk reaches this many bytes.
    pub max_size: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self::from_target(DEFAULT_TARGET_SIZE)
    }
}

impl ChunkerConfig {
    /// Derives bounds from a target size: floor at `target_size / 4`,
    /// ceiling at `target_size * 4`.
    pub fn from_target(target_size: usize) -> Self {
        ChunkerConfig {
            target_size,
            min_size: target_size / 4,
            max_size: target_size.saturating_mul(4),
        }
    }

    /// Rejects bounds the chunker cannot honor.
    ///
    /// Runs before any input is opened, so a bad configuration never
    /// produces partial I/O.
    pub fn validate(&self) -> Result<()> {
        if self.target_size == 0 {
            return Err(EstimateError::InvalidConfig(
                "target_size must be positive".into(),
            ));
        }
        if self.max_size == 0 {
            return Err(EstimateError::InvalidConfig(
                "max_size must be positive".into(),
            ));
        }
        if self.min_size > self.max_size {
            return Err(EstimateError::InvalidConfig(format!(
                "min_size {} exceeds max_size {}",
                self.min_size, self.max_size
            )));
        }
        if self.target_size < self.min_size || self.target_size > self.max_size {
            return Err(EstimateError::InvalidConfig(format!(
                "target_size {} outside [{}, {}]",
                self.target_size, self.min_size, self.max_size
            )));
        }
        Ok(())
    }

    /// Boundary mask with the high `floor(log2(target_size))` bits set.
    ///
    /// A uniformly distributed rolling-hash value satisfies
    /// `hash & mask == 0` with probability `~= 1/target_size`. High bits
    /// because the gear hash shifts history upward, so they see the widest
    /// window of recent content.
    pub(crate) fn boundary_mask(&self) -> u64 {
        let bits = (self.target_size as u64).ilog2();
        if bits == 0 {
            0
        } else {
            u64::MAX << (64 - bits)
        }
    }
}
