//! Estimates how much a set of files would shrink under content-defined
//! deduplication plus per-chunk compression, without storing anything.
//!
//! Every file is cut into variable-size chunks by a gear rolling hash, so
//! chunk boundaries track content rather than offsets and survive
//! insertions. Chunks are keyed by a 128-bit fingerprint; each distinct
//! content is counted once and LZ4-compressed once, no matter how many
//! times or in how many files it appears.
//!
//! ```no_run
//! use dedupe_estimator::estimate;
//!
//! # fn main() -> dedupe_estimator::Result<()> {
//! let stats = estimate(&["data/part-0.parquet", "data/part-1.parquet"])?;
//! println!(
//!     "dedup {:.2}x, with compression {:.2}x",
//!     stats.total_len as f64 / stats.chunk_bytes as f64,
//!     stats.total_len as f64 / stats.compressed_chunk_bytes as f64,
//! );
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use indicatif::ParallelProgressIterator;
use rayon::prelude::*;
use tracing::debug;

mod chunker;
mod compress;
mod config;
mod corpus;
mod error;
mod fingerprint;

pub use chunker::{Chunk, Chunker};
pub use config::{ChunkerConfig, DEFAULT_TARGET_SIZE};
pub use corpus::{CorpusAccumulator, EstimateResult, UniqueChunkEntry};
pub use error::{EstimateError, Result};
pub use fingerprint::Fingerprint;

/// Estimates deduplication and compression savings with default chunking
/// parameters.
///
/// Files are processed in parallel; statistics are independent of file
/// order. Fails on the first unreadable file and returns no partial
/// results.
pub fn estimate<P: AsRef<Path> + Sync>(paths: &[P]) -> Result<EstimateResult> {
    estimate_with_config(paths, &ChunkerConfig::default())
}

/// Same as [`estimate`], with explicit chunking parameters.
pub fn estimate_with_config<P: AsRef<Path> + Sync>(
    paths: &[P],
    config: &ChunkerConfig,
) -> Result<EstimateResult> {
    config.validate()?;
    if paths.is_empty() {
        return Err(EstimateError::InvalidConfig("no input paths given".into()));
    }

    let accumulator = CorpusAccumulator::new();
    paths
        .par_iter()
        .progress_count(paths.len() as u64)
        .try_for_each(|path| accumulator.ingest_file(path.as_ref(), config).map(|_| ()))?;

    let result = accumulator.into_result();
    debug!(
        files = paths.len(),
        total_len = result.total_len,
        chunk_bytes = result.chunk_bytes,
        compressed_chunk_bytes = result.compressed_chunk_bytes,
        "estimate complete"
    );
    Ok(result)
}
