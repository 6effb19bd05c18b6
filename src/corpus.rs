//! Unique-chunk accounting across a corpus of inputs.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::debug;

use crate::chunker::Chunker;
use crate::compress::compressed_size;
use crate::config::ChunkerConfig;
use crate::error::{EstimateError, Result};
use crate::fingerprint::Fingerprint;

/// Accounting record for one distinct chunk content.
///
/// Created the first time its fingerprint is seen anywhere in the corpus
/// and immutable once the compressed size is filled in; identical bytes
/// compress identically, so there is never anything to update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniqueChunkEntry {
    /// Chunk length in bytes, identical for every occurrence.
    pub len: u64,
    /// LZ4 block size of the chunk, measured once.
    pub compressed_len: u64,
}

/// Statistics returned by an estimate call.
///
/// All sizes are in bytes. Callers that want ratios derive them as
/// `chunk_bytes / total_len` (dedup) and `compressed_chunk_bytes /
/// total_len` (compressed dedup).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EstimateResult {
    /// Raw bytes across all inputs, repeats included.
    pub total_len: u64,
    /// Bytes that remain after corpus-wide chunk deduplication.
    pub chunk_bytes: u64,
    /// Bytes that remain after additionally compressing each unique chunk.
    pub compressed_chunk_bytes: u64,
    /// Chunks observed across all inputs, repeats included.
    pub chunk_count: u64,
    /// Distinct chunk contents across all inputs.
    pub unique_chunk_count: u64,
}

/// Shared accounting state for one estimate invocation.
///
/// Inputs are ingested independently, in any order or in parallel; the
/// final statistics come out the same either way, because folding a chunk
/// in is a set union keyed by fingerprint, idempotent per fingerprint and
/// commutative across files. The accumulator owns the unique-chunk table
/// outright and keeps no state anywhere else.
#[derive(Debug, Default)]
pub struct CorpusAccumulator {
    total_len: AtomicU64,
    chunk_count: AtomicU64,
    index: Mutex<HashMap<Fingerprint, UniqueChunkEntry>>,
}

impl CorpusAccumulator {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one chunk into the shared table.
    fn merge_chunk(&self, bytes: &[u8]) {
        // Every occurrence counts toward the raw totals.
        self.total_len.fetch_add(bytes.len() as u64, Ordering::Relaxed);
        self.chunk_count.fetch_add(1, Ordering::Relaxed);

        let fingerprint = Fingerprint::of(bytes);

        // Brief critical section: existence check and reservation only.
        {
            let mut index = self.index.lock();
            if index.contains_key(&fingerprint) {
                // Repeat occurrences are free. This is the dedup effect
                // being measured.
                return;
            }
            index.insert(
                fingerprint,
                UniqueChunkEntry {
                    len: bytes.len() as u64,
                    compressed_len: 0,
                },
            );
        }

        // Only the worker that inserted the entry gets here, so the
        // measurement runs once per fingerprint and outside the lock.
        let compressed_len = compressed_size(bytes);
        if let Some(entry) = self.index.lock().get_mut(&fingerprint) {
            entry.compressed_len = compressed_len;
        }
    }

    /// Chunks, fingerprints and folds in one byte source.
    ///
    /// Returns the number of bytes consumed. An empty source contributes
    /// nothing. On error the source's already-merged chunks remain in the
    /// accumulator, which callers discard wholesale on failure.
    pub fn ingest_reader<R: Read>(&self, reader: R, config: &ChunkerConfig) -> io::Result<u64> {
        let mut len = 0u64;
        for chunk in Chunker::new(reader, config) {
            let chunk = chunk?;
            len += chunk.len() as u64;
            self.merge_chunk(&chunk.data);
        }
        Ok(len)
    }

    /// Opens, chunks and folds in one file.
    pub fn ingest_file(&self, path: &Path, config: &ChunkerConfig) -> Result<u64> {
        let file = File::open(path).map_err(|e| EstimateError::read(path, e))?;
        let len = self
            .ingest_reader(BufReader::new(file), config)
            .map_err(|e| EstimateError::read(path, e))?;
        debug!(path = %path.display(), len, "ingested file");
        Ok(len)
    }

    /// Number of distinct chunk contents seen so far.
    pub fn unique_chunks(&self) -> u64 {
        self.index.lock().len() as u64
    }

    /// Reduces the accumulator to its final statistics.
    pub fn into_result(self) -> EstimateResult {
        let index = self.index.into_inner();
        let mut chunk_bytes = 0u64;
        let mut compressed_chunk_bytes = 0u64;
        for entry in index.values() {
            chunk_bytes += entry.len;
            compressed_chunk_bytes += entry.compressed_len;
        }
        EstimateResult {
            total_len: self.total_len.into_inner(),
            chunk_bytes,
            compressed_chunk_bytes,
            chunk_count: self.chunk_count.into_inner(),
            unique_chunk_count: index.len() as u64,
        }
    }
}
