//! Content-defined chunking of byte streams.
//!
//! Boundaries are placed where a gear rolling hash of the trailing bytes
//! has all bits of a target-derived mask equal to zero, so they move with
//! the content instead of sitting at fixed offsets. Inserting or deleting
//! bytes in one region of a file therefore perturbs only nearby chunks;
//! unmodified byte runs elsewhere keep chunking identically and still
//! deduplicate across revisions of a file.

use std::io::{self, Read};

use gearhash::Hasher;

use crate::config::ChunkerConfig;

/// Size of the streaming read buffer.
const READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Effective window of the gear hash: one shifted-in byte per bit of state.
const HASH_WINDOW: usize = 64;

/// One content-defined chunk of a byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Byte offset of this chunk within its stream.
    pub offset: u64,
    /// The chunk's bytes. Never empty.
    pub data: Vec<u8>,
}

impl Chunk {
    /// Chunk length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True for a zero-length chunk; the chunker never produces one.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Streaming content-defined chunker over any byte source.
///
/// Yields `io::Result<Chunk>` lazily while scanning the source exactly
/// once through a fixed read buffer; at most one chunk (bounded by
/// `max_size`) is held in memory at a time. Every chunker instance scans
/// its own source from the start and shares no state with other instances.
///
/// Within each chunk the scan works in three phases: the first
/// `min_size - 64` bytes are copied without hashing (no eligible boundary
/// can fall there, and the 64-byte hash window cannot reach past it), the
/// hash then warms up over the remaining run-in, and from `min_size`
/// onward the first position whose hash survives the boundary mask ends
/// the chunk. A cut is forced at `max_size` when no natural boundary
/// appears, which bounds chunk size even on constant or otherwise
/// degenerate content. Hash state is reset at every cut, so boundary
/// decisions depend only on bytes of the current chunk; identical content
/// at identical relative position always chunks identically.
///
/// The final chunk of a stream is whatever remains at end of input and may
/// be shorter than `min_size`; an empty stream yields nothing.
pub struct Chunker<R> {
    reader: R,
    min_size: usize,
    max_size: usize,
    mask: u64,
    /// Length of the unhashed prefix of each chunk.
    skip_len: usize,
    hasher: Hasher<'static>,
    buf: Vec<u8>,
    buf_start: usize,
    buf_len: usize,
    /// Stream offset of the start of the chunk being built.
    offset: u64,
    chunk: Vec<u8>,
    done: bool,
}

impl<R: Read> Chunker<R> {
    /// Creates a chunker that scans `reader` with the given bounds.
    pub fn new(reader: R, config: &ChunkerConfig) -> Self {
        Chunker {
            reader,
            min_size: config.min_size,
            max_size: config.max_size,
            mask: config.boundary_mask(),
            skip_len: config.min_size.saturating_sub(HASH_WINDOW),
            hasher: Hasher::default(),
            buf: vec![0; READ_BUFFER_SIZE],
            buf_start: 0,
            buf_len: 0,
            offset: 0,
            chunk: Vec::new(),
            done: false,
        }
    }

    fn refill(&mut self) -> io::Result<usize> {
        self.buf_start = 0;
        self.buf_len = self.reader.read(&mut self.buf)?;
        Ok(self.buf_len)
    }

    /// Emits the bytes gathered so far and resets per-chunk state.
    fn take_chunk(&mut self) -> Chunk {
        self.hasher = Hasher::default();
        let data = std::mem::take(&mut self.chunk);
        let offset = self.offset;
        self.offset += data.len() as u64;
        Chunk { offset, data }
    }
}

impl<R: Read> Iterator for Chunker<R> {
    type Item = io::Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            if self.buf_start == self.buf_len {
                match self.refill() {
                    Ok(0) => {
                        self.done = true;
                        if self.chunk.is_empty() {
                            return None;
                        }
                        // Final remainder; may be shorter than min_size.
                        return Some(Ok(self.take_chunk()));
                    }
                    Ok(_) => {}
                    Err(e) => {
                        self.done = true;
                        return Some(Err(e));
                    }
                }
            }

            let available = &self.buf[self.buf_start..self.buf_len];

            if self.chunk.len() < self.skip_len {
                // No boundary can be eligible this early; copy without
                // feeding the hasher.
                let take = available.len().min(self.skip_len - self.chunk.len());
                self.chunk.extend_from_slice(&available[..take]);
                self.buf_start += take;
                continue;
            }

            // Scan no further than the forced-cut point.
            let budget = self.max_size.saturating_sub(self.chunk.len());
            let scan = &available[..available.len().min(budget)];

            match self.hasher.next_match(scan, self.mask) {
                Some(len) => {
                    self.chunk.extend_from_slice(&scan[..len]);
                    self.buf_start += len;
                    // Matches inside the minimum size are ignored; the
                    // hash keeps rolling through them.
                    if self.chunk.len() >= self.min_size {
                        return Some(Ok(self.take_chunk()));
                    }
                }
                None => {
                    self.chunk.extend_from_slice(scan);
                    self.buf_start += scan.len();
                    if self.chunk.len() >= self.max_size {
                        return Some(Ok(self.take_chunk()));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn lcg_bytes(mut state: u64, len: usize) -> Vec<u8> {
        let mut data = vec![0u8; len];
        for byte in &mut data {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            *byte = (state >> 33) as u8;
        }
        data
    }

    fn chunk_all(data: &[u8], config: &ChunkerConfig) -> Vec<Chunk> {
        Chunker::new(Cursor::new(data), config)
            .collect::<io::Result<Vec<_>>>()
            .unwrap()
    }

    fn test_config() -> ChunkerConfig {
        ChunkerConfig::from_target(16 * 1024)
    }

    #[test]
    fn chunks_reassemble_the_stream() {
        let config = test_config();
        let data = lcg_bytes(1, 1024 * 1024 + 311);
        let chunks = chunk_all(&data, &config);

        let mut offset = 0u64;
        let mut rebuilt = Vec::new();
        for chunk in &chunks {
            assert_eq!(chunk.offset, offset, "gap or overlap at {offset}");
            assert!(!chunk.is_empty());
            offset += chunk.len() as u64;
            rebuilt.extend_from_slice(&chunk.data);
        }
        assert_eq!(rebuilt, data);
    }

    #[test]
    fn bounds_hold_for_all_but_the_final_chunk() {
        let config = test_config();
        let data = lcg_bytes(2, 2 * 1024 * 1024);
        let chunks = chunk_all(&data, &config);

        assert!(chunks.len() > 4, "expected several chunks");
        for chunk in &chunks[..chunks.len() - 1] {
            assert!(chunk.len() >= config.min_size, "undersized chunk");
            assert!(chunk.len() <= config.max_size, "oversized chunk");
        }
        assert!(chunks[chunks.len() - 1].len() <= config.max_size);
    }

    #[test]
    fn same_content_chunks_identically() {
        let config = test_config();
        let data = lcg_bytes(3, 700 * 1024);
        let first = chunk_all(&data, &config);
        let second = chunk_all(&data, &config);
        assert_eq!(first, second);
    }

    #[test]
    fn fragmented_reads_chunk_identically() {
        // Read sizes must not influence boundary placement.
        struct DribbleReader<'a> {
            data: &'a [u8],
            pos: usize,
        }

        impl Read for DribbleReader<'_> {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                let n = buf.len().min(997).min(self.data.len() - self.pos);
                buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
                self.pos += n;
                Ok(n)
            }
        }

        let config = test_config();
        let data = lcg_bytes(7, 300 * 1024);

        let whole = chunk_all(&data, &config);
        let dribbled = Chunker::new(DribbleReader { data: &data, pos: 0 }, &config)
            .collect::<io::Result<Vec<_>>>()
            .unwrap();

        assert_eq!(whole, dribbled);
    }

    #[test]
    fn empty_stream_yields_no_chunks() {
        let config = test_config();
        assert!(chunk_all(&[], &config).is_empty());
    }

    #[test]
    fn short_stream_is_a_single_chunk() {
        let config = test_config();
        let data = lcg_bytes(4, config.min_size / 2);
        let chunks = chunk_all(&data, &config);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].offset, 0);
        assert_eq!(chunks[0].data, data);
    }

    #[test]
    fn constant_content_forces_max_size_cuts() {
        // A constant run never satisfies the boundary mask, so every cut
        // is forced at the ceiling.
        let config = ChunkerConfig::from_target(64 * 1024);
        let data = vec![0u8; 10 * config.max_size];
        let chunks = chunk_all(&data, &config);

        assert_eq!(chunks.len(), 10);
        for chunk in &chunks {
            assert_eq!(chunk.len(), config.max_size);
        }
    }

    #[test]
    fn prefix_insertion_leaves_later_chunks_intact() {
        let config = test_config();
        let base = lcg_bytes(5, 512 * 1024);
        let mut shifted = lcg_bytes(99, 1024);
        shifted.extend_from_slice(&base);

        let base_chunks = chunk_all(&base, &config);
        let shifted_chunks = chunk_all(&shifted, &config);

        let base_data: std::collections::HashSet<&[u8]> =
            base_chunks.iter().map(|c| c.data.as_slice()).collect();
        let shared = shifted_chunks
            .iter()
            .filter(|c| base_data.contains(c.data.as_slice()))
            .count();
        assert!(
            shared > base_chunks.len() / 2,
            "only {shared} of {} chunks survived a prefix insertion",
            base_chunks.len()
        );
    }

    #[test]
    fn read_error_surfaces_and_stops_iteration() {
        struct FailingReader {
            remaining: usize,
        }

        impl Read for FailingReader {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                if self.remaining == 0 {
                    return Err(io::Error::new(io::ErrorKind::BrokenPipe, "source died"));
                }
                let n = self.remaining.min(buf.len());
                buf[..n].fill(0xA7);
                self.remaining -= n;
                Ok(n)
            }
        }

        let config = test_config();
        let mut chunker = Chunker::new(FailingReader { remaining: 4096 }, &config);

        match chunker.next() {
            Some(Err(e)) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
            other => panic!("expected an error item, got {other:?}"),
        }
        assert!(chunker.next().is_none(), "iteration continued past error");
    }

    #[test]
    fn tiny_bounds_still_cover_the_stream() {
        let config = ChunkerConfig {
            target_size: 64,
            min_size: 16,
            max_size: 256,
        };
        let data = lcg_bytes(6, 10 * 1024);
        let chunks = chunk_all(&data, &config);

        let total: usize = chunks.iter().map(Chunk::len).sum();
        assert_eq!(total, data.len());
        for chunk in &chunks[..chunks.len() - 1] {
            assert!(chunk.len() >= config.min_size);
            assert!(chunk.len() <= config.max_size);
        }
    }
}
