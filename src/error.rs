//! Error type for estimation calls.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, EstimateError>;

/// Errors surfaced by an estimate call.
///
/// Every failure aborts the whole call; no partial statistics are ever
/// returned. The crate never retries, callers own that policy.
#[derive(Debug, Error)]
pub enum EstimateError {
    /// An input file could not be opened or read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// Path of the offending input.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Chunking bounds or the input list were rejected, before any I/O.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl EstimateError {
    pub(crate) fn read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        EstimateError::Read {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_error_names_the_path() {
        let err = EstimateError::read(
            "data/missing.parquet",
            io::Error::new(io::ErrorKind::NotFound, "no such file"),
        );
        let message = err.to_string();
        assert!(message.contains("data/missing.parquet"), "{message}");
    }

    #[test]
    fn config_error_carries_reason() {
        let err = EstimateError::InvalidConfig("min_size 10 exceeds max_size 5".into());
        assert!(err.to_string().contains("min_size 10"));
    }
}
