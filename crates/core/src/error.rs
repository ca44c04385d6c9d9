//! Error types for loading process snapshots

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading collector output
///
/// The detection and warning engines never fail; only getting data into
/// them can.
#[derive(Debug, Error)]
pub enum WitrError {
    /// Snapshot file does not exist
    #[error("Snapshot {} not found", path.display())]
    NotFound { path: PathBuf },

    /// Snapshot file could not be read
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot document is not valid JSON for the expected shape
    #[error("Invalid snapshot: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type for snapshot operations
pub type WitrResult<T> = Result<T, WitrError>;
