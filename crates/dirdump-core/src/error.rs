//! Error types for walking and file processing.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that end a walk.
///
/// Everything else that can go wrong during traversal is recorded as a
/// [`SkippedItem`](crate::SkippedItem) and the walk carries on.
#[derive(Debug, Error)]
pub enum WalkError {
    /// Root path could not be resolved.
    #[error("Cannot resolve root directory {path}: {source}")]
    InvalidRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Root path does not exist.
    #[error("Root directory not found: {path}")]
    RootNotFound { path: PathBuf },

    /// Root path is not a directory.
    #[error("Root path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// The walk was cancelled by its caller.
    #[error("Walk cancelled")]
    Cancelled,

    /// The walk ran past its deadline.
    #[error("Walk timed out after {timeout:?}")]
    DeadlineExceeded { timeout: Duration },
}

impl WalkError {
    /// Map an I/O error on the root path to the matching variant.
    pub fn root_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::RootNotFound { path },
            _ => Self::InvalidRoot { path, source },
        }
    }

    /// Whether this error came from cancellation rather than a bad root.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded { .. })
    }
}

/// Per-file failures handed to the walk handler instead of content.
#[derive(Debug, Error)]
pub enum FileError {
    /// The file could not be stat'ed.
    #[error("failed to get file info: {source}")]
    Stat {
        #[source]
        source: std::io::Error,
    },

    /// The file could not be read.
    #[error("failed to read file: {source}")]
    Read {
        #[source]
        source: std::io::Error,
    },

    /// The file is larger than the configured ceiling.
    #[error("file size {size} exceeds limit {limit} bytes")]
    SizeLimitExceeded { size: u64, limit: u64 },
}
