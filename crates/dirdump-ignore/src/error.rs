//! Matcher errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building or consulting an [`IgnoreMatcher`](crate::IgnoreMatcher).
#[derive(Debug, Error)]
pub enum MatcherError {
    /// The root directory could not be made absolute.
    #[error("failed to get absolute path for root {path}: {source}")]
    InvalidRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A custom pattern is not valid gitignore syntax.
    #[error("invalid ignore pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: ignore::Error,
    },

    /// The candidate path escapes the matcher root.
    #[error("path {path:?} is not inside the matcher root")]
    PathOutsideRoot { path: String },

    /// An ignore file could not be compiled.
    #[error("failed to load ignore rules from {path}: {message}")]
    RuleLoad { path: PathBuf, message: String },
}
