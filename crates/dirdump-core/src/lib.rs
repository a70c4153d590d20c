//! Core types and configuration for dirdump.
//!
//! This crate holds the value types shared by the ignore matcher, the
//! walker and the command-line tool: configuration, skip records, progress
//! snapshots and errors.

mod config;
mod error;
mod skipped;
mod stats;

pub use config::{
    DEFAULT_VCS_DIR, FailurePolicy, IgnoreConfig, IgnoreConfigBuilder, WalkConfig,
    WalkConfigBuilder, normalize_extension,
};
pub use error::{FileError, WalkError};
pub use skipped::{SkipReason, SkippedItem};
pub use stats::ProgressStats;
