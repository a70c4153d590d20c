//! Directory walking engine for dirdump.
//!
//! [`walk`] enumerates a directory tree, asks an
//! [`IgnoreMatcher`](dirdump_ignore::IgnoreMatcher) about every entry,
//! applies the extension and size filters from
//! [`WalkConfig`](dirdump_core::WalkConfig) and hands the content of each
//! remaining file to a caller-supplied handler.
//!
//! # Overview
//!
//! - **Sequential mode** reads files on the traversal thread, in sorted
//!   depth-first order.
//! - **Concurrent mode** queues files on a bounded channel drained by a fixed
//!   pool of worker threads. Ignore decisions, and therefore subtree pruning,
//!   always happen on the traversal thread.
//! - **Cancellation** through a [`CancellationToken`](tokio_util::sync::CancellationToken)
//!   or a deadline; the walk stops at the next entry and returns whatever it
//!   has recorded.
//! - **Progress** snapshots are sent to an optional callback from a
//!   background thread.
//!
//! Non-fatal problems never stop a walk. They end up in
//! [`WalkOutcome::skipped`] with a [`SkipReason`](dirdump_core::SkipReason).

mod cancel;
mod options;
mod progress;
mod tracker;
mod walker;
mod worker;

pub use options::{DEFAULT_PROGRESS_INTERVAL, ProgressCallback, WalkOptions};
pub use progress::ProgressReporter;
pub use tracker::SkippedTracker;
pub use walker::{WalkOutcome, walk};

// Re-export core types for convenience
pub use dirdump_core::{
    FileError, ProgressStats, SkipReason, SkippedItem, WalkConfig, WalkConfigBuilder, WalkError,
};
pub use tokio_util::sync::CancellationToken;
