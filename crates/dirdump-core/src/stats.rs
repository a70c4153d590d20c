//! Walk progress snapshots.

use std::time::Duration;

use serde::Serialize;

/// Counters observed at one moment of a walk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProgressStats {
    /// Files seen by the traversal.
    pub total_files: u64,
    /// Files whose content reached the handler.
    pub processed_files: u64,
    /// Files skipped for any reason.
    pub skipped_files: u64,
    /// Directories seen by the traversal (the root excluded).
    pub total_dirs: u64,
    /// Directories pruned or unreadable.
    pub skipped_dirs: u64,
    /// Last path picked up for reading. In concurrent mode this is whichever
    /// worker dequeued most recently.
    pub current_path: Option<String>,
    /// Time since the walk started.
    pub elapsed: Duration,
}

impl ProgressStats {
    /// Files neither processed nor skipped yet.
    pub fn pending_files(&self) -> u64 {
        self.total_files
            .saturating_sub(self.processed_files + self.skipped_files)
    }

    /// Processing rate in files per second.
    pub fn files_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.processed_files as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}
