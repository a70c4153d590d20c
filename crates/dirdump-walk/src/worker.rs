//! Per-file processing and the concurrent worker loop.

use std::fmt::Display;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use dirdump_core::{FileError, SkipReason};
use tracing::{debug, warn};

use crate::cancel::Cancellation;
use crate::progress::WalkCounters;
use crate::tracker::SkippedTracker;

/// How long a blocked producer or worker waits before re-checking for
/// cancellation.
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// A file that passed every traversal-time filter.
#[derive(Debug, Clone)]
pub(crate) struct FileJob {
    pub path: PathBuf,
    pub rel_path: String,
}

/// Mutable state shared by everything taking part in one walk.
#[derive(Debug)]
pub(crate) struct WalkState {
    pub tracker: SkippedTracker,
    pub counters: Arc<WalkCounters>,
}

impl WalkState {
    pub(crate) fn new() -> Self {
        Self {
            tracker: SkippedTracker::with_capacity(100),
            counters: Arc::new(WalkCounters::new()),
        }
    }

    /// Record a skip and bump the matching counter.
    pub(crate) fn skip(&self, path: impl Into<String>, reason: SkipReason, is_dir: bool) {
        self.tracker.track(path, reason, is_dir);
        self.counters.record_skip(is_dir);
    }
}

/// Stat, read and hand one file to the handler.
///
/// The handler sees every file that gets this far exactly once: with its
/// content, or with the error that stopped it from being read. Non-regular
/// files found by the size check are skipped without a handler call.
pub(crate) fn process_file<F, E>(job: &FileJob, state: &WalkState, size_limit: Option<u64>, handler: &F)
where
    F: Fn(&str, Result<Vec<u8>, FileError>) -> Result<(), E>,
    E: Display,
{
    let rel = job.rel_path.as_str();
    state.counters.set_current_path(rel);
    debug!("Reading {rel}");

    if let Some(limit) = size_limit {
        let metadata = match fs::symlink_metadata(&job.path) {
            Ok(m) => m,
            Err(source) => {
                warn!("Failed to get file info for {rel}: {source}");
                state.skip(rel, SkipReason::InfoError, false);
                deliver(handler, rel, Err(FileError::Stat { source }));
                return;
            }
        };

        if !metadata.file_type().is_file() {
            debug!("Skipping {rel}: not a regular file");
            state.skip(rel, SkipReason::NotRegular, false);
            return;
        }

        let size = metadata.len();
        if size > limit {
            debug!("Skipping {rel}: {size} bytes exceeds the {limit} byte limit");
            state.skip(rel, SkipReason::SizeLimit, false);
            deliver(handler, rel, Err(FileError::SizeLimitExceeded { size, limit }));
            return;
        }
    }

    match fs::read(&job.path) {
        Ok(content) => {
            debug!("Read {} bytes from {rel}", content.len());
            state.counters.record_processed();
            deliver(handler, rel, Ok(content));
        }
        Err(source) => {
            warn!("Failed to read {rel}: {source}");
            state.skip(rel, SkipReason::ReadError, false);
            deliver(handler, rel, Err(FileError::Read { source }));
        }
    }
}

fn deliver<F, E>(handler: &F, rel: &str, result: Result<Vec<u8>, FileError>)
where
    F: Fn(&str, Result<Vec<u8>, FileError>) -> Result<(), E>,
    E: Display,
{
    if let Err(e) = handler(rel, result) {
        warn!("Handler failed for {rel}: {e}");
    }
}

/// Drain `jobs` until the queue is closed or the walk is cancelled.
///
/// Cancellation is checked before every dequeue; a file already being read
/// is finished first.
pub(crate) fn run_worker<F, E>(
    id: usize,
    jobs: Receiver<FileJob>,
    state: &WalkState,
    size_limit: Option<u64>,
    handler: &F,
    cancel: &Cancellation,
) where
    F: Fn(&str, Result<Vec<u8>, FileError>) -> Result<(), E>,
    E: Display,
{
    debug!(worker = id, "Worker started");
    let mut handled = 0u64;

    loop {
        if cancel.is_cancelled() {
            debug!(worker = id, "Worker observed cancellation");
            break;
        }
        match jobs.recv_timeout(POLL_INTERVAL) {
            Ok(job) => {
                process_file(&job, state, size_limit, handler);
                handled += 1;
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    debug!(worker = id, files = handled, "Worker finished");
}
