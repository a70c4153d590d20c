//! Walk counters and periodic progress reporting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{RecvTimeoutError, Sender};
use dirdump_core::ProgressStats;
use tracing::{debug, warn};

use crate::cancel::Cancellation;
use crate::options::ProgressCallback;

/// Shared counters for one walk.
#[derive(Debug)]
pub(crate) struct WalkCounters {
    total_files: AtomicU64,
    processed_files: AtomicU64,
    skipped_files: AtomicU64,
    total_dirs: AtomicU64,
    skipped_dirs: AtomicU64,
    current_path: Mutex<Option<String>>,
    start_time: Instant,
}

impl WalkCounters {
    pub(crate) fn new() -> Self {
        Self {
            total_files: AtomicU64::new(0),
            processed_files: AtomicU64::new(0),
            skipped_files: AtomicU64::new(0),
            total_dirs: AtomicU64::new(0),
            skipped_dirs: AtomicU64::new(0),
            current_path: Mutex::new(None),
            start_time: Instant::now(),
        }
    }

    pub(crate) fn record_entry(&self, is_dir: bool) {
        if is_dir {
            self.total_dirs.fetch_add(1, Ordering::Relaxed);
        } else {
            self.total_files.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_skip(&self, is_dir: bool) {
        if is_dir {
            self.skipped_dirs.fetch_add(1, Ordering::Relaxed);
        } else {
            self.skipped_files.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_processed(&self) {
        self.processed_files.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn set_current_path(&self, path: &str) {
        let mut current = self
            .current_path
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = Some(path.to_string());
    }

    pub(crate) fn snapshot(&self) -> ProgressStats {
        ProgressStats {
            total_files: self.total_files.load(Ordering::Relaxed),
            processed_files: self.processed_files.load(Ordering::Relaxed),
            skipped_files: self.skipped_files.load(Ordering::Relaxed),
            total_dirs: self.total_dirs.load(Ordering::Relaxed),
            skipped_dirs: self.skipped_dirs.load(Ordering::Relaxed),
            current_path: self
                .current_path
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .clone(),
            elapsed: self.start_time.elapsed(),
        }
    }
}

/// Background thread that hands counter snapshots to a callback at a fixed
/// interval.
///
/// Ticks are not queued: a slow callback just delays the next snapshot. The
/// thread exits on [`stop`](Self::stop), on drop, or at the first tick after
/// the walk is cancelled. An expired deadline is left for the walk itself to
/// notice, so a walk that finished in time never reports a timeout.
#[derive(Debug)]
pub struct ProgressReporter {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ProgressReporter {
    pub(crate) fn start(
        counters: Arc<WalkCounters>,
        callback: ProgressCallback,
        interval: Duration,
        cancel: Cancellation,
    ) -> Self {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);

        let spawned = std::thread::Builder::new()
            .name("dirdump-progress".to_string())
            .spawn(move || {
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            if cancel.is_signalled() {
                                debug!("Progress reporter observed cancellation");
                                break;
                            }
                            callback(counters.snapshot());
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            });

        match spawned {
            Ok(handle) => Self {
                stop_tx: Some(stop_tx),
                handle: Some(handle),
            },
            Err(e) => {
                warn!("Failed to start progress reporter: {e}");
                Self {
                    stop_tx: None,
                    handle: None,
                }
            }
        }
    }

    /// Whether the reporting thread is running.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the thread and wait for it to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Dropping the sender disconnects the receiver immediately.
        self.stop_tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Progress callback panicked");
            }
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.shutdown();
    }
}
