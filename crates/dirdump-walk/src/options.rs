//! Runtime options for a walk.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use dirdump_core::{ProgressStats, WalkConfig};
use tokio_util::sync::CancellationToken;

/// Callback receiving periodic progress snapshots.
pub type ProgressCallback = Arc<dyn Fn(ProgressStats) + Send + Sync>;

/// Default interval between progress snapshots.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(300);

/// Everything a walk needs besides the root, matcher and handler.
#[derive(Clone)]
pub struct WalkOptions {
    /// Filters, worker count and deadline.
    pub config: WalkConfig,
    /// Cancelling this token stops the walk.
    pub cancel: CancellationToken,
    /// Receives snapshots while the walk runs. No reporter thread is started
    /// when this is `None`.
    pub progress: Option<ProgressCallback>,
    pub progress_interval: Duration,
}

impl WalkOptions {
    pub fn new(config: WalkConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
            progress: None,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    /// Use the given token for cancellation.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Report progress to `callback` every [`progress_interval`](Self::progress_interval).
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressStats) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(callback));
        self
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self::new(WalkConfig::default())
    }
}

impl fmt::Debug for WalkOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalkOptions")
            .field("config", &self.config)
            .field("cancel", &self.cancel)
            .field("progress", &self.progress.is_some())
            .field("progress_interval", &self.progress_interval)
            .finish()
    }
}
