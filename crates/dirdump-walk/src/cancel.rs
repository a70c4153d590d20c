//! Cooperative cancellation with an optional deadline.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use dirdump_core::WalkError;
use tokio_util::sync::CancellationToken;

/// Cancellation state shared by the traversal thread, the workers and the
/// progress reporter of one walk.
///
/// Wraps a child of the caller's token, so cancelling the caller's token
/// stops the walk while a deadline expiry only cancels this walk.
#[derive(Debug, Clone)]
pub(crate) struct Cancellation {
    token: CancellationToken,
    deadline: Option<(Instant, Duration)>,
    timed_out: Arc<AtomicBool>,
}

impl Cancellation {
    pub(crate) fn new(parent: &CancellationToken, timeout: Option<Duration>) -> Self {
        Self {
            token: parent.child_token(),
            deadline: timeout.map(|t| (Instant::now() + t, t)),
            timed_out: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Check the signal, tripping it first if the deadline has passed.
    pub(crate) fn is_cancelled(&self) -> bool {
        if self.token.is_cancelled() {
            return true;
        }
        if let Some((deadline, _)) = self.deadline {
            if Instant::now() >= deadline {
                self.timed_out.store(true, Ordering::Relaxed);
                self.token.cancel();
                return true;
            }
        }
        false
    }

    /// Check the signal without consulting the deadline. For observers that
    /// must not decide the outcome of the walk.
    pub(crate) fn is_signalled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The error the walk reports, or `None` if it was never cancelled.
    pub(crate) fn error(&self) -> Option<WalkError> {
        if self.timed_out.load(Ordering::Relaxed) {
            let timeout = self.deadline.map(|(_, t)| t).unwrap_or_default();
            Some(WalkError::DeadlineExceeded { timeout })
        } else if self.token.is_cancelled() {
            Some(WalkError::Cancelled)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_cancelled() {
        let parent = CancellationToken::new();
        let cancel = Cancellation::new(&parent, None);
        assert!(!cancel.is_cancelled());
        assert!(cancel.error().is_none());
    }

    #[test]
    fn test_parent_cancellation() {
        let parent = CancellationToken::new();
        let cancel = Cancellation::new(&parent, None);
        parent.cancel();
        assert!(cancel.is_cancelled());
        assert!(matches!(cancel.error(), Some(WalkError::Cancelled)));
    }

    #[test]
    fn test_deadline() {
        let parent = CancellationToken::new();
        let cancel = Cancellation::new(&parent, Some(Duration::ZERO));
        assert!(cancel.is_cancelled());
        assert!(matches!(
            cancel.error(),
            Some(WalkError::DeadlineExceeded { timeout }) if timeout == Duration::ZERO
        ));
        // The caller's token is left alone.
        assert!(!parent.is_cancelled());
    }

    #[test]
    fn test_signal_check_leaves_deadline_alone() {
        let parent = CancellationToken::new();
        let cancel = Cancellation::new(&parent, Some(Duration::ZERO));
        assert!(!cancel.is_signalled());
        assert!(cancel.error().is_none());

        parent.cancel();
        assert!(cancel.is_signalled());
        assert!(matches!(cancel.error(), Some(WalkError::Cancelled)));
    }
}
