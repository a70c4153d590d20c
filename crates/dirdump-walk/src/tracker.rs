//! Skip log shared by the traversal thread and the workers.

use std::sync::Mutex;

use dirdump_core::{SkipReason, SkippedItem};

/// Append-only record of every skipped path.
///
/// Entries keep insertion order, which is only meaningful in sequential
/// mode; callers sort by path for display.
#[derive(Debug, Default)]
pub struct SkippedTracker {
    items: Mutex<Vec<SkippedItem>>,
}

impl SkippedTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Mutex::new(Vec::with_capacity(capacity)),
        }
    }

    /// Record one skip event.
    pub fn track(&self, path: impl Into<String>, reason: SkipReason, is_dir: bool) {
        let item = SkippedItem::new(path, reason, is_dir);
        self.items
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(item);
    }

    /// Copy of everything recorded so far.
    pub fn items(&self) -> Vec<SkippedItem> {
        self.items
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.items
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_items(self) -> Vec<SkippedItem> {
        self.items
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
