//! Records of paths a walk did not deliver to its handler.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// Why a file or directory was not processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, Serialize, Deserialize)]
pub enum SkipReason {
    #[strum(to_string = "Ignored (Hidden Rule)")]
    #[serde(rename = "Ignored (Hidden Rule)")]
    IgnoredHidden,
    #[strum(to_string = "Ignored (Gitignore/Custom Rule)")]
    #[serde(rename = "Ignored (Gitignore/Custom Rule)")]
    IgnoredRule,
    #[strum(to_string = "Filtered (Extension Mismatch)")]
    #[serde(rename = "Filtered (Extension Mismatch)")]
    FilteredExtension,
    #[strum(to_string = "Skipped (Size Limit Exceeded)")]
    #[serde(rename = "Skipped (Size Limit Exceeded)")]
    SizeLimit,
    #[strum(to_string = "Skipped (Not a Regular File)")]
    #[serde(rename = "Skipped (Not a Regular File)")]
    NotRegular,
    #[strum(to_string = "Skipped (Permission Error)")]
    #[serde(rename = "Skipped (Permission Error)")]
    PermissionError,
    #[strum(to_string = "Skipped (Walk Error)")]
    #[serde(rename = "Skipped (Walk Error)")]
    WalkError,
    #[strum(to_string = "Skipped (Read Error)")]
    #[serde(rename = "Skipped (Read Error)")]
    ReadError,
    #[strum(to_string = "Skipped (File Info Error)")]
    #[serde(rename = "Skipped (File Info Error)")]
    InfoError,
    #[strum(to_string = "Skipped (Path Calculation Error)")]
    #[serde(rename = "Skipped (Path Calculation Error)")]
    PathError,
}

impl SkipReason {
    /// Reasons that come from an I/O fault rather than a filter decision.
    pub fn is_fault(self) -> bool {
        matches!(
            self,
            Self::PermissionError
                | Self::WalkError
                | Self::ReadError
                | Self::InfoError
                | Self::PathError
        )
    }
}

/// A single skip event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedItem {
    /// Path relative to the walk root (absolute when no relative form exists).
    pub path: String,
    /// Why it was skipped.
    pub reason: SkipReason,
    /// Whether the path is a directory.
    pub is_dir: bool,
}

impl SkippedItem {
    /// Create a new skipped item.
    pub fn new(path: impl Into<String>, reason: SkipReason, is_dir: bool) -> Self {
        Self {
            path: path.into(),
            reason,
            is_dir,
        }
    }
}
