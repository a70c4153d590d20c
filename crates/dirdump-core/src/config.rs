//! Matcher and walk configuration types.

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Name of the version-control metadata directory excluded by default.
pub const DEFAULT_VCS_DIR: &str = ".git";

/// What the matcher answers when its rule engine cannot evaluate a path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Treat the path as not ignored and keep going.
    #[default]
    FailOpen,
    /// Treat the path as ignored.
    FailClosed,
}

impl FailurePolicy {
    /// The ignore decision this policy substitutes for a failed evaluation.
    pub fn fallback(self) -> bool {
        matches!(self, Self::FailClosed)
    }
}

/// Configuration for the ignore matcher.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct IgnoreConfig {
    /// Directory the relative paths are resolved against.
    pub root: PathBuf,

    /// Exclude entries whose name, or any ancestor's name, starts with `.`.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub ignore_hidden: bool,

    /// Exclude the version-control directory and everything below it.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub ignore_vcs: bool,

    /// Name of the version-control directory.
    #[builder(default = "default_vcs_dir()")]
    #[serde(default = "default_vcs_dir")]
    pub vcs_dir: String,

    /// Honour `.gitignore` files in subdirectories, not just the root one.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub recursive: bool,

    /// Extra patterns in gitignore syntax, scoped to the root.
    #[builder(default)]
    #[serde(default)]
    pub custom_patterns: Vec<String>,

    /// Never ignore anything.
    #[builder(default = "false")]
    #[serde(default)]
    pub disabled: bool,

    /// Decision used when a rule lookup fails for a path.
    #[builder(default)]
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

fn default_true() -> bool {
    true
}

fn default_vcs_dir() -> String {
    DEFAULT_VCS_DIR.to_string()
}

impl IgnoreConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.root {
            Some(ref root) if root.as_os_str().is_empty() => {
                return Err("Root path cannot be empty".to_string());
            }
            None => return Err("Root path is required".to_string()),
            _ => {}
        }
        if let Some(ref vcs_dir) = self.vcs_dir {
            if vcs_dir.is_empty() || vcs_dir.contains(['/', '\\']) {
                return Err(format!("VCS directory must be a single path segment, got {vcs_dir:?}"));
            }
        }
        Ok(())
    }
}

impl IgnoreConfig {
    /// Create a new ignore config builder.
    pub fn builder() -> IgnoreConfigBuilder {
        IgnoreConfigBuilder::default()
    }

    /// Default policy for a root: hidden and VCS entries excluded, nested
    /// ignore files honoured.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ignore_hidden: true,
            ignore_vcs: true,
            vcs_dir: default_vcs_dir(),
            recursive: true,
            custom_patterns: Vec::new(),
            disabled: false,
            failure_policy: FailurePolicy::FailOpen,
        }
    }
}

impl Default for IgnoreConfig {
    fn default() -> Self {
        Self::new(".")
    }
}

/// Configuration for a single walk.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into))]
pub struct WalkConfig {
    /// Read files on a worker pool instead of the traversal thread.
    #[builder(default = "false")]
    #[serde(default)]
    pub concurrent: bool,

    /// Worker count for concurrent mode (0 = available parallelism).
    #[builder(default = "0")]
    #[serde(default)]
    pub workers: usize,

    /// Largest file to read, in bytes (0 = unlimited).
    #[builder(default = "0")]
    #[serde(default)]
    pub max_file_size: u64,

    /// Allowed file extensions without the leading dot (empty = all).
    #[builder(default)]
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Abort the walk once this much time has passed.
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub timeout: Option<Duration>,
}

impl WalkConfig {
    /// Create a new walk config builder.
    pub fn builder() -> WalkConfigBuilder {
        WalkConfigBuilder::default()
    }

    /// Sequential walk with no filters.
    pub fn new() -> Self {
        Self {
            concurrent: false,
            workers: 0,
            max_file_size: 0,
            extensions: Vec::new(),
            timeout: None,
        }
    }

    /// Number of workers to start, never less than one.
    pub fn effective_workers(&self) -> usize {
        match self.workers {
            0 => std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            n => n,
        }
    }

    /// Normalized extension allow-set. Empty means every extension passes.
    pub fn extension_set(&self) -> HashSet<String> {
        self.extensions
            .iter()
            .filter_map(|ext| normalize_extension(ext))
            .collect()
    }

    /// Size ceiling, if one is configured.
    pub fn size_limit(&self) -> Option<u64> {
        (self.max_file_size > 0).then_some(self.max_file_size)
    }
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Trim, strip a leading dot and lowercase an extension. Blank input yields `None`.
pub fn normalize_extension(ext: &str) -> Option<String> {
    let ext = ext.trim();
    let ext = ext.strip_prefix('.').unwrap_or(ext).trim();
    (!ext.is_empty()).then(|| ext.to_lowercase())
}
