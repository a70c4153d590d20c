//! The ignore decision for a single path.

use std::path::{MAIN_SEPARATOR, Path, PathBuf};
use std::sync::Arc;

use dirdump_core::{FailurePolicy, IgnoreConfig};
use tracing::{debug, error};

use crate::error::MatcherError;
use crate::rules::RuleSet;

/// Which rule family excluded a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IgnoreReason {
    /// The path or one of its ancestors is a dotfile.
    Hidden,
    /// The path is, or lives under, the version-control directory.
    VersionControl,
    /// A `.gitignore` or custom pattern matched, or rule evaluation failed
    /// under [`FailurePolicy::FailClosed`].
    Rule,
}

/// Decides whether root-relative paths are excluded.
///
/// Cloning is cheap and clones share the same compiled rules, so one matcher
/// can be handed to every worker of a walk.
#[derive(Debug, Clone)]
pub struct IgnoreMatcher {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    root: PathBuf,
    ignore_hidden: bool,
    ignore_vcs: bool,
    vcs_dir: String,
    custom_patterns: Vec<String>,
    failure_policy: FailurePolicy,
    /// `None` when the matcher is disabled.
    rules: Option<RuleSet>,
}

impl IgnoreMatcher {
    /// Build a matcher for `config.root`.
    ///
    /// The root `.gitignore` and the custom patterns are compiled here. With
    /// `ignore_vcs` set, `/{vcs_dir}/` is appended to the custom patterns.
    pub fn new(config: &IgnoreConfig) -> Result<Self, MatcherError> {
        let root = std::path::absolute(&config.root).map_err(|source| MatcherError::InvalidRoot {
            path: config.root.clone(),
            source,
        })?;

        let mut custom_patterns = config.custom_patterns.clone();
        if config.ignore_vcs {
            custom_patterns.push(format!("/{}/", config.vcs_dir));
        }

        let rules = if config.disabled {
            None
        } else {
            Some(RuleSet::new(&root, config.recursive, &custom_patterns)?)
        };

        debug!(
            root = %root.display(),
            patterns = custom_patterns.len(),
            disabled = config.disabled,
            "Ignore matcher ready"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                root,
                ignore_hidden: config.ignore_hidden,
                ignore_vcs: config.ignore_vcs,
                vcs_dir: config.vcs_dir.clone(),
                custom_patterns,
                failure_policy: config.failure_policy,
                rules,
            }),
        })
    }

    /// A matcher that never ignores anything.
    pub fn disabled(root: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(Inner {
                root: root.into(),
                ignore_hidden: false,
                ignore_vcs: false,
                vcs_dir: String::new(),
                custom_patterns: Vec::new(),
                failure_policy: FailurePolicy::FailOpen,
                rules: None,
            }),
        }
    }

    /// Absolute root the relative paths are resolved against.
    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    pub fn is_disabled(&self) -> bool {
        self.inner.rules.is_none()
    }

    /// Custom patterns in effect, including the implicit VCS pattern.
    pub fn custom_patterns(&self) -> &[String] {
        &self.inner.custom_patterns
    }

    /// Whether `rel_path` must be excluded.
    pub fn should_ignore(&self, rel_path: &str, is_dir: bool) -> bool {
        self.classify(rel_path, is_dir).is_some()
    }

    /// Why `rel_path` is excluded, or `None` when it is included.
    ///
    /// Evaluation failures are logged and answered with the configured
    /// [`FailurePolicy`].
    pub fn classify(&self, rel_path: &str, is_dir: bool) -> Option<IgnoreReason> {
        match self.try_classify(rel_path, is_dir) {
            Ok(reason) => reason,
            Err(e) => {
                let ignore = self.inner.failure_policy.fallback();
                error!(
                    path = rel_path,
                    policy = ?self.inner.failure_policy,
                    "Ignore rule evaluation failed: {e}"
                );
                ignore.then_some(IgnoreReason::Rule)
            }
        }
    }

    /// Fallible form of [`classify`](Self::classify).
    pub fn try_classify(
        &self,
        rel_path: &str,
        is_dir: bool,
    ) -> Result<Option<IgnoreReason>, MatcherError> {
        let Some(rules) = &self.inner.rules else {
            return Ok(None);
        };

        let normalized = normalize(rel_path)?;
        if normalized.is_empty() {
            return Ok(None);
        }
        let parts: Vec<&str> = normalized.split('/').collect();

        if self.inner.ignore_hidden && parts.iter().any(|part| part.starts_with('.')) {
            return Ok(Some(IgnoreReason::Hidden));
        }

        if self.inner.ignore_vcs {
            let last = parts.len() - 1;
            let under_vcs = parts
                .iter()
                .enumerate()
                .any(|(i, part)| *part == self.inner.vcs_dir && (is_dir || i < last));
            if under_vcs {
                return Ok(Some(IgnoreReason::VersionControl));
            }
        }

        let verdict = rules.evaluate(&parts, is_dir)?;
        Ok(verdict.is_ignore().then_some(IgnoreReason::Rule))
    }
}

/// Turn a root-relative path into `a/b/c` form.
///
/// Separators become `/`, empty and `.` components are dropped and the root
/// itself becomes the empty string. Absolute paths and `..` are rejected.
fn normalize(rel_path: &str) -> Result<String, MatcherError> {
    let outside = || MatcherError::PathOutsideRoot {
        path: rel_path.to_string(),
    };

    if Path::new(rel_path).has_root() || Path::new(rel_path).is_absolute() {
        return Err(outside());
    }

    let unified = if MAIN_SEPARATOR == '/' {
        rel_path.to_string()
    } else {
        rel_path.replace(MAIN_SEPARATOR, "/")
    };

    let mut parts = Vec::new();
    for part in unified.split('/') {
        match part {
            "" | "." => continue,
            ".." => return Err(outside()),
            other => parts.push(other),
        }
    }
    Ok(parts.join("/"))
}
