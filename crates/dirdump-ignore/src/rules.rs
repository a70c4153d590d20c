//! Repository-style rule layers.
//!
//! Every directory may carry a `.gitignore` whose patterns are relative to
//! that directory. A path is checked against the scope of each ancestor
//! directory from the root down; the deepest scope with an opinion wins and,
//! inside one scope, the last matching line wins. Custom patterns form a
//! final root-scoped layer that overrides the repository files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use ignore::Match;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use tracing::{debug, warn};

use crate::error::MatcherError;

/// File name of a per-directory ignore file.
pub const IGNORE_FILE_NAME: &str = ".gitignore";

/// Outcome of consulting the rule layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleMatch {
    /// No pattern mentions the path.
    None,
    /// The path is excluded.
    Ignore,
    /// A negation pattern re-included the path.
    Whitelist,
}

impl RuleMatch {
    /// Whether the path ends up excluded.
    pub fn is_ignore(self) -> bool {
        matches!(self, Self::Ignore)
    }
}

impl<T> From<Match<T>> for RuleMatch {
    fn from(m: Match<T>) -> Self {
        match m {
            Match::None => Self::None,
            Match::Ignore(_) => Self::Ignore,
            Match::Whitelist(_) => Self::Whitelist,
        }
    }
}

/// Scoped gitignore rules for one root.
#[derive(Debug)]
pub(crate) struct RuleSet {
    root: PathBuf,
    recursive: bool,
    custom: Gitignore,
    /// Compiled ignore file per directory (relative, `/`-separated, `""` for
    /// the root). `None` records that the directory has no ignore file.
    scopes: DashMap<String, Option<Arc<Gitignore>>>,
}

impl RuleSet {
    /// Compile the custom patterns and the root ignore file.
    pub(crate) fn new(
        root: &Path,
        recursive: bool,
        custom_patterns: &[String],
    ) -> Result<Self, MatcherError> {
        let mut builder = GitignoreBuilder::new(root);
        for pattern in custom_patterns {
            let pattern = pattern.trim();
            if pattern.is_empty() {
                continue;
            }
            builder
                .add_line(None, pattern)
                .map_err(|source| MatcherError::InvalidPattern {
                    pattern: pattern.to_string(),
                    source,
                })?;
        }
        let custom = builder.build().map_err(|e| MatcherError::RuleLoad {
            path: root.to_path_buf(),
            message: e.to_string(),
        })?;

        let rules = Self {
            root: root.to_path_buf(),
            recursive,
            custom,
            scopes: DashMap::new(),
        };
        let root_scope = rules.load_scope("")?;
        rules.scopes.insert(String::new(), root_scope);
        Ok(rules)
    }

    /// Evaluate a normalized relative path against every applicable layer.
    pub(crate) fn evaluate(&self, components: &[&str], is_dir: bool) -> Result<RuleMatch, MatcherError> {
        let mut verdict = RuleMatch::None;

        // Scopes are the directories strictly above the entry.
        let deepest = if self.recursive {
            components.len().saturating_sub(1)
        } else {
            0
        };

        for depth in 0..=deepest {
            let dir = components[..depth].join("/");
            let Some(scope) = self.scope(&dir)? else {
                continue;
            };
            let local = components[depth..].join("/");
            let m = RuleMatch::from(scope.matched_path_or_any_parents(Path::new(&local), is_dir));
            if m != RuleMatch::None {
                verdict = m;
            }
        }

        let full = components.join("/");
        let m = RuleMatch::from(self.custom.matched_path_or_any_parents(Path::new(&full), is_dir));
        if m != RuleMatch::None {
            verdict = m;
        }

        Ok(verdict)
    }

    /// Number of custom and implicit patterns compiled into the root layer.
    #[cfg(test)]
    pub(crate) fn custom_len(&self) -> usize {
        self.custom.len()
    }

    fn scope(&self, dir: &str) -> Result<Option<Arc<Gitignore>>, MatcherError> {
        if let Some(cached) = self.scopes.get(dir) {
            return Ok(cached.value().clone());
        }
        let loaded = self.load_scope(dir)?;
        self.scopes.insert(dir.to_string(), loaded.clone());
        Ok(loaded)
    }

    fn load_scope(&self, dir: &str) -> Result<Option<Arc<Gitignore>>, MatcherError> {
        let dir_path = if dir.is_empty() {
            self.root.clone()
        } else {
            self.root.join(dir)
        };
        let file = dir_path.join(IGNORE_FILE_NAME);
        if !file.is_file() {
            return Ok(None);
        }

        let mut builder = GitignoreBuilder::new(&dir_path);
        if let Some(err) = builder.add(&file) {
            warn!("Problem reading {}: {}", file.display(), err);
        }
        let gitignore = builder.build().map_err(|e| MatcherError::RuleLoad {
            path: file.clone(),
            message: e.to_string(),
        })?;
        debug!(
            "Loaded {} rule(s) from {}",
            gitignore.num_ignores() + gitignore.num_whitelists(),
            file.display()
        );
        Ok(Some(Arc::new(gitignore)))
    }
}
