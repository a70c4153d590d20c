//! Repository-style ignore matching for dirdump.
//!
//! An [`IgnoreMatcher`] answers, for any path relative to its root, whether
//! the path must be excluded from a walk. Checks run in this order:
//!
//! 1. a disabled matcher never ignores anything;
//! 2. hidden entries (any component starting with `.`);
//! 3. the version-control directory and everything under it;
//! 4. `.gitignore` files from the root down to the entry's directory (the
//!    deepest one with a matching line wins), then the custom patterns on top.
//!
//! # Example
//!
//! ```no_run
//! use dirdump_core::IgnoreConfig;
//! use dirdump_ignore::IgnoreMatcher;
//!
//! let matcher = IgnoreMatcher::new(&IgnoreConfig::new("/path/to/project"))?;
//! assert!(matcher.should_ignore(".cache/file.txt", false));
//! # Ok::<(), dirdump_ignore::MatcherError>(())
//! ```

mod error;
mod matcher;
mod rules;

pub use error::MatcherError;
pub use matcher::{IgnoreMatcher, IgnoreReason};
pub use rules::{IGNORE_FILE_NAME, RuleMatch};
