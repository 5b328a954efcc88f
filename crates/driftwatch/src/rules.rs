//! Ignore and filter rule evaluation.
//!
//! A [`RuleSet`] holds two ordered pattern lists: ignore patterns, matched
//! against the end of a path, and filter patterns, matched anywhere within a
//! path. Ignores apply to directories and files alike; a matched directory is
//! pruned from traversal together with its whole subtree. Filters apply only
//! to files, because directories must be traversed to reach files inside them
//! regardless of any filter.

use std::path::Path;

use globset::{Glob, GlobMatcher};
use regex::Regex;
use tracing::trace;

use crate::error::Result;

/// Default ignore patterns seeded into every [`RuleSet`]: version-control
/// directories, OS metadata files, and build/log/temp/vendor directories.
pub const DEFAULT_IGNORES: &[&str] = &[
    "/.git",
    "/.svn",
    "/.hg",
    "/.bzr",
    "/CVS",
    "/.bundle",
    "/node_modules",
    "/target",
    "/log",
    "/tmp",
    "/vendor/bundle",
    "/.DS_Store",
    "/Thumbs.db",
    "/Desktop.ini",
];

/// A single path predicate.
///
/// Patterns are pluggable: callers may supply literal suffixes, substrings,
/// globs, or full regular expressions interchangeably. Each variant defines
/// its own matching semantics against the textual form of a path.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Matches when the path ends with the given literal text.
    Suffix(String),
    /// Matches when the path contains the given literal text anywhere.
    Substring(String),
    /// Matches the path against a compiled glob.
    Glob(GlobMatcher),
    /// Matches the path against a compiled regular expression.
    Regex(Regex),
}

impl Pattern {
    /// Create a literal suffix pattern.
    pub fn suffix(text: impl Into<String>) -> Self {
        Self::Suffix(text.into())
    }

    /// Create a literal substring pattern.
    pub fn substring(text: impl Into<String>) -> Self {
        Self::Substring(text.into())
    }

    /// Compile a glob pattern. Fails at construction, never during a diff.
    pub fn glob(pattern: &str) -> Result<Self> {
        Ok(Self::Glob(Glob::new(pattern)?.compile_matcher()))
    }

    /// Compile a regular expression pattern. Fails at construction, never
    /// during a diff.
    pub fn regex(pattern: &str) -> Result<Self> {
        Ok(Self::Regex(Regex::new(pattern)?))
    }

    /// Evaluate this pattern against a path rendered as text.
    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Suffix(text) => path.ends_with(text.as_str()),
            Self::Substring(text) => path.contains(text.as_str()),
            Self::Glob(matcher) => matcher.is_match(path),
            Self::Regex(regex) => regex.is_match(path),
        }
    }
}

/// Ordered ignore and filter predicates, evaluated per path.
///
/// Stateless: evaluation has no side effects.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    ignores: Vec<Pattern>,
    filters: Vec<Pattern>,
}

impl RuleSet {
    /// Create an empty rule set: nothing ignored, every file accepted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a rule set seeded with [`DEFAULT_IGNORES`].
    pub fn with_default_ignores() -> Self {
        Self {
            ignores: DEFAULT_IGNORES.iter().copied().map(Pattern::suffix).collect(),
            filters: Vec::new(),
        }
    }

    /// Append an ignore pattern.
    pub fn add_ignore(&mut self, pattern: Pattern) {
        self.ignores.push(pattern);
    }

    /// Append a filter pattern.
    pub fn add_filter(&mut self, pattern: Pattern) {
        self.filters.push(pattern);
    }

    /// True if any ignore pattern matches `path`.
    ///
    /// Applies to both directories and files; callers prune matched
    /// directories from traversal entirely.
    pub fn is_ignored(&self, path: &Path) -> bool {
        let text = path.to_string_lossy();
        let ignored = self.ignores.iter().any(|pattern| pattern.matches(&text));
        if ignored {
            trace!(path = %path.display(), "path ignored");
        }
        ignored
    }

    /// True if the filter list is empty or any filter pattern matches `path`.
    ///
    /// Applies only to files; directories are never filter-tested.
    pub fn is_accepted(&self, path: &Path) -> bool {
        if self.filters.is_empty() {
            return true;
        }
        let text = path.to_string_lossy();
        self.filters.iter().any(|pattern| pattern.matches(&text))
    }
}
