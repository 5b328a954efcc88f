//! Watcher configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::rules::{Pattern, RuleSet};
use crate::WatchBackend;

/// Default latency: the debounce window for the notify backend and the poll
/// interval for the polling backend.
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(250);

/// Configuration for a [`Watcher`](crate::Watcher).
///
/// Built with `with_*` methods and validated at watcher construction, so
/// misconfiguration surfaces immediately rather than inside a diff.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Watched root directory.
    pub root: PathBuf,
    /// Adapter trigger cadence; never affects engine behavior.
    pub latency: Duration,
    /// Which adapter backend to bind.
    pub backend: WatchBackend,
    /// User ignore patterns, applied on top of the defaults.
    pub ignores: Vec<Pattern>,
    /// User filter patterns; empty means every file is accepted.
    pub filters: Vec<Pattern>,
    /// Whether to seed the rule set with the conservative default ignores.
    pub use_default_ignores: bool,
}

impl WatcherConfig {
    /// Create a configuration for the given root with default settings:
    /// notify backend, default latency, default ignores, no filters.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            latency: DEFAULT_LATENCY,
            backend: WatchBackend::Notify,
            ignores: Vec::new(),
            filters: Vec::new(),
            use_default_ignores: true,
        }
    }

    /// Set the adapter latency.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Select the adapter backend.
    pub fn with_backend(mut self, backend: WatchBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Append an ignore pattern.
    pub fn with_ignore(mut self, pattern: Pattern) -> Self {
        self.ignores.push(pattern);
        self
    }

    /// Append a filter pattern.
    pub fn with_filter(mut self, pattern: Pattern) -> Self {
        self.filters.push(pattern);
        self
    }

    /// Start from an empty ignore list instead of the defaults.
    pub fn without_default_ignores(mut self) -> Self {
        self.use_default_ignores = false;
        self
    }

    /// Check this configuration for problems.
    pub fn validate(&self) -> Result<()> {
        if !self.root.is_dir() {
            return Err(Error::InvalidPath(format!(
                "watched root '{}' is not an accessible directory",
                self.root.display()
            )));
        }
        if self.latency.is_zero() {
            return Err(Error::Config("latency must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Assemble the effective rule set for the engine.
    pub(crate) fn rule_set(&self) -> RuleSet {
        let mut rules = if self.use_default_ignores {
            RuleSet::with_default_ignores()
        } else {
            RuleSet::new()
        };
        for pattern in &self.ignores {
            rules.add_ignore(pattern.clone());
        }
        for pattern in &self.filters {
            rules.add_filter(pattern.clone());
        }
        rules
    }
}
