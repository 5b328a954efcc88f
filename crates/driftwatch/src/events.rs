//! Change reporting types and the consumer-facing handler trait.

use std::collections::HashSet;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The three-way result of one diff invocation.
///
/// Paths are relative to the watched root, in traversal order. A change set
/// is produced fresh by each diff call and never persisted across calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Files whose content changed since the last diff.
    pub modified: Vec<String>,
    /// Files that appeared since the last diff.
    pub added: Vec<String>,
    /// Files that disappeared since the last diff.
    pub removed: Vec<String>,
}

impl ChangeSet {
    /// Create an empty change set.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when all three lists are empty.
    pub fn is_empty(&self) -> bool {
        self.modified.is_empty() && self.added.is_empty() && self.removed.is_empty()
    }

    /// Total number of reported paths across all three lists.
    pub fn len(&self) -> usize {
        self.modified.len() + self.added.len() + self.removed.len()
    }
}

/// A notification from an adapter that one or more directories need a re-diff.
///
/// `recursive` means "treat every one of these directories as needing a deep
/// additions walk"; polling-style adapters use it because they cannot
/// pinpoint the exact changed subdirectory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirtySet {
    /// Absolute directories to re-diff.
    pub directories: HashSet<PathBuf>,
    /// Whether the top-level additions walk of each directory is recursive.
    pub recursive: bool,
}

impl DirtySet {
    /// Create a dirty set from any collection of directories.
    pub fn new(directories: impl IntoIterator<Item = PathBuf>, recursive: bool) -> Self {
        Self {
            directories: directories.into_iter().collect(),
            recursive,
        }
    }

    /// Create a dirty set for a single directory.
    pub fn single(directory: PathBuf, recursive: bool) -> Self {
        Self::new([directory], recursive)
    }
}

/// Consumer of non-empty change sets.
///
/// The watcher invokes the handler only when at least one of the three lists
/// is non-empty; handlers never see an empty change set.
#[async_trait]
pub trait ChangeHandler: Send + Sync {
    /// Handle one change set.
    async fn handle(&self, changes: ChangeSet) -> Result<()>;

    /// Get the handler name, used in log output.
    fn name(&self) -> &'static str {
        "change_handler"
    }
}

/// Adapter that lets a plain closure act as a [`ChangeHandler`].
pub struct FnHandler<F> {
    callback: F,
}

impl<F> FnHandler<F>
where
    F: Fn(ChangeSet) + Send + Sync,
{
    /// Wrap a closure as a change handler.
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

#[async_trait]
impl<F> ChangeHandler for FnHandler<F>
where
    F: Fn(ChangeSet) + Send + Sync,
{
    async fn handle(&self, changes: ChangeSet) -> Result<()> {
        (self.callback)(changes);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fn_handler"
    }
}
