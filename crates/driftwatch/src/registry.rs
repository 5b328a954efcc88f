//! Snapshot registry: what the engine currently believes exists on disk.
//!
//! The registry is a flattened ownership map, not a tree of linked nodes:
//! every known directory keys a mapping from child base name to entry kind.
//! Subtree deletion is therefore an O(children) bulk removal with no
//! parent/child pointer bookkeeping. The registry is the sole source of truth
//! for "previously known" state and is mutated only by the diff engine from
//! within an in-progress scan or diff.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Kind of a tracked entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    /// A directory, tracked so removals of its contents can be reconciled.
    Directory,
    /// Anything that is not a directory.
    File,
}

/// Two-level mapping from directory path to its known children.
#[derive(Debug, Default)]
pub struct SnapshotRegistry {
    dirs: HashMap<PathBuf, HashMap<OsString, EntryKind>>,
}

impl SnapshotRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the entry for `path` under its parent.
    ///
    /// Recording a directory also ensures it keys its own (possibly empty)
    /// child mapping, so [`entries_of`](Self::entries_of) is meaningful for
    /// it immediately.
    pub fn record(&mut self, path: &Path, kind: EntryKind) {
        if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
            self.dirs
                .entry(parent.to_path_buf())
                .or_default()
                .insert(name.to_os_string(), kind);
        }
        if kind == EntryKind::Directory {
            self.dirs.entry(path.to_path_buf()).or_default();
        }
    }

    /// True if `path` is present as an entry under its parent.
    pub fn contains(&self, path: &Path) -> bool {
        match (path.parent(), path.file_name()) {
            (Some(parent), Some(name)) => self
                .dirs
                .get(parent)
                .is_some_and(|children| children.contains_key(name)),
            _ => false,
        }
    }

    /// Remove the entry for `path` from its parent's mapping.
    ///
    /// When `path` keys a child mapping of its own (it was a directory), that
    /// whole sub-mapping is dropped at once, disowning every descendant
    /// record. Descendants must be reconciled (reported removed) before this
    /// is called.
    pub fn forget(&mut self, path: &Path) {
        if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
            if let Some(children) = self.dirs.get_mut(parent) {
                children.remove(name);
            }
        }
        self.dirs.remove(path);
    }

    /// The known children of `directory` as `(name, kind)` pairs.
    ///
    /// Returns an owned snapshot so callers may mutate the registry while
    /// reconciling the listed entries.
    pub fn entries_of(&self, directory: &Path) -> Vec<(OsString, EntryKind)> {
        self.dirs
            .get(directory)
            .map(|children| {
                children
                    .iter()
                    .map(|(name, kind)| (name.clone(), *kind))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Drop every record.
    pub fn clear(&mut self) {
        self.dirs.clear();
    }

    /// Number of directories with a child mapping.
    pub fn tracked_directories(&self) -> usize {
        self.dirs.len()
    }

    /// True when nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }
}
