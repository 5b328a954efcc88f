//! The stateful diff engine.
//!
//! The engine compares a persisted snapshot of the watched tree against the
//! live filesystem. A full scan ([`DiffEngine::rebuild`]) establishes the
//! baseline; subsequent incremental diffs ([`DiffEngine::diff`]) walk only
//! the directories reported dirty and reconcile the snapshot registry and
//! checksum store in place, producing a three-way [`ChangeSet`].
//!
//! Modification detection is mtime-based with one-second granularity: a file
//! whose mtime is strictly newer than the last diff timestamp is modified,
//! and a file whose mtime exactly equals it falls back to a content-hash
//! comparison. Successive modifications within the same second are therefore
//! only detected via hashing; this is a documented granularity limit.
//!
//! The engine is not internally parallel and must not be invoked
//! concurrently: one diff's registry mutations must complete before the next
//! diff begins. The watcher facade enforces this by serializing all calls.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info, trace};

use crate::checksum::ChecksumStore;
use crate::error::Result;
use crate::events::ChangeSet;
use crate::registry::{EntryKind, SnapshotRegistry};
use crate::rules::RuleSet;

/// Incremental change detector over a watched root.
#[derive(Debug)]
pub struct DiffEngine {
    /// Watched root; all reported paths are relative to it.
    root: PathBuf,
    /// Ignore and filter predicates.
    rules: RuleSet,
    /// What the engine currently believes exists.
    registry: SnapshotRegistry,
    /// Content digests for same-second disambiguation.
    checksums: ChecksumStore,
    /// Second-granularity time of the last completed scan or diff.
    last_diff: u64,
}

impl DiffEngine {
    /// Create an engine for `root` with the given rules. No filesystem work
    /// happens until [`rebuild`](Self::rebuild) is called.
    pub fn new(root: PathBuf, rules: RuleSet) -> Self {
        Self {
            root,
            rules,
            registry: SnapshotRegistry::new(),
            checksums: ChecksumStore::new(),
            last_diff: 0,
        }
    }

    /// The watched root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The snapshot registry, for inspection.
    pub fn registry(&self) -> &SnapshotRegistry {
        &self.registry
    }

    /// Full scan: walk the watched root recursively and record everything
    /// that is not ignored (and, for files, passes the filter).
    ///
    /// Replaces all previous state and sets the diff timestamp on
    /// completion. This is the only operation allowed to run before the
    /// watcher is considered ready.
    pub fn rebuild(&mut self) -> Result<()> {
        debug!(root = %self.root.display(), "rebuilding snapshot");
        self.registry.clear();
        self.checksums.clear();

        let root = self.root.clone();
        self.scan_directory(&root)?;
        self.bump_timestamp();

        info!(
            root = %self.root.display(),
            directories = self.registry.tracked_directories(),
            "snapshot rebuilt"
        );
        Ok(())
    }

    /// Incremental diff over a set of dirty directories.
    ///
    /// Directories are processed deepest first (path length descending) so a
    /// subtree's removals are discovered and its registry entries pruned
    /// before an ancestor pass runs; the ancestor then sees already-cleaned
    /// child state and never repeats the work. `recursive` controls whether
    /// the top-level pass descends into still-existing known subdirectories;
    /// nested reconciliation of vanished subtrees is always recursive.
    ///
    /// The diff timestamp is updated exactly once, after every input
    /// directory has been processed. On error the timestamp is left
    /// untouched.
    pub fn diff(&mut self, directories: &[PathBuf], recursive: bool) -> Result<ChangeSet> {
        let mut changes = ChangeSet::new();

        let mut ordered: Vec<&PathBuf> = directories.iter().collect();
        ordered.sort_by(|a, b| b.as_os_str().len().cmp(&a.as_os_str().len()));

        for directory in ordered {
            trace!(directory = %directory.display(), recursive, "diffing directory");
            self.detect_modifications_and_removals(directory, recursive, &mut changes)?;
            self.detect_additions(directory, recursive, &mut changes)?;
        }

        self.bump_timestamp();
        debug!(
            modified = changes.modified.len(),
            added = changes.added.len(),
            removed = changes.removed.len(),
            "diff completed"
        );
        Ok(changes)
    }

    /// First pass: walk the registry's knowledge of `directory`'s children
    /// (never the live listing) and reconcile modifications and removals.
    fn detect_modifications_and_removals(
        &mut self,
        directory: &Path,
        recursive: bool,
        changes: &mut ChangeSet,
    ) -> Result<()> {
        for (name, kind) in self.registry.entries_of(directory) {
            let path = directory.join(&name);
            match kind {
                EntryKind::Directory => {
                    if path.is_dir() {
                        if recursive {
                            self.detect_modifications_and_removals(&path, true, changes)?;
                        }
                    } else {
                        // The path changed type or vanished: reconcile every
                        // previously known descendant first so still-tracked
                        // files under it are reported removed, then disown
                        // the whole subtree in one go.
                        self.detect_modifications_and_removals(&path, true, changes)?;
                        self.registry.forget(&path);
                    }
                }
                EntryKind::File => match fs::metadata(&path) {
                    Ok(metadata) => {
                        let mtime = mtime_secs(&metadata);
                        if mtime > self.last_diff {
                            changes.modified.push(self.relative(&path));
                        } else if mtime == self.last_diff
                            && metadata.is_file()
                            && self.checksums.has_changed(&path)?
                        {
                            // The mtime signal is ambiguous within the
                            // timestamp resolution window; only a true hash
                            // change counts.
                            changes.modified.push(self.relative(&path));
                        }
                    }
                    // NotADirectory: a former ancestor directory is now a
                    // plain file and the stat went through it; the tracked
                    // file is just as gone as with NotFound.
                    Err(err)
                        if err.kind() == ErrorKind::NotFound
                            || err.kind() == ErrorKind::NotADirectory =>
                    {
                        self.registry.forget(&path);
                        self.checksums.forget(&path);
                        changes.removed.push(self.relative(&path));
                    }
                    Err(err) => return Err(err.into()),
                },
            }
        }
        Ok(())
    }

    /// Second pass: a fresh recursive walk of `directory` against the live
    /// filesystem, reporting and recording unknown entries.
    fn detect_additions(
        &mut self,
        directory: &Path,
        recursive: bool,
        changes: &mut ChangeSet,
    ) -> Result<()> {
        for (path, is_dir, is_file) in list_directory(directory)? {
            if is_dir {
                if self.rules.is_ignored(&path) {
                    continue;
                }
                // In non-recursive mode a directory the registry already
                // knows needs no re-walk; the caller did not flag its
                // contents as dirty.
                if !recursive && self.registry.contains(&path) {
                    continue;
                }
                self.registry.record(&path, EntryKind::Directory);
                self.detect_additions(&path, recursive, changes)?;
            } else {
                if self.registry.contains(&path)
                    || self.rules.is_ignored(&path)
                    || !self.rules.is_accepted(&path)
                {
                    continue;
                }
                // Only regular files are reported; devices, sockets and the
                // like are still recorded so their later removal is tracked.
                if is_file {
                    changes.added.push(self.relative(&path));
                }
                self.registry.record(&path, EntryKind::File);
            }
        }
        Ok(())
    }

    /// Record everything under `dir` that passes the rules. Ignored
    /// directories are pruned together with their subtrees.
    fn scan_directory(&mut self, dir: &Path) -> Result<()> {
        for (path, is_dir, _) in list_directory(dir)? {
            if is_dir {
                if self.rules.is_ignored(&path) {
                    continue;
                }
                self.registry.record(&path, EntryKind::Directory);
                self.scan_directory(&path)?;
            } else if !self.rules.is_ignored(&path) && self.rules.is_accepted(&path) {
                self.registry.record(&path, EntryKind::File);
            }
        }
        Ok(())
    }

    /// Advance the diff timestamp to now, never moving it backwards.
    fn bump_timestamp(&mut self) {
        self.last_diff = self.last_diff.max(now_secs());
    }

    /// Render `path` relative to the watched root.
    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned()
    }

    #[cfg(test)]
    fn set_last_diff(&mut self, secs: u64) {
        self.last_diff = secs;
    }

    #[cfg(test)]
    fn rewind_last_diff(&mut self, secs: u64) {
        self.last_diff = self.last_diff.saturating_sub(secs);
    }
}

/// List `dir` in stable name order as `(path, is_dir, is_file)` triples.
///
/// A directory that vanished before it could be listed, or an entry that
/// vanished before it could be stat'd, is treated as not present rather than
/// surfaced as an error; a later diff reports its removal if it was tracked.
fn list_directory(dir: &Path) -> Result<Vec<(PathBuf, bool, bool)>> {
    let reader = match fs::read_dir(dir) {
        Ok(reader) => reader,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) if err.kind() == ErrorKind::NotADirectory => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };

    let mut entries = Vec::new();
    for entry in reader {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.kind() == ErrorKind::NotFound => continue,
            Err(err) => return Err(err.into()),
        };
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(err) if err.kind() == ErrorKind::NotFound => continue,
            Err(err) => return Err(err.into()),
        };
        entries.push((entry.path(), file_type.is_dir(), file_type.is_file()));
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}

/// Current time in whole seconds since the UNIX epoch.
fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

/// Modification time of `metadata` in whole seconds since the UNIX epoch.
fn mtime_secs(metadata: &fs::Metadata) -> u64 {
    metadata
        .modified()
        .ok()
        .and_then(|mtime| mtime.duration_since(UNIX_EPOCH).ok())
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}
