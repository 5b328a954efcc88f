//! Content-hash store used to disambiguate same-second modifications.
//!
//! Modification times only have one-second resolution, so a file rewritten
//! within the same second as the last diff cannot be detected by mtime alone.
//! The [`ChecksumStore`] keeps the last observed BLAKE3 digest per file and is
//! consulted exactly in that ambiguous case. An absent entry means "no hash
//! computed yet", not "unmodified".

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::trace;

use crate::error::Result;

/// Maps file paths to their last observed BLAKE3 content digest.
#[derive(Debug, Default)]
pub struct ChecksumStore {
    digests: HashMap<PathBuf, [u8; 32]>,
}

impl ChecksumStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash the file at `path` and compare against the stored digest.
    ///
    /// Stores the new digest and returns `true` when it differs from the
    /// stored one or when no digest was stored yet; returns `false` when the
    /// content is unchanged. This is the single mutating operation and the
    /// only place a hash is computed.
    ///
    /// Read failures are propagated: a diff that cannot hash a file it needs
    /// to disambiguate must not be treated as consistent.
    pub fn has_changed(&mut self, path: &Path) -> Result<bool> {
        let bytes = fs::read(path)?;
        let digest = *blake3::hash(&bytes).as_bytes();
        trace!(
            path = %path.display(),
            digest = %hex::encode(digest),
            "computed content digest"
        );
        match self.digests.insert(path.to_path_buf(), digest) {
            Some(previous) => Ok(previous != digest),
            None => Ok(true),
        }
    }

    /// Remove any stored digest for `path`; called when the file is removed.
    pub fn forget(&mut self, path: &Path) {
        self.digests.remove(path);
    }

    /// Drop every stored digest.
    pub fn clear(&mut self) {
        self.digests.clear();
    }

    /// Number of files with a stored digest.
    pub fn len(&self) -> usize {
        self.digests.len()
    }

    /// True when no digest is stored.
    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn first_hash_counts_as_changed() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, "one").unwrap();

        let mut store = ChecksumStore::new();
        assert!(store.has_changed(&file).unwrap());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn unchanged_content_is_not_reported() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, "one").unwrap();

        let mut store = ChecksumStore::new();
        store.has_changed(&file).unwrap();
        assert!(!store.has_changed(&file).unwrap());
    }

    #[test]
    fn rewritten_content_is_reported_once() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, "one").unwrap();

        let mut store = ChecksumStore::new();
        store.has_changed(&file).unwrap();

        fs::write(&file, "two").unwrap();
        assert!(store.has_changed(&file).unwrap());
        // The stored digest was updated along with the positive answer.
        assert!(!store.has_changed(&file).unwrap());
    }

    #[test]
    fn missing_file_propagates_io_error() {
        let dir = TempDir::new().unwrap();
        let mut store = ChecksumStore::new();
        assert!(store.has_changed(&dir.path().join("gone.txt")).is_err());
    }

    #[test]
    fn forget_drops_the_stored_digest() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, "one").unwrap();

        let mut store = ChecksumStore::new();
        store.has_changed(&file).unwrap();
        store.forget(&file);
        assert!(store.is_empty());
        // With no stored digest the next comparison counts as changed again.
        assert!(store.has_changed(&file).unwrap());
    }
}
