//! Notify-based native watch adapter with debouncing support.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{new_debouncer, DebounceEventResult, DebouncedEvent, Debouncer, RecommendedCache};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::backends::Adapter;
use crate::config::DEFAULT_LATENCY;
use crate::error::{Error, Result};
use crate::events::DirtySet;
use crate::WatchBackend;

/// Adapter backed by OS-native file system notifications (via `notify`),
/// debounced over the configured latency window.
///
/// Native events pinpoint the affected paths, so this adapter reports the
/// parent directory of every event path (plus the path itself when it is a
/// directory) with `recursive: false`; each affected directory produces its
/// own notification, so nested changes are never under-reported.
pub struct NotifyAdapter {
    root: PathBuf,
    latency: Duration,
    sender: Option<mpsc::UnboundedSender<DirtySet>>,
    debouncer: Option<Debouncer<RecommendedWatcher, RecommendedCache>>,
}

impl NotifyAdapter {
    /// Create an adapter for the given root.
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            latency: DEFAULT_LATENCY,
            sender: None,
            debouncer: None,
        }
    }

    /// Collect the directories a batch of debounced events dirties.
    fn dirty_directories(root: &Path, events: &[DebouncedEvent]) -> HashSet<PathBuf> {
        let mut directories = HashSet::new();
        for event in events {
            for path in &event.event.paths {
                if !path.starts_with(root) {
                    continue;
                }
                if *path == *root {
                    directories.insert(root.to_path_buf());
                    continue;
                }
                if let Some(parent) = path.parent() {
                    directories.insert(parent.to_path_buf());
                }
                // A directory event also dirties the directory itself so its
                // fresh contents get walked.
                if path.is_dir() {
                    directories.insert(path.clone());
                }
            }
        }
        directories
    }
}

#[async_trait]
impl Adapter for NotifyAdapter {
    fn backend_type(&self) -> WatchBackend {
        WatchBackend::Notify
    }

    fn configure(&mut self, latency: Duration) {
        self.latency = latency;
    }

    fn set_dirty_sender(&mut self, sender: mpsc::UnboundedSender<DirtySet>) {
        self.sender = Some(sender);
    }

    async fn start(&mut self) -> Result<()> {
        let sender = self
            .sender
            .clone()
            .ok_or_else(|| Error::Internal("dirty sender not set before start".to_string()))?;
        let root = self.root.clone();

        let mut debouncer = new_debouncer(
            self.latency,
            None,
            move |result: DebounceEventResult| match result {
                Ok(events) => {
                    let directories = Self::dirty_directories(&root, &events);
                    if directories.is_empty() {
                        return;
                    }
                    if sender
                        .send(DirtySet {
                            directories,
                            recursive: false,
                        })
                        .is_err()
                    {
                        debug!("dirty-set receiver dropped; notification discarded");
                    }
                }
                Err(errors) => {
                    for err in errors {
                        error!("notify error: {err}");
                    }
                }
            },
        )
        .map_err(|err| Error::Watch(format!("failed to create notify watcher: {err}")))?;

        debouncer
            .watch(&self.root, RecursiveMode::Recursive)
            .map_err(|err| Error::Watch(format!("failed to watch root: {err}")))?;

        self.debouncer = Some(debouncer);
        info!(root = %self.root.display(), "notify adapter started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        // Dropping the debouncer stops its notification thread; the sender
        // captured by its callback is dropped with it.
        if self.debouncer.take().is_some() {
            info!(root = %self.root.display(), "notify adapter stopped");
        }
        self.sender = None;
        Ok(())
    }
}
