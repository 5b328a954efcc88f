//! Watcher facade: owns the engine, binds an adapter, forwards changes.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace};

use crate::backends::{create_adapter, Adapter};
use crate::config::WatcherConfig;
use crate::engine::DiffEngine;
use crate::error::{Error, Result};
use crate::events::{ChangeHandler, DirtySet};
use crate::rules::Pattern;
use crate::WatchBackend;

/// Owns the diff engine and its collaborators, binds the selected adapter,
/// and forwards non-empty change sets to the registered handler.
///
/// Configuration mutators may be called before [`start`](Self::start);
/// changes made afterwards only take effect once the watcher is stopped and
/// started again, which re-binds the adapter.
pub struct Watcher {
    config: WatcherConfig,
    handler: Option<Arc<dyn ChangeHandler>>,
    engine: Option<Arc<Mutex<DiffEngine>>>,
    adapter: Option<Box<dyn Adapter>>,
    processor: Option<JoinHandle<()>>,
    running: bool,
}

impl Watcher {
    /// Create a watcher from a validated configuration.
    pub fn new(config: WatcherConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            handler: None,
            engine: None,
            adapter: None,
            processor: None,
            running: false,
        })
    }

    /// Append an ignore pattern.
    pub fn ignore(&mut self, pattern: Pattern) -> &mut Self {
        self.config.ignores.push(pattern);
        self
    }

    /// Append a filter pattern.
    pub fn filter(&mut self, pattern: Pattern) -> &mut Self {
        self.config.filters.push(pattern);
        self
    }

    /// Set the adapter latency.
    pub fn latency(&mut self, latency: Duration) -> &mut Self {
        self.config.latency = latency;
        self
    }

    /// Switch between the polling fallback and the native notify backend.
    pub fn polling(&mut self, enabled: bool) -> &mut Self {
        self.config.backend = if enabled {
            WatchBackend::Polling
        } else {
            WatchBackend::Notify
        };
        self
    }

    /// Register the change handler. Exactly one handler is supported; a
    /// later call replaces the earlier one.
    pub fn change(&mut self, handler: Arc<dyn ChangeHandler>) -> &mut Self {
        self.handler = Some(handler);
        self
    }

    /// Whether the watcher is currently started.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Perform the initial full scan, then bind and start the adapter.
    ///
    /// Dirty sets from the adapter are consumed by a single processor task,
    /// which serializes diffs: one diff's registry mutations always complete
    /// before the next diff begins.
    pub async fn start(&mut self) -> Result<()> {
        if self.running {
            return Err(Error::AlreadyRunning);
        }
        self.config.validate()?;
        let handler = self
            .handler
            .clone()
            .ok_or_else(|| Error::Config("no change handler registered".to_string()))?;

        let mut engine = DiffEngine::new(self.config.root.clone(), self.config.rule_set());
        engine.rebuild()?;
        let engine = Arc::new(Mutex::new(engine));
        self.engine = Some(engine.clone());

        let (dirty_tx, mut dirty_rx) = mpsc::unbounded_channel();
        let mut adapter = create_adapter(self.config.backend, self.config.root.clone());
        adapter.configure(self.config.latency);
        adapter.set_dirty_sender(dirty_tx);
        adapter.start().await?;
        self.adapter = Some(adapter);

        let processor = tokio::spawn(async move {
            while let Some(dirty) = dirty_rx.recv().await {
                if let Err(err) = dispatch(&engine, &handler, dirty).await {
                    error!("diff dispatch failed: {err}");
                }
            }
            debug!("dirty-set channel closed; processor exiting");
        });
        self.processor = Some(processor);

        self.running = true;
        info!(
            root = %self.config.root.display(),
            backend = ?self.config.backend,
            "watcher started"
        );
        Ok(())
    }

    /// Stop the adapter and drain the processor task.
    ///
    /// Idempotent: stopping a watcher that is not running is a no-op. The
    /// engine and its snapshot survive a stop, so [`on_change`](Self::on_change)
    /// remains usable and a later `start` re-binds a fresh adapter.
    pub async fn stop(&mut self) -> Result<()> {
        if !self.running {
            return Ok(());
        }
        if let Some(mut adapter) = self.adapter.take() {
            adapter.stop().await?;
        }
        // The adapter held the only senders; with it gone the processor's
        // channel closes and the task drains whatever is already queued.
        if let Some(processor) = self.processor.take() {
            let _ = processor.await;
        }
        self.running = false;
        info!(root = %self.config.root.display(), "watcher stopped");
        Ok(())
    }

    /// Adapter-facing change entry point: run an incremental diff over the
    /// given directories and forward the result to the handler if anything
    /// changed.
    ///
    /// `recursive` asks for a deep additions walk of every directory, for
    /// callers that cannot pinpoint the exact changed subdirectory.
    pub async fn on_change(
        &self,
        directories: HashSet<PathBuf>,
        recursive: bool,
    ) -> Result<()> {
        let engine = self.engine.as_ref().ok_or(Error::NotRunning)?;
        let handler = self
            .handler
            .clone()
            .ok_or_else(|| Error::Config("no change handler registered".to_string()))?;
        dispatch(
            engine,
            &handler,
            DirtySet {
                directories,
                recursive,
            },
        )
        .await
    }
}

/// Run one serialized diff and forward a non-empty result to the handler.
async fn dispatch(
    engine: &Arc<Mutex<DiffEngine>>,
    handler: &Arc<dyn ChangeHandler>,
    dirty: DirtySet,
) -> Result<()> {
    let changes = {
        let mut engine = engine.lock().await;
        let directories: Vec<PathBuf> = dirty.directories.into_iter().collect();
        engine.diff(&directories, dirty.recursive)?
    };
    if changes.is_empty() {
        trace!("diff produced no changes");
        return Ok(());
    }
    debug!(
        handler = handler.name(),
        modified = changes.modified.len(),
        added = changes.added.len(),
        removed = changes.removed.len(),
        "forwarding change set"
    );
    handler.handle(changes).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{ChangeSet, FnHandler};
    use std::fs;
    use std::sync::Mutex as StdMutex;
    use tempfile::TempDir;

    fn collecting_handler() -> (Arc<dyn ChangeHandler>, Arc<StdMutex<Vec<ChangeSet>>>) {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = seen.clone();
        let handler = Arc::new(FnHandler::new(move |changes| {
            sink.lock().unwrap().push(changes);
        }));
        (handler, seen)
    }

    #[test]
    fn construction_rejects_bad_roots() {
        assert!(Watcher::new(WatcherConfig::new("/definitely/not/here")).is_err());
    }

    #[tokio::test]
    async fn start_requires_a_handler() {
        let dir = TempDir::new().unwrap();
        let mut watcher = Watcher::new(WatcherConfig::new(dir.path())).unwrap();
        assert!(matches!(watcher.start().await, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn double_start_is_rejected() {
        let dir = TempDir::new().unwrap();
        let (handler, _) = collecting_handler();

        let mut watcher = Watcher::new(
            WatcherConfig::new(dir.path()).with_backend(WatchBackend::Polling),
        )
        .unwrap();
        watcher.change(handler);
        watcher.start().await.unwrap();
        assert!(matches!(watcher.start().await, Err(Error::AlreadyRunning)));
        watcher.stop().await.unwrap();
    }

    #[tokio::test]
    async fn on_change_forwards_only_non_empty_change_sets() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.rb"), "a").unwrap();
        let (handler, seen) = collecting_handler();

        // A huge polling interval keeps the adapter quiet while we drive
        // on_change by hand.
        let mut watcher = Watcher::new(
            WatcherConfig::new(dir.path())
                .with_backend(WatchBackend::Polling)
                .with_latency(Duration::from_secs(3600)),
        )
        .unwrap();
        watcher.change(handler);
        watcher.start().await.unwrap();

        let dirs: HashSet<PathBuf> = [dir.path().to_path_buf()].into();
        // First diff may tie-break a.rb's mtime (written within the scan
        // second) by seeding its content hash; run it once to settle.
        watcher.on_change(dirs.clone(), true).await.unwrap();
        seen.lock().unwrap().clear();

        watcher.on_change(dirs.clone(), true).await.unwrap();
        assert!(seen.lock().unwrap().is_empty(), "no changes, no callback");

        fs::write(dir.path().join("b.rb"), "b").unwrap();
        watcher.on_change(dirs, true).await.unwrap();

        let collected = seen.lock().unwrap();
        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].added, vec!["b.rb".to_string()]);
        drop(collected);

        watcher.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let (handler, _) = collecting_handler();

        let mut watcher = Watcher::new(
            WatcherConfig::new(dir.path()).with_backend(WatchBackend::Polling),
        )
        .unwrap();
        watcher.change(handler);
        assert!(watcher.stop().await.is_ok());

        watcher.start().await.unwrap();
        watcher.stop().await.unwrap();
        assert!(watcher.stop().await.is_ok());
        assert!(!watcher.is_running());
    }
}
