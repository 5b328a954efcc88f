//! Timer-driven polling fallback adapter.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::backends::Adapter;
use crate::config::DEFAULT_LATENCY;
use crate::error::{Error, Result};
use crate::events::DirtySet;
use crate::WatchBackend;

/// Cross-platform fallback that periodically marks the whole root dirty.
///
/// Polling cannot pinpoint the changed subdirectory, so every tick sends the
/// root with `recursive: true`, asking for a deep additions walk. The diff
/// engine keeps this cheap: an unchanged tree produces an empty change set
/// that the watcher drops before it reaches the handler.
pub struct PollingAdapter {
    root: PathBuf,
    interval: Duration,
    sender: Option<mpsc::UnboundedSender<DirtySet>>,
    task: Option<JoinHandle<()>>,
    shutdown: Option<mpsc::Sender<()>>,
}

impl PollingAdapter {
    /// Create an adapter for the given root.
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            interval: DEFAULT_LATENCY,
            sender: None,
            task: None,
            shutdown: None,
        }
    }
}

#[async_trait]
impl Adapter for PollingAdapter {
    fn backend_type(&self) -> WatchBackend {
        WatchBackend::Polling
    }

    fn configure(&mut self, latency: Duration) {
        self.interval = latency;
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
        let interval = self.interval;

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    _ = tokio::time::sleep(interval) => {
                        let dirty = DirtySet::single(root.clone(), true);
                        if sender.send(dirty).is_err() {
                            debug!("dirty-set receiver dropped; polling loop exiting");
                            break;
                        }
                    }
                }
            }
        });

        self.shutdown = Some(shutdown_tx);
        self.task = Some(task);
        info!(root = %self.root.display(), interval_ms = interval.as_millis() as u64, "polling adapter started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(()).await;
        }
        // Await the loop so no tick can fire after stop resolves.
        if let Some(task) = self.task.take() {
            let _ = task.await;
            info!(root = %self.root.display(), "polling adapter stopped");
        }
        self.sender = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::time::timeout;

    #[tokio::test]
    async fn ticks_mark_the_root_recursively_dirty() {
        let dir = TempDir::new().unwrap();
        let mut adapter = PollingAdapter::new(dir.path().to_path_buf());
        adapter.configure(Duration::from_millis(10));

        let (tx, mut rx) = mpsc::unbounded_channel();
        adapter.set_dirty_sender(tx);
        adapter.start().await.unwrap();

        let dirty = timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("poll tick within deadline")
            .expect("channel open");
        assert!(dirty.recursive);
        assert!(dirty.directories.contains(&dir.path().to_path_buf()));

        adapter.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stop_prevents_further_ticks() {
        let dir = TempDir::new().unwrap();
        let mut adapter = PollingAdapter::new(dir.path().to_path_buf());
        adapter.configure(Duration::from_millis(10));

        let (tx, mut rx) = mpsc::unbounded_channel();
        adapter.set_dirty_sender(tx);
        adapter.start().await.unwrap();
        adapter.stop().await.unwrap();

        // Drain whatever was sent before the stop resolved; afterwards the
        // channel must be closed, not merely quiet.
        while let Ok(Some(_)) = timeout(Duration::from_millis(50), rx.recv()).await {}
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn start_requires_a_sender() {
        let dir = TempDir::new().unwrap();
        let mut adapter = PollingAdapter::new(dir.path().to_path_buf());
        assert!(adapter.start().await.is_err());
    }
}
