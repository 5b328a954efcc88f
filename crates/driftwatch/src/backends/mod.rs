//! Adapter backends that decide *when* and *for which directories* a re-diff
//! runs.
//!
//! Adapters never compute changes themselves: they push [`DirtySet`]s into
//! the watcher, which serializes them into the diff engine. The set of
//! backends is closed and enumerated by [`WatchBackend`]; one is chosen at
//! construction via [`create_adapter`].

mod notify_backend;
mod polling_backend;

pub use notify_backend::NotifyAdapter;
pub use polling_backend::PollingAdapter;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::events::DirtySet;
use crate::WatchBackend;

/// Contract every watch backend fulfils.
#[async_trait]
pub trait Adapter: Send {
    /// Which backend this adapter implements.
    fn backend_type(&self) -> WatchBackend;

    /// Set the trigger cadence: debounce window for native backends, poll
    /// interval for the polling backend. Takes effect on the next `start`.
    fn configure(&mut self, latency: Duration);

    /// Set the channel dirty sets are delivered on. Must be called before
    /// `start`.
    fn set_dirty_sender(&mut self, sender: mpsc::UnboundedSender<DirtySet>);

    /// Begin producing dirty-set notifications.
    async fn start(&mut self) -> Result<()>;

    /// Cease producing notifications. After this resolves the adapter never
    /// sends again.
    async fn stop(&mut self) -> Result<()>;
}

/// Construct the adapter for the selected backend.
pub fn create_adapter(backend: WatchBackend, root: PathBuf) -> Box<dyn Adapter> {
    match backend {
        WatchBackend::Notify => Box::new(NotifyAdapter::new(root)),
        WatchBackend::Polling => Box::new(PollingAdapter::new(root)),
    }
}
