//! # driftwatch
//!
//! Incremental filesystem change detection. A watcher keeps a persisted
//! snapshot of the tree under a watched root; platform-native event sources
//! (or a timer-driven polling fallback) only say *which directories* might
//! have changed, and the diff engine computes exactly *what* changed by
//! re-walking just those directories against the snapshot. Each diff yields
//! three lists of root-relative paths: modified, added, removed.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────────┐    ┌─────────────────┐
//! │     Adapter     │───▶│     Watcher      │───▶│   DiffEngine    │
//! │ (notify/polling)│    │    (facade)      │    │                 │
//! └─────────────────┘    └──────────────────┘    └─────────────────┘
//!         │                       │                       │
//!         ▼                       ▼                       ▼
//! ┌─────────────────┐    ┌──────────────────┐    ┌─────────────────┐
//! │    DirtySet     │    │  ChangeHandler   │    │ SnapshotRegistry│
//! │ (dirs, deep?)   │    │  (consumer)      │    │ ChecksumStore   │
//! └─────────────────┘    └──────────────────┘    └─────────────────┘
//! ```
//!
//! Modification detection is mtime-based at one-second granularity with a
//! BLAKE3 content-hash tie-break for same-second writes. Renames are
//! reported as a removal plus an addition, never as a distinct event.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use driftwatch::{FnHandler, Watcher, WatcherConfig};
//!
//! #[tokio::main]
//! async fn main() -> driftwatch::Result<()> {
//!     let handler = Arc::new(FnHandler::new(|changes| {
//!         println!(
//!             "modified: {:?} added: {:?} removed: {:?}",
//!             changes.modified, changes.added, changes.removed
//!         );
//!     }));
//!
//!     let mut watcher = Watcher::new(WatcherConfig::new("/some/root"))?;
//!     watcher.change(handler);
//!     watcher.start().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod backends;
mod checksum;
pub mod config;
mod engine;
pub mod error;
mod events;
mod registry;
mod rules;
mod watcher;

pub use backends::{create_adapter, Adapter, NotifyAdapter, PollingAdapter};
pub use checksum::ChecksumStore;
pub use config::{WatcherConfig, DEFAULT_LATENCY};
pub use engine::DiffEngine;
pub use error::{Error, Result};
pub use events::{ChangeHandler, ChangeSet, DirtySet, FnHandler};
pub use registry::{EntryKind, SnapshotRegistry};
pub use rules::{Pattern, RuleSet, DEFAULT_IGNORES};
pub use watcher::Watcher;

/// Available watch backends.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq, Eq, Hash)]
pub enum WatchBackend {
    /// OS-native file system notifications via `notify`.
    Notify,
    /// Cross-platform timer-driven polling fallback.
    Polling,
}
