//! GitSource synchronization engine: repository sync, commit history
//! indexing, and the watch machine that keeps a content graph aligned with
//! a working tree.
//!
//! The one-time historical ingestion and the live watch phase hand off
//! through a buffered queue, so no filesystem event is lost and no node is
//! created before its commit history is known.

pub mod builder;
pub mod errors;
pub mod history;
pub mod machine;
pub mod queue;
pub mod repo;
pub mod session;
pub mod types;
pub mod watcher;

#[cfg(test)]
mod testutil;

pub use builder::DiskFileBuilder;
pub use errors::{Result, SourceError};
pub use history::{collect_history, index_history, HistoryScan};
pub use machine::{BootstrapState, WatchMachine, WatchState};
pub use queue::{PendingOp, PendingOpQueue};
pub use repo::SyncedRepository;
pub use session::{synchronize, SourceSession};
pub use types::{SourceEvent, SyncOptions, WatchOptions};
pub use watcher::RepoWatcher;
