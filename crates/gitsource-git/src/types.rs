use crate::Result;
use gitsource_core::{PathEventKind, PathKind, SourceConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::oneshot;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncOptions {
    pub verify_certificates: bool,
    pub local_branch: String,
    pub remote_branch: String,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            verify_certificates: true,
            local_branch: "master".to_string(),
            remote_branch: "origin/master".to_string(),
        }
    }
}

impl From<&SourceConfig> for SyncOptions {
    fn from(config: &SourceConfig) -> Self {
        Self {
            verify_certificates: config.verify_certificates,
            local_branch: config.local_branch.clone(),
            remote_branch: config.remote_branch.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchOptions {
    /// Glob selecting which files participate; directories always pass.
    pub patterns: String,
    /// Fully merged ignore globs (built-in set plus configured extras).
    pub ignore: Vec<String>,
    /// Coalescing window for rapid upsert events on one path. Removals are
    /// never coalesced.
    pub debounce_ms: u64,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            patterns: "**".to_string(),
            ignore: gitsource_core::BUILT_IN_IGNORE
                .iter()
                .map(|g| g.to_string())
                .collect(),
            debounce_ms: 200,
        }
    }
}

impl From<&SourceConfig> for WatchOptions {
    fn from(config: &SourceConfig) -> Self {
        Self {
            patterns: config.patterns.clone(),
            ignore: config.ignore_globs(),
            debounce_ms: config.debounce_ms,
        }
    }
}

/// Event consumed by the watch machine's dispatch loop.
#[derive(Debug)]
pub enum SourceEvent {
    /// Filesystem change from the watcher.
    Path {
        kind: PathEventKind,
        path_kind: PathKind,
        path: PathBuf,
    },
    /// The watcher finished its initial scan. Carries the channel the flush
    /// outcome is reported on.
    WatchReady { done: oneshot::Sender<Result<()>> },
    /// The host's bootstrap phase completed; lifts the logging gate.
    BootstrapFinished,
}
