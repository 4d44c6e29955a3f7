use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SourceError>;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("repository unreachable at {url}: {source}")]
    RepositoryUnreachable {
        url: String,
        #[source]
        source: git2::Error,
    },

    #[error("history walk failed: {0}")]
    HistoryWalkFailed(#[source] git2::Error),

    #[error("failed to build node for {path}: {source}")]
    NodeBuildFailed {
        path: PathBuf,
        #[source]
        source: gitsource_core::GitSourceError,
    },

    #[error("{failures} queued mutation(s) failed during the initial flush")]
    FlushFailed { failures: usize },

    #[error("watch session terminated before readiness")]
    SessionAborted,

    #[error("Branch not found: {0}")]
    BranchNotFound(String),

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Watcher error: {0}")]
    Notify(#[from] notify::Error),

    #[error("Invalid glob: {0}")]
    Glob(#[from] globset::Error),

    #[error("Graph error: {0}")]
    Graph(#[from] gitsource_core::GitSourceError),
}
