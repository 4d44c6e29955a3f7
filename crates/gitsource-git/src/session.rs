use crate::builder::DiskFileBuilder;
use crate::errors::*;
use crate::history;
use crate::machine::WatchMachine;
use crate::repo::SyncedRepository;
use crate::types::{SourceEvent, SyncOptions, WatchOptions};
use crate::watcher::RepoWatcher;
use gitsource_core::{
    ContentGraphSink, ContentNode, FileNodeBuilder, RemoteDescriptor, SourceConfig,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::info;

/// A running sourcing session: the watcher and dispatch loop keep emitting
/// graph mutations for the lifetime of the value.
pub struct SourceSession {
    remote: RemoteDescriptor,
    local_path: PathBuf,
    events: mpsc::UnboundedSender<SourceEvent>,
    dispatch: JoinHandle<()>,
    _watcher: RepoWatcher,
}

impl SourceSession {
    pub fn remote(&self) -> &RemoteDescriptor {
        &self.remote
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// Signal that the host finished bootstrapping; lifts the gate on
    /// per-action log lines.
    pub fn bootstrap_finished(&self) {
        let _ = self.events.send(SourceEvent::BootstrapFinished);
    }

    pub fn shutdown(self) {
        self.dispatch.abort();
    }
}

impl Drop for SourceSession {
    fn drop(&mut self) {
        self.dispatch.abort();
    }
}

/// The single entry point: materialize the working tree, index its history,
/// then watch it indefinitely. Resolves once the initial flush completed;
/// the returned session continues emitting mutations until dropped.
pub async fn synchronize(
    config: SourceConfig,
    sink: Arc<dyn ContentGraphSink>,
) -> Result<SourceSession> {
    config.validate()?;
    let local_path = config.local_path();

    let remote_id = sink.allocate_id(&format!("git-remote-{}", config.name));
    let remote = RemoteDescriptor::parse(remote_id, &config.name, &config.remote)?;
    sink.create(ContentNode::Remote(remote.clone())).await?;

    info!(name = %config.name, remote = %config.remote, "sourcing repository");

    // The clone/fetch and the exhaustive history walk block; both finish
    // before any watch event can be processed.
    let sync_opts = SyncOptions::from(&config);
    let url = config.remote.clone();
    let checkout = local_path.clone();
    let walk_sink = Arc::clone(&sink);
    let scan = tokio::task::spawn_blocking(move || {
        let repo = SyncedRepository::sync(&url, &checkout, &sync_opts)?;
        history::collect_history(&repo, remote_id, walk_sink.as_ref())
    })
    .await
    .map_err(|err| SourceError::Io(std::io::Error::other(err)))??;

    info!(
        commits = scan.records.len(),
        paths = scan.index.len(),
        "history indexed"
    );
    for record in scan.records {
        sink.create(ContentNode::Commit(record)).await?;
    }
    let commit_index = Arc::new(scan.index);

    let builder: Arc<dyn FileNodeBuilder> = Arc::new(DiskFileBuilder::new(Arc::clone(&sink)));
    let mut machine = WatchMachine::new(
        config.name.clone(),
        local_path.clone(),
        remote_id,
        commit_index,
        Arc::clone(&sink),
        builder,
    );

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let dispatch = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            machine.handle(event).await;
        }
    });

    let (ready_tx, ready_rx) = oneshot::channel();
    let watcher = RepoWatcher::start(
        local_path.clone(),
        WatchOptions::from(&config),
        events_tx.clone(),
        ready_tx,
    )?;

    // Initial readiness: the first flush's outcome. A failed flush fails
    // the whole bootstrap.
    ready_rx.await.map_err(|_| SourceError::SessionAborted)??;
    info!(name = %config.name, "initial flush complete, watching for changes");

    Ok(SourceSession {
        remote,
        local_path,
        events: events_tx,
        dispatch,
        _watcher: watcher,
    })
}
