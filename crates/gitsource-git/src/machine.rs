use crate::builder::{file_node_seed, relative_path};
use crate::errors::*;
use crate::queue::{PendingOp, PendingOpQueue};
use crate::types::SourceEvent;
use futures::future::join_all;
use gitsource_core::{
    CommitIndex, ContentGraphSink, ContentNode, FileNodeBuilder, NodeId, PathEventKind, PathKind,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, error, info};

/// Host bootstrap region. Gates verbosity only: per-action log lines are
/// silenced until the host reports its bootstrap phase finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapState {
    Bootstrapping,
    Bootstrapped,
}

/// Watch region. `Ready` is terminal for the session and reachable exactly
/// once; the transition into it runs the one-time flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    NotReady,
    Ready,
}

/// Applies upsert/delete mutations against the sink. Split out from the
/// machine so flush fan-out and spawned live upserts can own a handle
/// without borrowing machine state.
#[derive(Clone)]
struct Mutator {
    sink: Arc<dyn ContentGraphSink>,
    builder: Arc<dyn FileNodeBuilder>,
    name: String,
    root: PathBuf,
    remote: NodeId,
    commit_index: Arc<CommitIndex>,
}

impl Mutator {
    async fn upsert(&self, path: &Path) -> Result<()> {
        let node = self
            .builder
            .build(path, &self.name, &self.root)
            .await
            .map_err(|source| SourceError::NodeBuildFailed {
                path: path.to_path_buf(),
                source,
            })?;
        let relative = node.relative_path.clone();
        let mut node = node.with_remote(self.remote);
        if let Some(shas) = self.commit_index.commits_for(&relative) {
            node = node.with_commits(shas.to_vec());
        }
        self.sink.create(ContentNode::File(node)).await?;
        Ok(())
    }

    /// Returns whether a node was actually removed. Absence is expected:
    /// tools write and immediately delete temporary files, so the node for a
    /// removed path may never have been created.
    async fn delete(&self, path: &Path) -> Result<bool> {
        let relative = relative_path(path, &self.root);
        let id = self.sink.allocate_id(&file_node_seed(&relative));
        if self.sink.lookup(id).await?.is_none() {
            return Ok(false);
        }
        Ok(self.sink.delete(id).await?)
    }
}

/// Two orthogonal regions evaluated together, transitioning independently,
/// driven by one serialized dispatch loop: an event is handled to completion
/// before the next is looked at, so neither the state fields nor the queue
/// need locking.
pub struct WatchMachine {
    bootstrap: BootstrapState,
    watch: WatchState,
    queue: PendingOpQueue,
    mutator: Mutator,
}

impl WatchMachine {
    pub fn new(
        name: String,
        root: PathBuf,
        remote: NodeId,
        commit_index: Arc<CommitIndex>,
        sink: Arc<dyn ContentGraphSink>,
        builder: Arc<dyn FileNodeBuilder>,
    ) -> Self {
        Self {
            bootstrap: BootstrapState::Bootstrapping,
            watch: WatchState::NotReady,
            queue: PendingOpQueue::new(),
            mutator: Mutator {
                sink,
                builder,
                name,
                root,
                remote,
                commit_index,
            },
        }
    }

    pub fn bootstrap_state(&self) -> BootstrapState {
        self.bootstrap
    }

    pub fn watch_state(&self) -> WatchState {
        self.watch
    }

    pub fn pending_ops(&self) -> usize {
        self.queue.len()
    }

    /// Dispatch one event to completion.
    pub async fn handle(&mut self, event: SourceEvent) {
        match event {
            SourceEvent::BootstrapFinished => {
                self.bootstrap = BootstrapState::Bootstrapped;
            }
            SourceEvent::WatchReady { done } => self.on_watch_ready(done).await,
            SourceEvent::Path {
                kind,
                path_kind,
                path,
            } => match self.watch {
                WatchState::NotReady => self.buffer(kind, path),
                WatchState::Ready => self.apply_live(kind, path_kind, path).await,
            },
        }
    }

    fn buffer(&mut self, kind: PathEventKind, path: PathBuf) {
        let op = match kind {
            PathEventKind::Added | PathEventKind::Changed => PendingOp::Upsert(path),
            PathEventKind::Removed => PendingOp::Delete(path),
        };
        self.queue.enqueue(op);
    }

    async fn on_watch_ready(&mut self, done: oneshot::Sender<Result<()>>) {
        if self.watch == WatchState::Ready {
            // A duplicate ready signal must neither flush again nor hang its
            // caller.
            debug!("ignoring duplicate ready signal");
            let _ = done.send(Ok(()));
            return;
        }
        self.watch = WatchState::Ready;
        let result = self.flush().await;
        let _ = done.send(result);
    }

    /// Exit action for leaving `NotReady`: drain the queue and run every
    /// buffered mutation. Ops for one path run in enqueue order; distinct
    /// paths run concurrently. Runs exactly once per session.
    async fn flush(&mut self) -> Result<()> {
        let ops = self.queue.flush();
        info!(count = ops.len(), "flushing buffered filesystem operations");

        let mut groups: Vec<(PathBuf, Vec<PendingOp>)> = Vec::new();
        for op in ops {
            match groups.iter_mut().find(|(p, _)| p.as_path() == op.path()) {
                Some((_, group)) => group.push(op),
                None => groups.push((op.path().to_path_buf(), vec![op])),
            }
        }

        let chains = groups.into_iter().map(|(_, group)| {
            let mutator = self.mutator.clone();
            async move {
                let mut failures = 0usize;
                for op in group {
                    let outcome = match &op {
                        PendingOp::Upsert(path) => mutator.upsert(path).await,
                        PendingOp::Delete(path) => mutator.delete(path).await.map(|_| ()),
                    };
                    if let Err(err) = outcome {
                        error!(path = %op.path().display(), error = %err, "flush mutation failed");
                        failures += 1;
                    }
                }
                failures
            }
        });

        let failures: usize = join_all(chains).await.into_iter().sum();
        if failures > 0 {
            return Err(SourceError::FlushFailed { failures });
        }
        Ok(())
    }

    async fn apply_live(&mut self, kind: PathEventKind, path_kind: PathKind, path: PathBuf) {
        let log_enabled = self.bootstrap == BootstrapState::Bootstrapped;
        match kind {
            PathEventKind::Added | PathEventKind::Changed => {
                // Asynchronous: a slow build must not block dispatch of the
                // next event. Failures are reported, not retried.
                let mutator = self.mutator.clone();
                tokio::spawn(async move {
                    match mutator.upsert(&path).await {
                        Ok(()) => {
                            if log_enabled {
                                info!("{kind} {path_kind} at {}", path.display());
                            }
                        }
                        Err(err) => {
                            error!(path = %path.display(), error = %err, "failed to process path");
                        }
                    }
                });
            }
            PathEventKind::Removed => {
                // Only needs a local id computation, so it completes within
                // the dispatch of this event.
                match self.mutator.delete(&path).await {
                    Ok(_) => {
                        if log_enabled {
                            info!("{kind} {path_kind} at {}", path.display());
                        }
                    }
                    Err(err) => {
                        error!(path = %path.display(), error = %err, "failed to delete node");
                    }
                }
            }
        }
    }
}
