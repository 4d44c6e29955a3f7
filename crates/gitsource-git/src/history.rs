use crate::{errors::*, repo::SyncedRepository};
use chrono::{DateTime, Utc};
use git2::{ObjectType, Sort, TreeWalkMode, TreeWalkResult};
use gitsource_core::{CommitIndex, CommitRecord, ContentGraphSink, ContentNode, NodeId};
use std::sync::Arc;
use tracing::{debug, info};

/// Everything one exhaustive history traversal produced: one record per
/// reachable commit (most recent first) and the per-path commit index.
pub struct HistoryScan {
    pub records: Vec<CommitRecord>,
    pub index: CommitIndex,
}

/// Walk every commit reachable from the primary branch tip in time order,
/// most recent first. For each commit, build a [`CommitRecord`] and append
/// its sha to the index entry of every path in that commit's tree snapshot
/// (the full snapshot, not a diff against the parent).
///
/// Blocking: does not return until every commit and tree entry was visited.
/// Any unreadable object aborts the walk; there is no partial index.
pub fn collect_history(
    repo: &SyncedRepository,
    remote: NodeId,
    sink: &dyn ContentGraphSink,
) -> Result<HistoryScan> {
    let tip = repo.tip_commit()?;
    debug!(tip = %tip.id(), "walking history");

    let git = repo.repository();
    let mut revwalk = git.revwalk().map_err(SourceError::HistoryWalkFailed)?;
    revwalk
        .set_sorting(Sort::TIME)
        .map_err(SourceError::HistoryWalkFailed)?;
    revwalk
        .push(tip.id())
        .map_err(SourceError::HistoryWalkFailed)?;

    let mut records = Vec::new();
    let mut index = CommitIndex::new();

    for oid in revwalk {
        let oid = oid.map_err(SourceError::HistoryWalkFailed)?;
        let commit = git.find_commit(oid).map_err(SourceError::HistoryWalkFailed)?;
        let sha = oid.to_string();

        let author = commit.author();
        let author_name = author.name().unwrap_or("unknown").to_string();
        let author_email = author.email().unwrap_or("").to_string();
        let timestamp = DateTime::<Utc>::from_timestamp(commit.time().seconds(), 0)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let message = commit.message().unwrap_or("").to_string();
        let digest = sink.digest(
            format!("{sha} {author_name} {author_email} {timestamp} {message}").as_bytes(),
        );

        records.push(CommitRecord {
            id: sink.allocate_id(&format!("git-commit-{sha}")),
            sha: sha.clone(),
            remote,
            author_name,
            author_email,
            timestamp,
            message,
            digest,
        });

        let tree = commit.tree().map_err(SourceError::HistoryWalkFailed)?;
        tree.walk(TreeWalkMode::PreOrder, |parent, entry| {
            if entry.kind() == Some(ObjectType::Blob) {
                // Non-utf8 tree entries cannot be addressed as graph paths.
                if let Some(name) = entry.name() {
                    index.append(format!("{parent}{name}"), &sha);
                }
            }
            TreeWalkResult::Ok
        })
        .map_err(SourceError::HistoryWalkFailed)?;
    }

    info!(
        commits = records.len(),
        paths = index.len(),
        "history walk complete"
    );
    Ok(HistoryScan { records, index })
}

/// [`collect_history`] plus submission: every record is pushed to the sink
/// before the index is handed back, so an index entry never references a
/// commit the sink has not seen.
pub async fn index_history(
    repo: &SyncedRepository,
    remote: NodeId,
    sink: &Arc<dyn ContentGraphSink>,
) -> Result<CommitIndex> {
    let scan = collect_history(repo, remote, sink.as_ref())?;
    for record in scan.records {
        sink.create(ContentNode::Commit(record)).await?;
    }
    Ok(scan.index)
}
