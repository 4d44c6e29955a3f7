use crate::{NodeId, PathKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A working-tree entry materialized in the content graph.
///
/// `commits` carries the CommitIndex entry for `relative_path` at build time;
/// it is `None` for paths with no recorded history (e.g. created after
/// indexing finished).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileNode {
    pub id: NodeId,
    pub path: PathBuf,
    pub relative_path: String,
    pub name: String,
    pub extension: Option<String>,
    pub kind: PathKind,
    pub size: u64,
    pub modified_at: Option<DateTime<Utc>>,
    pub digest: String,
    pub remote: Option<NodeId>,
    pub commits: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FileNode {
    pub fn new(id: NodeId, path: PathBuf, relative_path: String, kind: PathKind) -> Self {
        let now = Utc::now();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| relative_path.clone());
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_string());
        Self {
            id,
            path,
            relative_path,
            name,
            extension,
            kind,
            size: 0,
            modified_at: None,
            digest: String::new(),
            remote: None,
            commits: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn with_modified(mut self, modified_at: DateTime<Utc>) -> Self {
        self.modified_at = Some(modified_at);
        self
    }

    pub fn with_digest(mut self, digest: String) -> Self {
        self.digest = digest;
        self
    }

    pub fn with_remote(mut self, remote: NodeId) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn with_commits(mut self, commits: Vec<String>) -> Self {
        self.commits = Some(commits);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn derives_name_and_extension() {
        let node = FileNode::new(
            Uuid::new_v4(),
            PathBuf::from("/work/docs/guide.md"),
            "docs/guide.md".into(),
            PathKind::File,
        );
        assert_eq!(node.name, "guide.md");
        assert_eq!(node.extension.as_deref(), Some("md"));
        assert!(node.commits.is_none());
    }
}
