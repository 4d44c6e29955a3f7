use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gitsource_core::{
    ContentGraphSink, FileNode, FileNodeBuilder, PathKind, Result as CoreResult,
};
use std::path::Path;
use std::sync::Arc;

/// Id seed shared by node construction and delete-side lookup; both must
/// derive the same id from the same relative path.
pub fn file_node_seed(relative_path: &str) -> String {
    format!("file {relative_path}")
}

/// Repository-relative path with forward slashes, matching the form used by
/// the commit index.
pub fn relative_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Builds [`FileNode`]s from working-tree paths. Ids and digests come from
/// the sink so they stay consistent with the rest of the graph.
pub struct DiskFileBuilder {
    sink: Arc<dyn ContentGraphSink>,
}

impl DiskFileBuilder {
    pub fn new(sink: Arc<dyn ContentGraphSink>) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl FileNodeBuilder for DiskFileBuilder {
    async fn build(&self, path: &Path, name_hint: &str, root: &Path) -> CoreResult<FileNode> {
        // Fails with an IO error when the path vanished between notification
        // and build; the caller treats that as recoverable.
        let metadata = tokio::fs::metadata(path).await?;
        let relative = relative_path(path, root);
        let kind = if metadata.is_dir() {
            PathKind::Directory
        } else {
            PathKind::File
        };
        let id = self.sink.allocate_id(&file_node_seed(&relative));
        let modified = metadata.modified().ok().map(DateTime::<Utc>::from);

        let mut fingerprint = format!("{name_hint} {relative} {}", metadata.len());
        if let Some(modified) = &modified {
            fingerprint.push(' ');
            fingerprint.push_str(&modified.to_rfc3339());
        }
        let digest = self.sink.digest(fingerprint.as_bytes());

        let mut node = FileNode::new(id, path.to_path_buf(), relative, kind)
            .with_size(metadata.len())
            .with_digest(digest);
        if let Some(modified) = modified {
            node = node.with_modified(modified);
        }
        Ok(node)
    }
}
