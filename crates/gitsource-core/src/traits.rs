use crate::{ContentNode, FileNode, NodeId, Result};
use async_trait::async_trait;
use std::path::Path;

/// The external system of record that stores and identifies content nodes.
#[async_trait]
pub trait ContentGraphSink: Send + Sync {
    /// Insert or replace a node, keyed by its id.
    async fn create(&self, node: ContentNode) -> Result<()>;

    /// Remove a node. Returns `false` when no node with that id exists;
    /// deleting an absent node is not an error.
    async fn delete(&self, id: NodeId) -> Result<bool>;

    async fn lookup(&self, id: NodeId) -> Result<Option<ContentNode>>;

    /// Deterministic id allocation: the same seed always yields the same id.
    fn allocate_id(&self, seed: &str) -> NodeId;

    fn digest(&self, bytes: &[u8]) -> String;
}

/// Turns a working-tree path into a [`FileNode`] representation.
#[async_trait]
pub trait FileNodeBuilder: Send + Sync {
    /// May fail with an IO error when the path vanished between notification
    /// and build; callers treat that as recoverable.
    async fn build(&self, path: &Path, name_hint: &str, root: &Path) -> Result<FileNode>;
}
