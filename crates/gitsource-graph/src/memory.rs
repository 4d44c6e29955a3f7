use async_trait::async_trait;
use dashmap::DashMap;
use gitsource_core::{ContentGraphSink, ContentNode, NodeId, Result};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Namespace for deterministic id allocation; the same seed maps to the same
/// id across sessions, which is what lets a delete find the node a create made.
const GRAPH_NAMESPACE: Uuid = Uuid::from_u128(0x7c3a_1f0e_9b42_4d58_8a67_02e5_c1d9_03b4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphOp {
    Created(NodeId),
    Deleted(NodeId),
}

/// DashMap-backed [`ContentGraphSink`]. `create` is an upsert keyed by id, so
/// re-sourcing an unchanged repository replaces nodes instead of duplicating
/// them. The journal records every applied mutation in completion order.
pub struct MemoryGraph {
    nodes: DashMap<NodeId, ContentNode>,
    journal: Mutex<Vec<GraphOp>>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self {
            nodes: DashMap::new(),
            journal: Mutex::new(Vec::new()),
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn count_of_type(&self, type_name: &str) -> usize {
        self.nodes
            .iter()
            .filter(|entry| entry.value().type_name() == type_name)
            .count()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn journal(&self) -> Vec<GraphOp> {
        self.journal.lock().clone()
    }

    pub fn clear_journal(&self) {
        self.journal.lock().clear();
    }
}

impl Default for MemoryGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentGraphSink for MemoryGraph {
    async fn create(&self, node: ContentNode) -> Result<()> {
        let id = node.id();
        self.nodes.insert(id, node);
        self.journal.lock().push(GraphOp::Created(id));
        Ok(())
    }

    async fn delete(&self, id: NodeId) -> Result<bool> {
        let removed = self.nodes.remove(&id).is_some();
        if removed {
            self.journal.lock().push(GraphOp::Deleted(id));
        }
        Ok(removed)
    }

    async fn lookup(&self, id: NodeId) -> Result<Option<ContentNode>> {
        Ok(self.nodes.get(&id).map(|entry| entry.value().clone()))
    }

    fn allocate_id(&self, seed: &str) -> NodeId {
        Uuid::new_v5(&GRAPH_NAMESPACE, seed.as_bytes())
    }

    fn digest(&self, bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitsource_core::RemoteDescriptor;

    fn remote_node(graph: &MemoryGraph) -> ContentNode {
        let id = graph.allocate_id("git-remote-docs");
        ContentNode::Remote(
            RemoteDescriptor::parse(id, "docs", "https://github.com/acme/docs.git").unwrap(),
        )
    }

    #[tokio::test]
    async fn create_lookup_delete_roundtrip() {
        let graph = MemoryGraph::new();
        let node = remote_node(&graph);
        let id = node.id();

        graph.create(node).await.unwrap();
        assert!(graph.lookup(id).await.unwrap().is_some());
        assert!(graph.delete(id).await.unwrap());
        assert!(graph.lookup(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_of_absent_node_is_not_an_error() {
        let graph = MemoryGraph::new();
        let id = graph.allocate_id("file never-created.txt");
        assert!(!graph.delete(id).await.unwrap());
        assert!(graph.journal().is_empty());
    }

    #[tokio::test]
    async fn create_is_an_upsert() {
        let graph = MemoryGraph::new();
        graph.create(remote_node(&graph)).await.unwrap();
        graph.create(remote_node(&graph)).await.unwrap();
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.journal().len(), 2);
    }

    #[test]
    fn allocate_id_is_deterministic() {
        let graph = MemoryGraph::new();
        assert_eq!(graph.allocate_id("file a.txt"), graph.allocate_id("file a.txt"));
        assert_ne!(graph.allocate_id("file a.txt"), graph.allocate_id("file b.txt"));
    }

    #[test]
    fn digest_is_stable() {
        let graph = MemoryGraph::new();
        assert_eq!(graph.digest(b"hello"), graph.digest(b"hello"));
        assert_ne!(graph.digest(b"hello"), graph.digest(b"world"));
    }
}
