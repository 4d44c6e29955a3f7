use std::path::{Path, PathBuf};

/// A filesystem operation observed before the watch session reached its
/// ready state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingOp {
    Upsert(PathBuf),
    Delete(PathBuf),
}

impl PendingOp {
    pub fn path(&self) -> &Path {
        match self {
            PendingOp::Upsert(path) | PendingOp::Delete(path) => path,
        }
    }
}

#[derive(Debug)]
enum QueueState {
    Open(Vec<PendingOp>),
    Flushed,
}

/// Ordered buffer of operations accumulated while the watcher has not yet
/// reached steady state. Flushing returns the ops in insertion order and
/// permanently retires the queue; a second flush or a post-flush enqueue is
/// a programming error, not a runtime condition, and panics.
#[derive(Debug)]
pub struct PendingOpQueue {
    state: QueueState,
}

impl PendingOpQueue {
    pub fn new() -> Self {
        Self {
            state: QueueState::Open(Vec::new()),
        }
    }

    pub fn enqueue(&mut self, op: PendingOp) {
        match &mut self.state {
            QueueState::Open(ops) => ops.push(op),
            QueueState::Flushed => panic!("enqueue on a flushed pending-op queue"),
        }
    }

    pub fn flush(&mut self) -> Vec<PendingOp> {
        match std::mem::replace(&mut self.state, QueueState::Flushed) {
            QueueState::Open(ops) => ops,
            QueueState::Flushed => panic!("pending-op queue flushed twice"),
        }
    }

    pub fn len(&self) -> usize {
        match &self.state {
            QueueState::Open(ops) => ops.len(),
            QueueState::Flushed => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_flushed(&self) -> bool {
        matches!(self.state, QueueState::Flushed)
    }
}

impl Default for PendingOpQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flush_preserves_fifo_order_without_coalescing() {
        let mut queue = PendingOpQueue::new();
        queue.enqueue(PendingOp::Upsert(PathBuf::from("x")));
        queue.enqueue(PendingOp::Upsert(PathBuf::from("y")));
        queue.enqueue(PendingOp::Delete(PathBuf::from("x")));

        let ops = queue.flush();
        assert_eq!(
            ops,
            vec![
                PendingOp::Upsert(PathBuf::from("x")),
                PendingOp::Upsert(PathBuf::from("y")),
                PendingOp::Delete(PathBuf::from("x")),
            ]
        );
        assert!(queue.is_flushed());
    }

    #[test]
    #[should_panic(expected = "flushed twice")]
    fn second_flush_panics() {
        let mut queue = PendingOpQueue::new();
        queue.flush();
        queue.flush();
    }

    #[test]
    #[should_panic(expected = "enqueue on a flushed")]
    fn enqueue_after_flush_panics() {
        let mut queue = PendingOpQueue::new();
        queue.flush();
        queue.enqueue(PendingOp::Upsert(PathBuf::from("late")));
    }
}
