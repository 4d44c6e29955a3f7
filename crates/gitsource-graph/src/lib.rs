//! Default in-memory implementation of the GitSource content-graph sink.

pub mod memory;

pub use memory::{GraphOp, MemoryGraph};
