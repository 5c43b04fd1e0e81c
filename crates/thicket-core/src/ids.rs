//! Identifier generator shared by every view of a store

use std::sync::atomic::{AtomicU64, Ordering};

use crate::model::{EdgeId, NodeId};

/// Hands out monotonic node and edge identifiers. Thread-safe; shared by
/// all views of one store so an identifier is never issued twice.
#[derive(Debug)]
pub struct IdGenerator {
    next_node: AtomicU64,
    next_edge: AtomicU64,
}

impl IdGenerator {
    pub fn new() -> Self {
        // 0 is reserved for the virtual root.
        IdGenerator {
            next_node: AtomicU64::new(1),
            next_edge: AtomicU64::new(1),
        }
    }

    pub fn next_node(&self) -> NodeId {
        NodeId(self.next_node.fetch_add(1, Ordering::Relaxed))
    }

    /// Used for both edges and meta-edges.
    pub fn next_edge(&self) -> EdgeId {
        EdgeId(self.next_edge.fetch_add(1, Ordering::Relaxed))
    }

    pub fn peek_node(&self) -> NodeId {
        NodeId(self.next_node.load(Ordering::Relaxed))
    }

    pub fn peek_edge(&self) -> EdgeId {
        EdgeId(self.next_edge.load(Ordering::Relaxed))
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
