//! Per-node adjacency index keyed by neighbour

use std::collections::BTreeMap;
use std::ops::Bound;

use crate::model::{EdgeId, NodeId};

/// Ordered map from a neighbour to the (meta-)edge that reaches it.
///
/// One entry per neighbour, so existence checks and lookups are O(log d).
#[derive(Debug, Clone, Default)]
pub struct AdjacencyTree {
    entries: BTreeMap<NodeId, EdgeId>,
}

impl AdjacencyTree {
    pub fn new() -> Self {
        AdjacencyTree {
            entries: BTreeMap::new(),
        }
    }

    /// Returns `false` and leaves the tree unchanged when `neighbour` is already present.
    pub fn insert(&mut self, neighbour: NodeId, edge: EdgeId) -> bool {
        if self.entries.contains_key(&neighbour) {
            return false;
        }
        self.entries.insert(neighbour, edge);
        true
    }

    pub fn remove(&mut self, neighbour: NodeId) -> Option<EdgeId> {
        self.entries.remove(&neighbour)
    }

    pub fn get(&self, neighbour: NodeId) -> Option<EdgeId> {
        self.entries.get(&neighbour).copied()
    }

    pub fn has_neighbour(&self, neighbour: NodeId) -> bool {
        self.entries.contains_key(&neighbour)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry strictly after `key`, or the first entry when `key` is `None`.
    pub fn next_after(&self, key: Option<NodeId>) -> Option<(NodeId, EdgeId)> {
        let lower = match key {
            Some(key) => Bound::Excluded(key),
            None => Bound::Unbounded,
        };
        self.entries
            .range((lower, Bound::Unbounded))
            .next()
            .map(|(n, e)| (*n, *e))
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, EdgeId)> + '_ {
        self.entries.iter().map(|(n, e)| (*n, *e))
    }

    pub fn edges(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.entries.values().copied()
    }
}
