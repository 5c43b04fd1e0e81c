//! Edge aggregation for collapsed clusters
//!
//! Computes from scratch what the incrementally maintained meta-edges of a
//! [`Structure`] should look like. Used by `validate` and by tooling that
//! wants the collapsed graph without trusting the stored state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{EdgeId, NodeId};
use crate::structure::Structure;

/// One summarised connection between two visible nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedEdge {
    pub source: NodeId,
    pub target: NodeId,
    pub count: usize,
    pub weight: f64,
    /// Sorted by id.
    pub underlying_edge_ids: Vec<EdgeId>,
}

/// Aggregate every edge with a hidden endpoint onto the nearest visible
/// ancestors of its endpoints. Results are ordered by `(source, target)`.
pub fn aggregate_meta_edges(structure: &Structure) -> Vec<AggregatedEdge> {
    let mut edges: Vec<_> = structure.edges.values().collect();
    edges.sort_unstable_by_key(|edge| edge.id);

    let mut aggregated: BTreeMap<(NodeId, NodeId), AggregatedEdge> = BTreeMap::new();
    for edge in edges {
        let (Some(source), Some(target)) = (
            nearest_visible_ancestor(structure, edge.source),
            nearest_visible_ancestor(structure, edge.target),
        ) else {
            continue;
        };
        // Collapsed into one cluster, or a plain visible edge.
        if source == target || (source == edge.source && target == edge.target) {
            continue;
        }

        let entry = aggregated
            .entry((source, target))
            .or_insert_with(|| AggregatedEdge {
                source,
                target,
                count: 0,
                weight: 0.0,
                underlying_edge_ids: Vec::new(),
            });
        entry.count += 1;
        entry.weight += edge.weight;
        entry.underlying_edge_ids.push(edge.id);
    }

    aggregated.into_values().collect()
}

/// Find the nearest visible ancestor of a node by walking parent links.
/// If the node itself is visible, return it.
///
/// Kept separate from `Structure::visible_ancestor` so the oracle does not
/// share code with the incremental path it checks.
pub fn nearest_visible_ancestor(structure: &Structure, node: NodeId) -> Option<NodeId> {
    let mut current = structure.node(node)?;
    loop {
        if current.is_enabled() {
            return Some(current.id());
        }
        current = structure.node(current.parent()?)?;
    }
}
