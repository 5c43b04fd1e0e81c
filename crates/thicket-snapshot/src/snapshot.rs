//! Serializable snapshot of one view
//!
//! Nodes are recorded in pre-order with their parent, so a restore is a plain
//! replay of inserts. Identifiers are not preserved: the target structure
//! hands out its own and the restore reports the mapping.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thicket_core::{AcceptAll, Cursor, DescendantCursor, EdgeCursor, EdgeId, NodeId, Structure};
use tracing::{debug, info};

use crate::error::{Result, SnapshotError};

/// Bumped whenever the record layout changes.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    /// `None` for top-level nodes.
    pub parent: Option<NodeId>,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub weight: f64,
    pub directed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub version: u32,
    /// RFC 3339 capture time.
    pub captured_at: String,
    pub directed: bool,
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
}

impl GraphSnapshot {
    /// Record every node in pre-order and every edge of `structure`.
    pub fn capture(structure: &Structure) -> Result<Self> {
        let mut nodes = Vec::with_capacity(structure.node_count());
        let mut cursor = DescendantCursor::all(structure, AcceptAll);
        while let Some(id) = cursor.advance(structure)? {
            let node = structure
                .node(id)
                .ok_or_else(|| SnapshotError::Invalid(format!("{} vanished during capture", id)))?;
            nodes.push(NodeRecord {
                id,
                parent: node.parent(),
                enabled: node.is_enabled(),
            });
        }

        let owners = DescendantCursor::all(structure, AcceptAll);
        let mut cursor = EdgeCursor::new(structure, owners, false, AcceptAll);
        let mut edges = Vec::with_capacity(structure.edge_count());
        while let Some(edge) = cursor.advance(structure)? {
            edges.push(EdgeRecord {
                id: edge.id,
                source: edge.source,
                target: edge.target,
                weight: edge.weight,
                directed: edge.directed,
            });
        }
        edges.sort_by_key(|edge| edge.id);

        debug!("Captured {} nodes and {} edges from {}", nodes.len(), edges.len(), structure.view());
        Ok(GraphSnapshot {
            version: FORMAT_VERSION,
            captured_at: chrono::Utc::now().to_rfc3339(),
            directed: structure.config().directed,
            nodes,
            edges,
        })
    }

    /// Replay the snapshot into `structure` and return the node mapping
    /// from recorded to assigned identifiers.
    ///
    /// Inserts run in pre-order, then every node that was expanded at capture
    /// time is expanded again, top-down, and finally the edges are added so
    /// meta-edges aggregate against the restored visibility.
    pub fn restore_into(&self, structure: &mut Structure) -> Result<HashMap<NodeId, NodeId>> {
        if self.version != FORMAT_VERSION {
            return Err(SnapshotError::Version {
                found: self.version,
                expected: FORMAT_VERSION,
            });
        }

        let mut mapping: HashMap<NodeId, NodeId> = HashMap::with_capacity(self.nodes.len());
        // Recorded visibility, and whether the node sits below a collapsed cluster.
        let mut recorded: HashMap<NodeId, (bool, bool)> = HashMap::with_capacity(self.nodes.len());
        let mut expanded = Vec::new();
        for record in &self.nodes {
            let (parent, under_cluster) = match record.parent {
                Some(parent) => {
                    let mapped = mapping.get(&parent).copied().ok_or_else(|| {
                        SnapshotError::Invalid(format!("{} is listed before its parent {}", record.id, parent))
                    })?;
                    let (parent_enabled, parent_hidden) = recorded.get(&parent).copied().unwrap_or_default();
                    (Some(mapped), parent_enabled || parent_hidden)
                }
                None => (None, false),
            };
            let id = structure.add_node(parent)?;
            if mapping.insert(record.id, id).is_some() {
                return Err(SnapshotError::Invalid(format!("{} is listed twice", record.id)));
            }
            recorded.insert(record.id, (record.enabled, under_cluster));
            if !record.enabled && !under_cluster {
                expanded.push(id);
            }
        }

        for id in &expanded {
            let has_children = structure.node(*id).is_some_and(|node| !node.is_leaf());
            if has_children {
                structure.expand(*id)?;
            }
        }

        for record in &self.edges {
            let endpoint = |id: NodeId| {
                mapping
                    .get(&id)
                    .copied()
                    .ok_or_else(|| SnapshotError::Invalid(format!("{} references unknown node {}", record.id, id)))
            };
            let (source, target) = (endpoint(record.source)?, endpoint(record.target)?);
            structure.add_edge(source, target, record.weight, record.directed)?;
        }

        info!(
            "Restored {} nodes and {} edges into {}",
            self.nodes.len(),
            self.edges.len(),
            structure.view()
        );
        Ok(mapping)
    }
}
