//! Render/export views of a structure
//!
//! `Full` exports every node and edge. `Collapsed` exports what a viewer
//! would draw: the visible nodes, the edges between them and the meta-edges
//! standing in for edges with hidden endpoints.

use std::collections::HashMap;
use std::fmt;

use petgraph::dot::Dot;
use petgraph::graph::{DiGraph, NodeIndex};
use thicket_core::{AcceptAll, Cursor, DescendantCursor, EdgeCursor, MetaEdgeCursor, NodeId, Structure, Visible};

use crate::error::{Result, SnapshotError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportMode {
    #[default]
    Full,
    Collapsed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportNode {
    pub id: NodeId,
    pub level: usize,
    /// Descendants folded into this node; 0 unless it is a collapsed cluster.
    pub folded: usize,
}

impl fmt::Display for ExportNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.folded > 0 {
            write!(f, "{} [+{}]", self.id, self.folded)
        } else {
            write!(f, "{}", self.id)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportEdge {
    pub weight: f64,
    /// Underlying edges; 1 for a plain edge.
    pub count: usize,
}

impl fmt::Display for ExportEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count > 1 {
            write!(f, "{} ({} edges)", self.weight, self.count)
        } else {
            write!(f, "{}", self.weight)
        }
    }
}

/// Build a petgraph graph of `structure` in the given mode.
pub fn to_petgraph(structure: &Structure, mode: ExportMode) -> Result<DiGraph<ExportNode, ExportEdge>> {
    let mut graph = DiGraph::new();
    let mut index: HashMap<NodeId, NodeIndex> = HashMap::new();

    let ids = match mode {
        ExportMode::Full => DescendantCursor::all(structure, AcceptAll).collect_all(structure)?,
        ExportMode::Collapsed => DescendantCursor::all(structure, Visible).collect_all(structure)?,
    };
    for id in ids {
        let node = structure.node(id).ok_or(thicket_core::GraphError::NodeNotFound(id))?;
        let folded = match mode {
            ExportMode::Collapsed => node.size(),
            ExportMode::Full => 0,
        };
        let at = graph.add_node(ExportNode {
            id,
            level: node.level(),
            folded,
        });
        index.insert(id, at);
    }

    let lookup = |id: NodeId| {
        index
            .get(&id)
            .copied()
            .ok_or_else(|| SnapshotError::Invalid(format!("edge endpoint {} was not exported", id)))
    };
    let edges = match mode {
        ExportMode::Full => {
            let owners = DescendantCursor::all(structure, AcceptAll);
            EdgeCursor::new(structure, owners, false, AcceptAll).collect_all(structure)?
        }
        ExportMode::Collapsed => EdgeCursor::visible(structure, false, AcceptAll).collect_all(structure)?,
    };
    for edge in edges {
        let weight = ExportEdge {
            weight: edge.weight,
            count: 1,
        };
        graph.add_edge(lookup(edge.source)?, lookup(edge.target)?, weight);
    }

    if mode == ExportMode::Collapsed {
        let owners = DescendantCursor::all(structure, Visible);
        for meta in MetaEdgeCursor::new(structure, owners, false).collect_all(structure)? {
            let weight = ExportEdge {
                weight: meta.weight,
                count: meta.count(),
            };
            graph.add_edge(lookup(meta.source)?, lookup(meta.target)?, weight);
        }
    }

    tracing::debug!(
        "Exported {} nodes and {} edges ({:?})",
        graph.node_count(),
        graph.edge_count(),
        mode
    );
    Ok(graph)
}

/// Graphviz DOT rendering of [`to_petgraph`].
pub fn to_dot(structure: &Structure, mode: ExportMode) -> Result<String> {
    let graph = to_petgraph(structure, mode)?;
    Ok(format!("{}", Dot::new(&graph)))
}

/// One line per node in pre-order, indented by level, with its nested-set
/// coordinates and visibility.
pub fn render_outline(structure: &Structure) -> Result<String> {
    let mut lines = Vec::with_capacity(structure.node_count());
    for id in DescendantCursor::all(structure, AcceptAll).collect_all(structure)? {
        let node = structure.node(id).ok_or(thicket_core::GraphError::NodeNotFound(id))?;
        let pre = structure.pre(id).ok_or(thicket_core::GraphError::NodeNotFound(id))?;
        let state = match (node.is_enabled(), node.is_leaf()) {
            (true, true) => " visible",
            (true, false) => " collapsed",
            (false, _) if structure.is_hidden(id) => "",
            (false, _) => " expanded",
        };
        lines.push(format!(
            "{}{} pre={} size={}{}",
            "  ".repeat(node.level().saturating_sub(1)),
            id,
            pre,
            node.size(),
            state
        ));
    }
    Ok(lines.join("\n"))
}
