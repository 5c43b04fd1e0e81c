//! Core data structures for the hierarchical graph

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::adjacency::AdjacencyTree;
use crate::durable::Handle;

/// Identifier of a node. The wrapped number doubles as the key of every
/// adjacency index that points at this node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct NodeId(pub u64);

impl NodeId {
    /// The virtual root every structure is built under.
    pub const ROOT: NodeId = NodeId(0);

    pub fn is_root(self) -> bool {
        self == Self::ROOT
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Identifier of an edge or meta-edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct EdgeId(pub u64);

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Identifier of a logical view over the shared identifier space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct ViewId(pub u64);

impl ViewId {
    /// The view every store starts with.
    pub const MAIN: ViewId = ViewId(0);
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view{}", self.0)
    }
}

/// A node of one view.
///
/// Hierarchy position is kept in nested-set form: `size` counts descendants,
/// `level` is the depth below the virtual root and the pre-order rank is
/// derived from the durable handle (see [`Structure::pre`](crate::Structure::pre)).
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) view: ViewId,
    pub(crate) handle: Handle,
    pub(crate) parent: Option<NodeId>,
    pub(crate) size: usize,
    pub(crate) level: usize,
    pub(crate) enabled: bool,
    pub(crate) edges_out: AdjacencyTree,
    pub(crate) edges_in: AdjacencyTree,
    pub(crate) meta_out: AdjacencyTree,
    pub(crate) meta_in: AdjacencyTree,
}

impl Node {
    pub(crate) fn new(id: NodeId, view: ViewId, handle: Handle, parent: Option<NodeId>, level: usize) -> Self {
        Node {
            id,
            view,
            handle,
            parent,
            size: 0,
            level,
            enabled: false,
            edges_out: AdjacencyTree::new(),
            edges_in: AdjacencyTree::new(),
            meta_out: AdjacencyTree::new(),
            meta_in: AdjacencyTree::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn view(&self) -> ViewId {
        self.view
    }

    /// Parent in the hierarchy. Top-level nodes report `None`.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent.filter(|p| !p.is_root())
    }

    /// Number of descendants.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn is_leaf(&self) -> bool {
        self.size == 0
    }

    /// Whether the node is part of the visible (collapsed) graph.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Outgoing edges keyed by target.
    pub fn edges_out(&self) -> &AdjacencyTree {
        &self.edges_out
    }

    /// Incoming edges keyed by source.
    pub fn edges_in(&self) -> &AdjacencyTree {
        &self.edges_in
    }

    /// Outgoing meta-edges keyed by the visible target.
    pub fn meta_out(&self) -> &AdjacencyTree {
        &self.meta_out
    }

    /// Incoming meta-edges keyed by the visible source.
    pub fn meta_in(&self) -> &AdjacencyTree {
        &self.meta_in
    }
}

/// An edge between two nodes of the same view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub weight: f64,
    pub directed: bool,
    pub view: ViewId,
    /// Meta-edge this edge is currently summarised by.
    #[serde(skip)]
    pub(crate) meta: Option<EdgeId>,
}

impl Edge {
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }

    /// The endpoint that is not `node`; `None` when `node` is not an endpoint.
    pub fn opposite(&self, node: NodeId) -> Option<NodeId> {
        if self.source == node {
            Some(self.target)
        } else if self.target == node {
            Some(self.source)
        } else {
            None
        }
    }

    /// The meta-edge currently aggregating this edge, if its endpoints are hidden.
    pub fn meta_edge(&self) -> Option<EdgeId> {
        self.meta
    }
}

/// Aggregation of the edges running between two visible nodes when at least
/// one true endpoint is hidden inside a collapsed cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaEdge {
    pub id: EdgeId,
    /// The visible node the underlying edges leave from.
    pub source: NodeId,
    /// The visible node the underlying edges arrive at.
    pub target: NodeId,
    /// Sum of the underlying edge weights.
    pub weight: f64,
    /// The underlying edge IDs (for drill-down).
    pub edges: BTreeSet<EdgeId>,
    pub view: ViewId,
}

impl MetaEdge {
    pub(crate) fn new(id: EdgeId, source: NodeId, target: NodeId, view: ViewId) -> Self {
        MetaEdge {
            id,
            source,
            target,
            weight: 0.0,
            edges: BTreeSet::new(),
            view,
        }
    }

    /// How many underlying edges this represents.
    pub fn count(&self) -> usize {
        self.edges.len()
    }
}
