//! Node and edge filters used by traversals

use crate::model::{Edge, Node};

/// Decides whether a traversal yields a node.
pub trait NodePredicate: Send + Sync {
    fn evaluate(&self, node: &Node) -> bool;
}

/// Decides whether a traversal yields an edge.
pub trait EdgePredicate: Send + Sync {
    fn evaluate(&self, edge: &Edge) -> bool;
}

impl<F> NodePredicate for F
where
    F: Fn(&Node) -> bool + Send + Sync,
{
    fn evaluate(&self, node: &Node) -> bool {
        self(node)
    }
}

impl<F> EdgePredicate for F
where
    F: Fn(&Edge) -> bool + Send + Sync,
{
    fn evaluate(&self, edge: &Edge) -> bool {
        self(edge)
    }
}

/// Accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl NodePredicate for AcceptAll {
    fn evaluate(&self, _node: &Node) -> bool {
        true
    }
}

impl EdgePredicate for AcceptAll {
    fn evaluate(&self, _edge: &Edge) -> bool {
        true
    }
}

/// Accepts nodes that are part of the collapsed view.
#[derive(Debug, Clone, Copy, Default)]
pub struct Visible;

impl NodePredicate for Visible {
    fn evaluate(&self, node: &Node) -> bool {
        node.is_enabled()
    }
}
