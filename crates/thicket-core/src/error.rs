//! Error taxonomy for structural operations

use crate::model::{EdgeId, NodeId, ViewId};

/// Errors reported by the graph store.
///
/// Every mutation validates its arguments before touching the structure, so
/// an `Err` never leaves a partial change behind.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("edge {from} -> {to} already exists in {view}")]
    DuplicateEdge { from: NodeId, to: NodeId, view: ViewId },

    #[error("node {0} does not exist in this view")]
    NodeNotFound(NodeId),

    #[error("edge {0} does not exist in this view")]
    EdgeNotFound(EdgeId),

    #[error("no meta-edge between {0} and {1}")]
    MetaEdgeNotFound(NodeId, NodeId),

    #[error("the virtual root cannot be used here")]
    RootNotAllowed,

    #[error("self-loop on {0} rejected by configuration")]
    SelfLoopRejected(NodeId),

    #[error("invalid hierarchy operation: {0}")]
    InvalidHierarchy(String),

    #[error("operation not supported: {0}")]
    Unsupported(&'static str),

    #[error("structure modified during traversal (generation {expected} -> {found})")]
    ConcurrentModification { expected: u64, found: u64 },

    #[error("cursor created on {expected} used on {found}")]
    ViewMismatch { expected: ViewId, found: ViewId },

    #[error("view {0} does not exist")]
    ViewNotFound(ViewId),

    #[error("structure invariant violated: {0}")]
    Corrupted(String),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GraphError>;
