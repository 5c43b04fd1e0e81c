//! Thicket Core: hierarchical indexed graph store with collapsible clusters

pub mod adjacency;
pub mod aggregation;
pub mod config;
pub mod cursor;
pub mod durable;
mod edges;
pub mod error;
mod hierarchy;
pub mod ids;
pub mod iterable;
pub mod model;
pub mod predicate;
pub mod structure;
pub mod view;


#[cfg(test)]
pub mod test_utils;

pub use adjacency::AdjacencyTree;
pub use aggregation::{AggregatedEdge, aggregate_meta_edges, nearest_visible_ancestor};
pub use config::StoreConfig;
pub use cursor::{
    ChildrenCursor, Cursor, DescendantCursor, Direction, EdgeCursor, LevelCursor, MetaEdgeCursor, NeighborCursor,
    NodeEdgeCursor, NodeMetaEdgeCursor, Stamp,
};
pub use error::{GraphError, Result};
pub use ids::IdGenerator;
pub use iterable::Iterable;
pub use model::{Edge, EdgeId, MetaEdge, Node, NodeId, ViewId};
pub use predicate::{AcceptAll, EdgePredicate, NodePredicate, Visible};
pub use structure::Structure;
pub use view::{GraphStore, GraphView};
