//! Views and the store that owns them
//!
//! Every operation goes through an explicit [`GraphView`] handle. Mutations
//! take the view's write lock for their duration; traversals hand back an
//! [`Iterable`] that holds the read lock until it is exhausted, broken off
//! or dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::cursor::{
    ChildrenCursor, Cursor, DescendantCursor, Direction, EdgeCursor, LevelCursor, MetaEdgeCursor,
    NeighborCursor, NodeEdgeCursor, NodeMetaEdgeCursor,
};
use crate::error::{GraphError, Result};
use crate::ids::IdGenerator;
use crate::iterable::Iterable;
use crate::model::{Edge, EdgeId, MetaEdge, Node, NodeId, ViewId};
use crate::predicate::{AcceptAll, EdgePredicate, NodePredicate, Visible};
use crate::structure::Structure;

/// Handle to one view. Cheap to clone; clones share the same structure.
#[derive(Debug, Clone)]
pub struct GraphView {
    id: ViewId,
    inner: Arc<RwLock<Structure>>,
}

impl GraphView {
    pub fn new(structure: Structure) -> Self {
        GraphView {
            id: structure.view(),
            inner: Arc::new(RwLock::new(structure)),
        }
    }

    pub fn id(&self) -> ViewId {
        self.id
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Structure> {
        self.inner.read()
    }

    /// Exclusive access for a batch of mutations.
    pub fn write(&self) -> RwLockWriteGuard<'_, Structure> {
        self.inner.write()
    }

    pub fn try_write(&self) -> Option<RwLockWriteGuard<'_, Structure>> {
        self.inner.try_write()
    }

    // ── Mutations ───────────────────────────────────────

    pub fn add_node(&self, parent: Option<NodeId>) -> Result<NodeId> {
        self.inner.write().add_node(parent)
    }

    pub fn remove_node(&self, id: NodeId) -> Result<Vec<NodeId>> {
        self.inner.write().remove_node(id)
    }

    pub fn move_node(&self, id: NodeId, new_parent: Option<NodeId>) -> Result<()> {
        self.inner.write().move_node(id, new_parent)
    }

    pub fn add_edge(&self, source: NodeId, target: NodeId, weight: f64, directed: bool) -> Result<EdgeId> {
        self.inner.write().add_edge(source, target, weight, directed)
    }

    pub fn remove_edge(&self, id: EdgeId) -> Result<Edge> {
        self.inner.write().remove_edge(id)
    }

    pub fn set_edge_weight(&self, id: EdgeId, weight: f64) -> Result<()> {
        self.inner.write().set_edge_weight(id, weight)
    }

    pub fn group(&self, members: &[NodeId]) -> Result<NodeId> {
        self.inner.write().group(members)
    }

    pub fn ungroup(&self, cluster: NodeId) -> Result<Vec<NodeId>> {
        self.inner.write().ungroup(cluster)
    }

    pub fn expand(&self, id: NodeId) -> Result<()> {
        self.inner.write().expand(id)
    }

    pub fn retract(&self, id: NodeId) -> Result<()> {
        self.inner.write().retract(id)
    }

    // ── Queries ─────────────────────────────────────────

    pub fn node(&self, id: NodeId) -> Option<Node> {
        self.inner.read().node(id).cloned()
    }

    pub fn edge(&self, id: EdgeId) -> Option<Edge> {
        self.inner.read().edge(id).copied()
    }

    pub fn degree(&self, id: NodeId) -> Result<usize> {
        self.inner.read().degree(id)
    }

    pub fn is_ancestor(&self, a: NodeId, b: NodeId) -> bool {
        self.inner.read().is_ancestor(a, b)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.inner.read().parent(id)
    }

    pub fn child_ids(&self, id: NodeId) -> Result<Vec<NodeId>> {
        self.inner.read().children(id)
    }

    pub fn meta_edge_between(&self, source: NodeId, target: NodeId) -> Option<MetaEdge> {
        self.inner.read().meta_edge_between(source, target).cloned()
    }

    pub fn node_count(&self) -> usize {
        self.inner.read().node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.read().edge_count()
    }

    pub fn generation(&self) -> u64 {
        self.inner.read().generation()
    }

    pub fn validate(&self) -> Result<()> {
        self.inner.read().validate()
    }

    // ── Traversals ──────────────────────────────────────

    /// Take the read lock, build a cursor under it and bind both together.
    fn traverse<C, F>(&self, build: F) -> Result<Iterable<'static, C>>
    where
        C: Cursor,
        F: FnOnce(&Structure) -> Result<C>,
    {
        let guard = self.inner.read_arc();
        let cursor = build(&*guard)?;
        Ok(Iterable::locked(guard, cursor))
    }

    /// Every node in pre-order.
    pub fn nodes(&self) -> Result<Iterable<'static, DescendantCursor<AcceptAll>>> {
        self.traverse(|s| Ok(DescendantCursor::all(s, AcceptAll)))
    }

    /// The nodes of the collapsed view.
    pub fn visible_nodes(&self) -> Result<Iterable<'static, DescendantCursor<Visible>>> {
        self.traverse(|s| Ok(DescendantCursor::all(s, Visible)))
    }

    pub fn nodes_where<P: NodePredicate>(&self, predicate: P) -> Result<Iterable<'static, DescendantCursor<P>>> {
        self.traverse(|s| Ok(DescendantCursor::all(s, predicate)))
    }

    pub fn descendants(&self, node: NodeId) -> Result<Iterable<'static, DescendantCursor<AcceptAll>>> {
        self.traverse(|s| DescendantCursor::new(s, node, false, AcceptAll))
    }

    pub fn descendants_and_self(&self, node: NodeId) -> Result<Iterable<'static, DescendantCursor<AcceptAll>>> {
        self.traverse(|s| DescendantCursor::new(s, node, true, AcceptAll))
    }

    pub fn children(&self, node: NodeId) -> Result<Iterable<'static, ChildrenCursor<AcceptAll>>> {
        self.traverse(|s| ChildrenCursor::new(s, node, AcceptAll))
    }

    pub fn level<P: NodePredicate>(&self, level: usize, predicate: P) -> Result<Iterable<'static, LevelCursor<P>>> {
        self.traverse(|s| Ok(LevelCursor::new(s, level, predicate)))
    }

    pub fn neighbors(&self, node: NodeId, direction: Direction) -> Result<Iterable<'static, NeighborCursor<AcceptAll>>> {
        self.traverse(|s| NeighborCursor::new(s, node, direction, AcceptAll))
    }

    /// Main-view edges; undirected stores report each mutual pair once.
    pub fn edges(&self) -> Result<Iterable<'static, EdgeCursor<DescendantCursor<AcceptAll>, AcceptAll>>> {
        self.edges_where(AcceptAll)
    }

    pub fn edges_where<P: EdgePredicate>(
        &self,
        predicate: P,
    ) -> Result<Iterable<'static, EdgeCursor<DescendantCursor<AcceptAll>, P>>> {
        self.traverse(|s| {
            let owners = DescendantCursor::all(s, AcceptAll);
            Ok(EdgeCursor::new(s, owners, !s.config().directed, predicate))
        })
    }

    /// Edges between two visible nodes.
    pub fn visible_edges(&self) -> Result<Iterable<'static, EdgeCursor<DescendantCursor<Visible>, AcceptAll>>> {
        self.traverse(|s| Ok(EdgeCursor::visible(s, !s.config().directed, AcceptAll)))
    }

    pub fn node_edges(
        &self,
        node: NodeId,
        direction: Direction,
    ) -> Result<Iterable<'static, NodeEdgeCursor<AcceptAll>>> {
        self.traverse(|s| NodeEdgeCursor::new(s, node, direction, !s.config().directed, AcceptAll))
    }

    pub fn meta_edges(&self) -> Result<Iterable<'static, MetaEdgeCursor<DescendantCursor<Visible>>>> {
        self.traverse(|s| {
            let owners = DescendantCursor::all(s, Visible);
            Ok(MetaEdgeCursor::new(s, owners, !s.config().directed))
        })
    }

    pub fn node_meta_edges(
        &self,
        node: NodeId,
        direction: Direction,
    ) -> Result<Iterable<'static, NodeMetaEdgeCursor>> {
        self.traverse(|s| NodeMetaEdgeCursor::new(s, node, direction, !s.config().directed))
    }
}

/// Owns the configuration, the identifier space and every view.
pub struct GraphStore {
    config: StoreConfig,
    ids: Arc<IdGenerator>,
    main: GraphView,
    views: DashMap<ViewId, GraphView>,
    next_view: AtomicU64,
}

impl GraphStore {
    pub fn new(config: StoreConfig) -> Self {
        let ids = Arc::new(IdGenerator::new());
        let main = GraphView::new(Structure::new(ViewId::MAIN, ids.clone(), config.clone()));
        let views = DashMap::new();
        views.insert(ViewId::MAIN, main.clone());
        info!("Created graph store (directed: {})", config.directed);
        GraphStore {
            config,
            ids,
            main,
            views,
            next_view: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn ids(&self) -> &Arc<IdGenerator> {
        &self.ids
    }

    pub fn main_view(&self) -> GraphView {
        self.main.clone()
    }

    /// Create an independent copy of `from`. Nodes and edges keep their
    /// identifiers; new ones come from the shared generator.
    pub fn fork_view(&self, from: ViewId) -> Result<GraphView> {
        let source = self.view(from)?;
        let id = ViewId(self.next_view.fetch_add(1, Ordering::Relaxed));
        let view = GraphView::new(source.read().fork(id));
        self.views.insert(id, view.clone());
        debug!("Forked {} from {}", id, from);
        Ok(view)
    }

    pub fn view(&self, id: ViewId) -> Result<GraphView> {
        self.views
            .get(&id)
            .map(|r| r.value().clone())
            .ok_or(GraphError::ViewNotFound(id))
    }

    /// Forget a view. Handles already given out keep working.
    pub fn drop_view(&self, id: ViewId) -> Result<()> {
        if id == ViewId::MAIN {
            return Err(GraphError::Unsupported("the main view cannot be dropped"));
        }
        self.views.remove(&id).ok_or(GraphError::ViewNotFound(id))?;
        debug!("Dropped {}", id);
        Ok(())
    }

    pub fn view_ids(&self) -> Vec<ViewId> {
        let mut ids: Vec<ViewId> = self.views.iter().map(|r| *r.key()).collect();
        ids.sort();
        ids
    }

    pub fn view_count(&self) -> usize {
        self.views.len()
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}
