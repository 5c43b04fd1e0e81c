//! TreeStructure: all nodes of one view in pre-order
//!
//! Containment uses the nested-set model: a node covers the contiguous
//! pre-order range `[pre, pre + size]`, so `is_ancestor` is a range test and
//! subtree operations move a contiguous run of the durable list.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::debug;

use crate::aggregation::aggregate_meta_edges;
use crate::config::StoreConfig;
use crate::durable::DurableList;
use crate::error::{GraphError, Result};
use crate::ids::IdGenerator;
use crate::model::{Edge, EdgeId, MetaEdge, Node, NodeId, ViewId};

/// The hierarchy, edges and meta-edges of one view.
///
/// Not synchronised by itself; a [`GraphView`](crate::GraphView) wraps it in
/// a reader/writer lock.
#[derive(Debug, Clone)]
pub struct Structure {
    pub(crate) view: ViewId,
    pub(crate) ids: Arc<IdGenerator>,
    pub(crate) config: StoreConfig,
    pub(crate) list: DurableList<NodeId>,
    pub(crate) nodes: HashMap<NodeId, Node>,
    pub(crate) edges: HashMap<EdgeId, Edge>,
    pub(crate) meta_edges: HashMap<EdgeId, MetaEdge>,
    pub(crate) generation: u64,
}

impl Structure {
    pub fn new(view: ViewId, ids: Arc<IdGenerator>, config: StoreConfig) -> Self {
        let mut list = DurableList::new();
        let handle = list.insert(0, NodeId::ROOT);
        let mut nodes = HashMap::new();
        nodes.insert(NodeId::ROOT, Node::new(NodeId::ROOT, view, handle, None, 0));
        Structure {
            view,
            ids,
            config,
            list,
            nodes,
            edges: HashMap::new(),
            meta_edges: HashMap::new(),
            generation: 0,
        }
    }

    /// Independent copy of this structure under another view id.
    pub(crate) fn fork(&self, view: ViewId) -> Self {
        let mut copy = self.clone();
        copy.view = view;
        copy.generation = 0;
        for node in copy.nodes.values_mut() {
            node.view = view;
        }
        for edge in copy.edges.values_mut() {
            edge.view = view;
        }
        for meta in copy.meta_edges.values_mut() {
            meta.view = view;
        }
        copy
    }

    pub fn view(&self) -> ViewId {
        self.view
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Incremented by every structural mutation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Number of nodes, not counting the virtual root.
    pub fn node_count(&self) -> usize {
        self.list.len() - 1
    }

    /// Highest pre-order rank in use.
    pub fn last_pre(&self) -> usize {
        self.list.len() - 1
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        !id.is_root() && self.nodes.contains_key(&id)
    }

    /// Pre-order rank of `id`. The virtual root is 0.
    pub fn pre(&self, id: NodeId) -> Option<usize> {
        self.nodes.get(&id).map(|node| self.pre_of(node))
    }

    pub fn node_at(&self, pre: usize) -> Option<NodeId> {
        self.list.get(pre)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(Node::parent)
    }

    /// Direct children of `id` in document order.
    pub fn children(&self, id: NodeId) -> Result<Vec<NodeId>> {
        let node = self.require(id)?;
        let end = self.pre_of(node) + node.size;
        let mut next = self.pre_of(node) + 1;
        let mut children = Vec::new();
        while next <= end {
            let child = self.id_at(next)?;
            next += self.require(child)?.size + 1;
            children.push(child);
        }
        Ok(children)
    }

    /// `a` is a strict ancestor of `b`: `a.pre < b.pre <= a.pre + a.size`.
    pub fn is_ancestor(&self, a: NodeId, b: NodeId) -> bool {
        match (self.nodes.get(&a), self.nodes.get(&b)) {
            (Some(na), Some(nb)) => {
                let (pa, pb) = (self.pre_of(na), self.pre_of(nb));
                pa < pb && pb <= pa + na.size
            }
            _ => false,
        }
    }

    pub fn is_descendant(&self, a: NodeId, b: NodeId) -> bool {
        self.is_ancestor(b, a)
    }

    /// Depth of the deepest node.
    pub fn height(&self) -> usize {
        self.nodes.values().map(|n| n.level).max().unwrap_or(0)
    }

    /// Add a node as the last child of `parent` (the virtual root when `None`).
    ///
    /// The node is visible unless `parent` sits inside a collapsed cluster.
    pub fn add_node(&mut self, parent: Option<NodeId>) -> Result<NodeId> {
        let parent = parent.unwrap_or(NodeId::ROOT);
        let node = self.require(parent)?;
        let rank = self.pre_of(node) + node.size + 1;
        let hidden = self.visible_ancestor(parent).is_some();

        let id = self.ids.next_node();
        self.insert_node_at(id, parent, rank)?;
        self.node_mut(id)?.enabled = !hidden;
        self.bump();
        debug!("Added node {} under {} at pre {}", id, parent, rank);
        Ok(id)
    }

    /// Remove `id` with its whole subtree, their edges and meta-edges.
    /// Returns the removed nodes in pre-order.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Vec<NodeId>> {
        self.require_member(id)?;
        let parent = self.require(id)?.parent.unwrap_or(NodeId::ROOT);
        let members = self.subtree(id)?;
        let doomed = self.incident_edges(&members);
        let mut affected = doomed.clone();
        affected.extend(self.incident_edges(&[parent]));

        self.detach_meta_all(&affected)?;
        for edge in &doomed {
            self.unlink_edge(*edge)?;
        }
        self.detach_range(id)?;
        for member in &members {
            self.nodes.remove(member);
        }
        self.restore_cut(parent)?;
        self.attach_meta_all(&affected)?;
        self.bump();

        debug!("Removed {} nodes and {} edges under {}", members.len(), doomed.len(), id);
        Ok(members)
    }

    /// Move `id` with its subtree to be the last child of `new_parent`.
    pub fn move_node(&mut self, id: NodeId, new_parent: Option<NodeId>) -> Result<()> {
        let new_parent = new_parent.unwrap_or(NodeId::ROOT);
        self.require_member(id)?;
        self.require(new_parent)?;
        if new_parent == id || self.is_ancestor(id, new_parent) {
            return Err(GraphError::InvalidHierarchy(format!(
                "cannot move {} into its own subtree",
                id
            )));
        }

        let old_parent = self.require(id)?.parent.unwrap_or(NodeId::ROOT);
        let was_hidden = self.has_hidden_context(id);
        let will_hide = self.visible_ancestor(new_parent).is_some();
        let members = self.subtree(id)?;
        let mut affected = self.incident_edges(&members);
        affected.extend(self.incident_edges(&[old_parent]));

        self.detach_meta_all(&affected)?;
        self.relocate(id, new_parent, None)?;
        if will_hide {
            for member in &members {
                self.node_mut(*member)?.enabled = false;
            }
        } else if was_hidden {
            for member in &members {
                self.node_mut(*member)?.enabled = *member == id;
            }
        }
        self.restore_cut(old_parent)?;
        self.attach_meta_all(&affected)?;
        self.bump();

        debug!("Moved {} from {} to {}", id, old_parent, new_parent);
        Ok(())
    }

    /// Check every structural invariant and the meta-edge aggregation.
    pub fn validate(&self) -> Result<()> {
        if self.list.len() != self.nodes.len() {
            return Err(corrupted(format!(
                "{} nodes indexed but {} stored",
                self.list.len(),
                self.nodes.len()
            )));
        }

        let mut covered: HashMap<NodeId, usize> = HashMap::new();
        for (pre, id) in self.list.iter().enumerate() {
            let node = self.require(id)?;
            if self.pre_of(node) != pre {
                return Err(corrupted(format!("{} stored at {} reports pre {}", id, pre, self.pre_of(node))));
            }
            if pre == 0 {
                if !id.is_root() || node.enabled {
                    return Err(corrupted("pre 0 must be the hidden virtual root".to_string()));
                }
                continue;
            }
            let parent = node.parent.ok_or_else(|| corrupted(format!("{} has no parent", id)))?;
            let parent_node = self.require(parent)?;
            if !self.is_ancestor(parent, id) {
                return Err(corrupted(format!("{} lies outside its parent {}", id, parent)));
            }
            if node.level != parent_node.level + 1 {
                return Err(corrupted(format!("{} has level {} under level {}", id, node.level, parent_node.level)));
            }
            *covered.entry(parent).or_default() += node.size + 1;
        }
        for (id, node) in &self.nodes {
            let expected = covered.get(id).copied().unwrap_or(0);
            if node.size != expected {
                return Err(corrupted(format!("{} has size {} but {} descendants", id, node.size, expected)));
            }
        }

        self.validate_cut()?;
        self.validate_edges()?;
        self.validate_meta_edges()
    }

    fn validate_cut(&self) -> Result<()> {
        for (id, node) in &self.nodes {
            if id.is_root() {
                continue;
            }
            let mut enabled = 0;
            let mut current = Some(*id);
            while let Some(at) = current.filter(|n| !n.is_root()) {
                let n = self.require(at)?;
                enabled += usize::from(n.enabled);
                current = n.parent;
            }
            if enabled > 1 || (node.is_leaf() && enabled == 0) {
                return Err(corrupted(format!("{} sees {} visible nodes on its root path", id, enabled)));
            }
        }
        Ok(())
    }

    fn validate_edges(&self) -> Result<()> {
        for edge in self.edges.values() {
            let source = self.require(edge.source)?;
            let target = self.require(edge.target)?;
            if source.edges_out.get(edge.target) != Some(edge.id) || target.edges_in.get(edge.source) != Some(edge.id) {
                return Err(corrupted(format!("{} is not indexed by both endpoints", edge.id)));
            }
        }
        let indexed: usize = self.nodes.values().map(|n| n.edges_out.len()).sum();
        if indexed != self.edges.len() {
            return Err(corrupted(format!("{} edges indexed but {} stored", indexed, self.edges.len())));
        }
        Ok(())
    }

    fn validate_meta_edges(&self) -> Result<()> {
        let expected = aggregate_meta_edges(self);
        if expected.len() != self.meta_edges.len() {
            return Err(corrupted(format!(
                "{} meta-edges stored but {} expected",
                self.meta_edges.len(),
                expected.len()
            )));
        }
        for aggregate in expected {
            let meta = self
                .meta_edge_between(aggregate.source, aggregate.target)
                .ok_or(GraphError::MetaEdgeNotFound(aggregate.source, aggregate.target))?;
            let stored: Vec<EdgeId> = meta.edges.iter().copied().collect();
            if stored != aggregate.underlying_edge_ids {
                return Err(corrupted(format!("{} summarises the wrong edges", meta.id)));
            }
            if (meta.weight - aggregate.weight).abs() > 1e-9 * aggregate.weight.abs().max(1.0) {
                return Err(corrupted(format!("{} has weight {} instead of {}", meta.id, meta.weight, aggregate.weight)));
            }
        }
        Ok(())
    }

    pub(crate) fn bump(&mut self) {
        self.generation += 1;
    }

    pub(crate) fn pre_of(&self, node: &Node) -> usize {
        self.list.rank(node.handle)
    }

    pub(crate) fn id_at(&self, pre: usize) -> Result<NodeId> {
        self.list
            .get(pre)
            .ok_or_else(|| corrupted(format!("no node at pre {}", pre)))
    }

    pub(crate) fn require(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(&id).ok_or(GraphError::NodeNotFound(id))
    }

    /// Like [`require`](Self::require) but rejects the virtual root.
    pub(crate) fn require_member(&self, id: NodeId) -> Result<&Node> {
        if id.is_root() {
            return Err(GraphError::RootNotAllowed);
        }
        self.require(id)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))
    }

    /// `id` and its descendants in pre-order.
    pub(crate) fn subtree(&self, id: NodeId) -> Result<Vec<NodeId>> {
        let node = self.require(id)?;
        let start = self.pre_of(node);
        (start..=start + node.size).map(|pre| self.id_at(pre)).collect()
    }

    /// Every edge touching one of `nodes`.
    pub(crate) fn incident_edges(&self, nodes: &[NodeId]) -> BTreeSet<EdgeId> {
        let mut edges = BTreeSet::new();
        for node in nodes.iter().filter_map(|id| self.nodes.get(id)) {
            edges.extend(node.edges_out.edges());
            edges.extend(node.edges_in.edges());
        }
        edges
    }

    pub(crate) fn insert_node_at(&mut self, id: NodeId, parent: NodeId, rank: usize) -> Result<()> {
        let level = self.require(parent)?.level + 1;
        let handle = self.list.insert(rank, id);
        self.nodes.insert(id, Node::new(id, self.view, handle, Some(parent), level));
        self.adjust_sizes(Some(parent), 1)
    }

    /// Take the subtree of `id` out of the pre-order list. The records stay
    /// in place; their handles are stale until [`attach_range`](Self::attach_range).
    pub(crate) fn detach_range(&mut self, id: NodeId) -> Result<Vec<NodeId>> {
        let node = self.require(id)?;
        let start = self.pre_of(node);
        let count = node.size + 1;
        let parent = node.parent;

        let mut removed = Vec::with_capacity(count);
        for _ in 0..count {
            let member = self
                .list
                .remove(start)
                .ok_or_else(|| corrupted(format!("subtree of {} runs past the end", id)))?;
            removed.push(member);
        }
        self.adjust_sizes(parent, -(count as isize))?;
        Ok(removed)
    }

    /// Re-insert a detached run (head first) as a child of `parent` at `rank`.
    pub(crate) fn attach_range(&mut self, ids: &[NodeId], parent: NodeId, rank: usize) -> Result<()> {
        let Some(&head) = ids.first() else {
            return Ok(());
        };
        let level = self.require(parent)?.level + 1;
        let shift = level as isize - self.require(head)?.level as isize;

        for (offset, id) in ids.iter().enumerate() {
            let handle = self.list.insert(rank + offset, *id);
            let node = self.node_mut(*id)?;
            node.handle = handle;
            node.level = node
                .level
                .checked_add_signed(shift)
                .ok_or_else(|| corrupted(format!("negative level for {}", id)))?;
        }
        self.node_mut(head)?.parent = Some(parent);
        self.adjust_sizes(Some(parent), ids.len() as isize)
    }

    /// Move the subtree of `id` under `new_parent`, either right before
    /// `before` or after the parent's last descendant.
    pub(crate) fn relocate(&mut self, id: NodeId, new_parent: NodeId, before: Option<NodeId>) -> Result<()> {
        let run = self.detach_range(id)?;
        let rank = match before {
            Some(anchor) => self.pre(anchor).ok_or(GraphError::NodeNotFound(anchor))?,
            None => {
                let parent = self.require(new_parent)?;
                self.pre_of(parent) + parent.size + 1
            }
        };
        self.attach_range(&run, new_parent, rank)
    }

    fn adjust_sizes(&mut self, from: Option<NodeId>, delta: isize) -> Result<()> {
        let mut current = from;
        while let Some(id) = current {
            let node = self.node_mut(id)?;
            node.size = node
                .size
                .checked_add_signed(delta)
                .ok_or_else(|| corrupted(format!("negative size for {}", id)))?;
            current = node.parent;
        }
        Ok(())
    }
}

pub(crate) fn corrupted(message: String) -> GraphError {
    GraphError::Corrupted(message)
}
