//! Traversal engine
//!
//! Cursors are single-pass state machines that hold no borrow of the
//! structure between steps: every call to [`Cursor::advance`] receives the
//! structure it walks. This lets a lock-bound [`Iterable`](crate::Iterable)
//! own both the read guard and the cursor, and lets a caller that owns the
//! structure exclusively interleave [`Cursor::remove`] with iteration.
//!
//! A cursor records the view and generation it was created against and
//! refuses to continue once either changes, unless `fail_fast` is disabled.
//! A cursor that fails, or whose predicate panics, stays exhausted.

use std::collections::BTreeSet;
use std::mem;

use crate::adjacency::AdjacencyTree;
use crate::error::{GraphError, Result};
use crate::model::{Edge, EdgeId, MetaEdge, Node, NodeId, ViewId};
use crate::predicate::{EdgePredicate, NodePredicate, Visible};
use crate::structure::Structure;

/// A detached, pull-based traversal.
pub trait Cursor {
    type Item;

    /// Buffer and return the next accepted element, or `None` once exhausted.
    fn advance(&mut self, structure: &Structure) -> Result<Option<Self::Item>>;

    /// Remove the element last returned by [`advance`](Self::advance).
    fn remove(&mut self, _structure: &mut Structure) -> Result<()> {
        Err(GraphError::Unsupported("remove is not supported by this traversal"))
    }

    /// Drain every remaining element.
    fn collect_all(&mut self, structure: &Structure) -> Result<Vec<Self::Item>>
    where
        Self: Sized,
    {
        let mut items = Vec::new();
        while let Some(item) = self.advance(structure)? {
            items.push(item);
        }
        Ok(items)
    }
}

/// The view and generation a cursor was created against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stamp {
    view: ViewId,
    generation: u64,
}

impl Stamp {
    pub fn of(structure: &Structure) -> Self {
        Stamp {
            view: structure.view(),
            generation: structure.generation(),
        }
    }

    pub fn check(&self, structure: &Structure) -> Result<()> {
        if self.view != structure.view() {
            return Err(GraphError::ViewMismatch {
                expected: self.view,
                found: structure.view(),
            });
        }
        if structure.config().fail_fast && self.generation != structure.generation() {
            return Err(GraphError::ConcurrentModification {
                expected: self.generation,
                found: structure.generation(),
            });
        }
        Ok(())
    }
}

/// Which adjacency trees of a node an incident traversal drains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Outgoing,
    Incoming,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Range {
    Positioned { next: usize, end: usize },
    Exhausted,
}

impl Range {
    /// Take the current position, leaving the range exhausted until the
    /// caller moves it on.
    fn take(&mut self) -> Option<(usize, usize)> {
        match mem::replace(self, Range::Exhausted) {
            Range::Positioned { next, end } if next <= end => Some((next, end)),
            _ => None,
        }
    }
}

/// Descendants of a node in pre-order, optionally including the node.
/// The virtual root is never yielded.
pub struct DescendantCursor<P> {
    range: Range,
    predicate: P,
    stamp: Stamp,
}

impl<P: NodePredicate> DescendantCursor<P> {
    pub fn new(structure: &Structure, node: NodeId, include_self: bool, predicate: P) -> Result<Self> {
        let pre = structure.pre(node).ok_or(GraphError::NodeNotFound(node))?;
        let size = structure.require(node)?.size;
        let skip = usize::from(!include_self || node.is_root());
        Ok(DescendantCursor {
            range: Range::Positioned {
                next: pre + skip,
                end: pre + size,
            },
            predicate,
            stamp: Stamp::of(structure),
        })
    }

    /// Every node of the structure.
    pub fn all(structure: &Structure, predicate: P) -> Self {
        DescendantCursor {
            range: Range::Positioned {
                next: 1,
                end: structure.last_pre(),
            },
            predicate,
            stamp: Stamp::of(structure),
        }
    }
}

impl<P: NodePredicate> Cursor for DescendantCursor<P> {
    type Item = NodeId;

    fn advance(&mut self, structure: &Structure) -> Result<Option<NodeId>> {
        self.stamp.check(structure)?;
        while let Some((next, end)) = self.range.take() {
            let id = structure.id_at(next)?;
            let accepted = self.predicate.evaluate(structure.require(id)?);
            self.range = Range::Positioned { next: next + 1, end };
            if accepted {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }
}

/// Direct children of a node in document order.
pub struct ChildrenCursor<P> {
    range: Range,
    predicate: P,
    stamp: Stamp,
}

impl<P: NodePredicate> ChildrenCursor<P> {
    pub fn new(structure: &Structure, node: NodeId, predicate: P) -> Result<Self> {
        let pre = structure.pre(node).ok_or(GraphError::NodeNotFound(node))?;
        let size = structure.require(node)?.size;
        Ok(ChildrenCursor {
            range: Range::Positioned {
                next: pre + 1,
                end: pre + size,
            },
            predicate,
            stamp: Stamp::of(structure),
        })
    }
}

impl<P: NodePredicate> Cursor for ChildrenCursor<P> {
    type Item = NodeId;

    fn advance(&mut self, structure: &Structure) -> Result<Option<NodeId>> {
        self.stamp.check(structure)?;
        while let Some((next, end)) = self.range.take() {
            let id = structure.id_at(next)?;
            let node = structure.require(id)?;
            let accepted = self.predicate.evaluate(node);
            self.range = Range::Positioned {
                next: next + node.size + 1,
                end,
            };
            if accepted {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }
}

/// Nodes at one level. A node rejected by the predicate is skipped with its
/// whole subtree, and so is every yielded node, without visiting the nodes
/// inside.
pub struct LevelCursor<P> {
    level: usize,
    range: Range,
    predicate: P,
    stamp: Stamp,
}

impl<P: NodePredicate> LevelCursor<P> {
    pub fn new(structure: &Structure, level: usize, predicate: P) -> Self {
        LevelCursor {
            level,
            range: Range::Positioned {
                next: 1,
                end: structure.last_pre(),
            },
            predicate,
            stamp: Stamp::of(structure),
        }
    }
}

impl<P: NodePredicate> Cursor for LevelCursor<P> {
    type Item = NodeId;

    fn advance(&mut self, structure: &Structure) -> Result<Option<NodeId>> {
        self.stamp.check(structure)?;
        while let Some((next, end)) = self.range.take() {
            let id = structure.id_at(next)?;
            let node = structure.require(id)?;
            let accepted = self.predicate.evaluate(node);
            let at_level = node.level == self.level;
            let step = if accepted && !at_level { 1 } else { node.size + 1 };
            self.range = Range::Positioned { next: next + step, end };
            if accepted && at_level {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }
}

fn edges_out(node: &Node) -> &AdjacencyTree {
    &node.edges_out
}

fn meta_out(node: &Node) -> &AdjacencyTree {
    &node.meta_out
}

/// Drains one adjacency tree per owner produced by an inner node cursor.
struct OwnerWalk<N> {
    owners: N,
    current: Option<(NodeId, Option<NodeId>)>,
}

impl<N: Cursor<Item = NodeId>> OwnerWalk<N> {
    fn new(owners: N) -> Self {
        OwnerWalk { owners, current: None }
    }

    fn next_entry(
        &mut self,
        structure: &Structure,
        tree: fn(&Node) -> &AdjacencyTree,
    ) -> Result<Option<(NodeId, NodeId, EdgeId)>> {
        loop {
            let (owner, after) = match self.current {
                Some(current) => current,
                None => match self.owners.advance(structure)? {
                    Some(owner) => (owner, None),
                    None => return Ok(None),
                },
            };
            match tree(structure.require(owner)?).next_after(after) {
                Some((neighbour, id)) => {
                    self.current = Some((owner, Some(neighbour)));
                    return Ok(Some((owner, neighbour, id)));
                }
                None => self.current = None,
            }
        }
    }
}

/// Main-view edges, drained from the outgoing tree of every node the inner
/// cursor yields. Undirected traversals report a mutual pair once.
pub struct EdgeCursor<N, P> {
    walk: Option<OwnerWalk<N>>,
    predicate: P,
    undirected: bool,
    visible_only: bool,
    stamp: Stamp,
}

impl<N: Cursor<Item = NodeId>, P: EdgePredicate> EdgeCursor<N, P> {
    pub fn new(structure: &Structure, owners: N, undirected: bool, predicate: P) -> Self {
        EdgeCursor {
            walk: Some(OwnerWalk::new(owners)),
            predicate,
            undirected,
            visible_only: false,
            stamp: Stamp::of(structure),
        }
    }
}

impl<P: EdgePredicate> EdgeCursor<DescendantCursor<Visible>, P> {
    /// Edges whose endpoints are both visible.
    pub fn visible(structure: &Structure, undirected: bool, predicate: P) -> Self {
        let owners = DescendantCursor::all(structure, Visible);
        EdgeCursor {
            visible_only: true,
            ..EdgeCursor::new(structure, owners, undirected, predicate)
        }
    }
}

impl<N: Cursor<Item = NodeId>, P: EdgePredicate> Cursor for EdgeCursor<N, P> {
    type Item = Edge;

    fn advance(&mut self, structure: &Structure) -> Result<Option<Edge>> {
        self.stamp.check(structure)?;
        while let Some(mut walk) = self.walk.take() {
            let Some((_, neighbour, id)) = walk.next_entry(structure, edges_out)? else {
                return Ok(None);
            };
            let edge = *structure.edge_record(id)?;
            let keep = (!self.undirected || structure.is_canonical(&edge))
                && (!self.visible_only || structure.require(neighbour)?.enabled);
            let accepted = keep && self.predicate.evaluate(&edge);
            self.walk = Some(walk);
            if accepted {
                return Ok(Some(edge));
            }
        }
        Ok(None)
    }
}

fn meta_is_canonical(structure: &Structure, meta: &MetaEdge) -> bool {
    match structure
        .node(meta.target)
        .and_then(|node| node.meta_out.get(meta.source))
    {
        Some(twin) => meta.id < twin,
        None => true,
    }
}

/// Meta-edges leaving every node the inner cursor yields.
pub struct MetaEdgeCursor<N> {
    walk: Option<OwnerWalk<N>>,
    undirected: bool,
    stamp: Stamp,
}

impl<N: Cursor<Item = NodeId>> MetaEdgeCursor<N> {
    pub fn new(structure: &Structure, owners: N, undirected: bool) -> Self {
        MetaEdgeCursor {
            walk: Some(OwnerWalk::new(owners)),
            undirected,
            stamp: Stamp::of(structure),
        }
    }
}

impl<N: Cursor<Item = NodeId>> Cursor for MetaEdgeCursor<N> {
    type Item = MetaEdge;

    fn advance(&mut self, structure: &Structure) -> Result<Option<MetaEdge>> {
        self.stamp.check(structure)?;
        while let Some(mut walk) = self.walk.take() {
            let Some((source, target, id)) = walk.next_entry(structure, meta_out)? else {
                return Ok(None);
            };
            let meta = structure
                .meta_edge(id)
                .ok_or(GraphError::MetaEdgeNotFound(source, target))?;
            self.walk = Some(walk);
            if !self.undirected || meta_is_canonical(structure, meta) {
                return Ok(Some(meta.clone()));
            }
        }
        Ok(None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Out,
    In,
}

/// Walks the outgoing then incoming tree of one node.
#[derive(Debug)]
struct IncidentWalk {
    owner: NodeId,
    direction: Direction,
    phase: Option<Phase>,
    after: Option<NodeId>,
    /// Out-neighbours already walked in `Both` mode, kept even if their
    /// edge has since been removed.
    walked_out: BTreeSet<NodeId>,
}

impl IncidentWalk {
    fn new(owner: NodeId, direction: Direction) -> Self {
        let phase = match direction {
            Direction::Incoming => Phase::In,
            Direction::Outgoing | Direction::Both => Phase::Out,
        };
        IncidentWalk {
            owner,
            direction,
            phase: Some(phase),
            after: None,
            walked_out: BTreeSet::new(),
        }
    }

    fn next_entry(&mut self, out: &AdjacencyTree, incoming: &AdjacencyTree) -> Option<(Phase, NodeId, EdgeId)> {
        loop {
            let phase = self.phase?;
            let tree = match phase {
                Phase::Out => out,
                Phase::In => incoming,
            };
            match tree.next_after(self.after) {
                Some((neighbour, id)) => {
                    self.after = Some(neighbour);
                    if phase == Phase::Out && self.direction == Direction::Both {
                        self.walked_out.insert(neighbour);
                    }
                    return Some((phase, neighbour, id));
                }
                None => {
                    self.after = None;
                    self.phase = match (phase, self.direction) {
                        (Phase::Out, Direction::Both) => Some(Phase::In),
                        _ => None,
                    };
                }
            }
        }
    }

    /// In `Both` mode an in-entry repeats something already reported when it
    /// is a self-loop or, for undirected traversals, the reverse of an
    /// out-entry walked earlier.
    fn repeats(&self, phase: Phase, neighbour: NodeId, undirected: bool) -> bool {
        self.direction == Direction::Both
            && phase == Phase::In
            && (neighbour == self.owner || (undirected && self.walked_out.contains(&neighbour)))
    }
}

/// Edges incident to one node. Supports removing the edge last returned;
/// iteration resumes after its key.
pub struct NodeEdgeCursor<P> {
    walk: Option<IncidentWalk>,
    predicate: P,
    undirected: bool,
    last: Option<EdgeId>,
    stamp: Stamp,
}

impl<P: EdgePredicate> NodeEdgeCursor<P> {
    pub fn new(structure: &Structure, node: NodeId, direction: Direction, undirected: bool, predicate: P) -> Result<Self> {
        structure.require_member(node)?;
        Ok(NodeEdgeCursor {
            walk: Some(IncidentWalk::new(node, direction)),
            predicate,
            undirected,
            last: None,
            stamp: Stamp::of(structure),
        })
    }
}

impl<P: EdgePredicate> Cursor for NodeEdgeCursor<P> {
    type Item = Edge;

    fn advance(&mut self, structure: &Structure) -> Result<Option<Edge>> {
        self.stamp.check(structure)?;
        while let Some(mut walk) = self.walk.take() {
            let node = structure.require(walk.owner)?;
            let Some((phase, neighbour, id)) = walk.next_entry(&node.edges_out, &node.edges_in) else {
                return Ok(None);
            };
            let edge = *structure.edge_record(id)?;
            let accepted = !walk.repeats(phase, neighbour, self.undirected)
                && self.predicate.evaluate(&edge);
            self.walk = Some(walk);
            if accepted {
                self.last = Some(id);
                return Ok(Some(edge));
            }
        }
        Ok(None)
    }

    fn remove(&mut self, structure: &mut Structure) -> Result<()> {
        self.stamp.check(structure)?;
        let id = self
            .last
            .take()
            .ok_or(GraphError::Unsupported("remove called without a current edge"))?;
        structure.remove_edge(id)?;
        self.stamp = Stamp::of(structure);
        Ok(())
    }
}

/// Meta-edges incident to one visible node.
pub struct NodeMetaEdgeCursor {
    walk: Option<IncidentWalk>,
    undirected: bool,
    stamp: Stamp,
}

impl NodeMetaEdgeCursor {
    pub fn new(structure: &Structure, node: NodeId, direction: Direction, undirected: bool) -> Result<Self> {
        structure.require_member(node)?;
        Ok(NodeMetaEdgeCursor {
            walk: Some(IncidentWalk::new(node, direction)),
            undirected,
            stamp: Stamp::of(structure),
        })
    }
}

impl Cursor for NodeMetaEdgeCursor {
    type Item = MetaEdge;

    fn advance(&mut self, structure: &Structure) -> Result<Option<MetaEdge>> {
        self.stamp.check(structure)?;
        while let Some(mut walk) = self.walk.take() {
            let node = structure.require(walk.owner)?;
            let Some((phase, neighbour, id)) = walk.next_entry(&node.meta_out, &node.meta_in) else {
                return Ok(None);
            };
            let repeated = walk.repeats(phase, neighbour, self.undirected);
            self.walk = Some(walk);
            if !repeated {
                let meta = structure
                    .meta_edge(id)
                    .ok_or(GraphError::MetaEdgeNotFound(node.id, neighbour))?;
                return Ok(Some(meta.clone()));
            }
        }
        Ok(None)
    }
}

/// Neighbours of one node, each reported once. Self-loops are skipped.
pub struct NeighborCursor<P> {
    owner: NodeId,
    edges: NodeEdgeCursor<crate::predicate::AcceptAll>,
    predicate: P,
    exhausted: bool,
}

impl<P: NodePredicate> NeighborCursor<P> {
    pub fn new(structure: &Structure, node: NodeId, direction: Direction, predicate: P) -> Result<Self> {
        Ok(NeighborCursor {
            owner: node,
            edges: NodeEdgeCursor::new(structure, node, direction, true, crate::predicate::AcceptAll)?,
            predicate,
            exhausted: false,
        })
    }
}

impl<P: NodePredicate> Cursor for NeighborCursor<P> {
    type Item = NodeId;

    fn advance(&mut self, structure: &Structure) -> Result<Option<NodeId>> {
        while !self.exhausted {
            let Some(edge) = self.edges.advance(structure)? else {
                self.exhausted = true;
                break;
            };
            if edge.is_self_loop() {
                continue;
            }
            let neighbour = edge
                .opposite(self.owner)
                .ok_or_else(|| GraphError::Corrupted(format!("{} is not incident to {}", edge.id, self.owner)))?;
            self.exhausted = true;
            let accepted = self.predicate.evaluate(structure.require(neighbour)?);
            self.exhausted = false;
            if accepted {
                return Ok(Some(neighbour));
            }
        }
        Ok(None)
    }

    /// Removes the edge that led to the neighbour last returned.
    fn remove(&mut self, structure: &mut Structure) -> Result<()> {
        self.edges.remove(structure)
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::predicate::AcceptAll;
    use crate::test_utils::{clustered, descendant_scenario, new_structure, three_levels};

    #[test]
    fn test_descendant_and_self_scenario() {
        let fixture = descendant_scenario();
        let s = &fixture.structure;

        let mut cursor = DescendantCursor::new(s, fixture.x, true, AcceptAll).unwrap();
        let mut found = cursor.collect_all(s).unwrap();
        found.sort();
        let mut expected = vec![fixture.x, fixture.x1, fixture.x2];
        expected.sort();
        assert_eq!(found, expected);
        assert_eq!(s.node(fixture.x).unwrap().size(), 2);

        let mut strict = DescendantCursor::new(s, fixture.x, false, AcceptAll).unwrap();
        assert_eq!(strict.collect_all(s).unwrap(), vec![fixture.x1, fixture.x2]);
    }

    #[test]
    fn test_all_nodes_skips_virtual_root() {
        let fixture = descendant_scenario();
        let s = &fixture.structure;
        let mut cursor = DescendantCursor::all(s, AcceptAll);
        let all = cursor.collect_all(s).unwrap();
        assert_eq!(all, vec![fixture.x, fixture.x1, fixture.x2, fixture.y]);

        let mut from_root = DescendantCursor::new(s, NodeId::ROOT, true, AcceptAll).unwrap();
        assert_eq!(from_root.collect_all(s).unwrap(), all);
    }

    #[test]
    fn test_children_in_document_order() {
        let fixture = descendant_scenario();
        let s = &fixture.structure;
        let mut cursor = ChildrenCursor::new(s, NodeId::ROOT, AcceptAll).unwrap();
        assert_eq!(cursor.collect_all(s).unwrap(), vec![fixture.x, fixture.y]);
    }

    #[test]
    fn test_level_cursor_skips_rejected_subtree() {
        let fixture = three_levels();
        let s = &fixture.structure;
        let visits = AtomicUsize::new(0);
        let rejected = fixture.left;
        let predicate = |node: &Node| {
            visits.fetch_add(1, Ordering::Relaxed);
            node.id() != rejected
        };

        let mut cursor = LevelCursor::new(s, 2, predicate);
        let found = cursor.collect_all(s).unwrap();
        assert_eq!(found, fixture.right_children);
        // left, right and the level-2 children of right; nothing below left.
        assert_eq!(visits.load(Ordering::Relaxed), 2 + fixture.right_children.len());
    }

    #[test]
    fn test_undirected_edges_reported_once() {
        let mut s = new_structure();
        let a = s.add_node(None).unwrap();
        let b = s.add_node(None).unwrap();
        let ab = s.add_edge(a, b, 1.0, true).unwrap();
        let ba = s.add_edge(b, a, 1.0, true).unwrap();

        let mut directed = EdgeCursor::new(&s, DescendantCursor::all(&s, AcceptAll), false, AcceptAll);
        let ids: Vec<EdgeId> = directed.collect_all(&s).unwrap().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![ab, ba]);

        let mut undirected = EdgeCursor::new(&s, DescendantCursor::all(&s, AcceptAll), true, AcceptAll);
        let ids: Vec<EdgeId> = undirected.collect_all(&s).unwrap().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![ab]);
    }

    #[test]
    fn test_edge_predicate_filters() {
        let mut s = new_structure();
        let a = s.add_node(None).unwrap();
        let b = s.add_node(None).unwrap();
        let c = s.add_node(None).unwrap();
        s.add_edge(a, b, 1.0, true).unwrap();
        let heavy = s.add_edge(a, c, 5.0, true).unwrap();

        let mut cursor = EdgeCursor::new(&s, DescendantCursor::all(&s, AcceptAll), false, |e: &Edge| e.weight > 2.0);
        let found = cursor.collect_all(&s).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, heavy);
    }

    #[test]
    fn test_visible_edges_ignore_hidden_endpoints() {
        let fixture = clustered();
        let s = &fixture.structure;
        let mut cursor = EdgeCursor::visible(s, false, AcceptAll);
        assert!(cursor.collect_all(s).unwrap().is_empty());

        let mut metas = MetaEdgeCursor::new(s, DescendantCursor::all(s, Visible), false);
        let metas = metas.collect_all(s).unwrap();
        assert_eq!(metas.len(), 1);
        assert_eq!((metas[0].source, metas[0].target), (fixture.a, fixture.b));
    }

    #[test]
    fn test_node_meta_edges_both_directions() {
        let fixture = clustered();
        let s = &fixture.structure;
        let mut into_b = NodeMetaEdgeCursor::new(s, fixture.b, Direction::Incoming, false).unwrap();
        assert_eq!(into_b.collect_all(s).unwrap().len(), 1);
        let mut out_of_b = NodeMetaEdgeCursor::new(s, fixture.b, Direction::Outgoing, false).unwrap();
        assert!(out_of_b.collect_all(s).unwrap().is_empty());
    }

    #[test]
    fn test_node_edges_both_skips_self_loop_repeat() {
        let mut s = new_structure();
        let a = s.add_node(None).unwrap();
        let b = s.add_node(None).unwrap();
        s.add_edge(a, a, 1.0, true).unwrap();
        s.add_edge(a, b, 1.0, true).unwrap();
        s.add_edge(b, a, 1.0, true).unwrap();

        let mut directed = NodeEdgeCursor::new(&s, a, Direction::Both, false, AcceptAll).unwrap();
        assert_eq!(directed.collect_all(&s).unwrap().len(), 3);
        let mut undirected = NodeEdgeCursor::new(&s, a, Direction::Both, true, AcceptAll).unwrap();
        assert_eq!(undirected.collect_all(&s).unwrap().len(), 2);
    }

    #[test]
    fn test_remove_during_iteration() {
        let mut s = new_structure();
        let a = s.add_node(None).unwrap();
        let targets: Vec<NodeId> = (0..4).map(|_| s.add_node(None).unwrap()).collect();
        for t in &targets {
            s.add_edge(a, *t, 1.0, true).unwrap();
        }

        let mut cursor = NodeEdgeCursor::new(&s, a, Direction::Outgoing, false, AcceptAll).unwrap();
        let mut seen = Vec::new();
        while let Some(edge) = cursor.advance(&s).unwrap() {
            seen.push(edge.target);
            if edge.target == targets[1] || edge.target == targets[2] {
                cursor.remove(&mut s).unwrap();
            }
        }
        assert_eq!(seen, targets);
        assert_eq!(s.out_degree(a).unwrap(), 2);
        assert!(s.edge_between(a, targets[1]).is_none());
        s.validate().unwrap();
    }

    #[test]
    fn test_remove_unsupported_and_without_current() {
        let fixture = descendant_scenario();
        let mut s = fixture.structure;
        let mut cursor = DescendantCursor::all(&s, AcceptAll);
        cursor.advance(&s).unwrap();
        assert!(matches!(cursor.remove(&mut s), Err(GraphError::Unsupported(_))));

        let mut edges = NodeEdgeCursor::new(&s, fixture.x, Direction::Both, false, AcceptAll).unwrap();
        assert!(matches!(edges.remove(&mut s), Err(GraphError::Unsupported(_))));
    }

    #[test]
    fn test_neighbors_skip_self_loops_and_delegate_remove() {
        let mut s = new_structure();
        let a = s.add_node(None).unwrap();
        let b = s.add_node(None).unwrap();
        let c = s.add_node(None).unwrap();
        s.add_edge(a, a, 1.0, true).unwrap();
        s.add_edge(a, b, 1.0, true).unwrap();
        s.add_edge(b, a, 1.0, true).unwrap();
        s.add_edge(c, a, 1.0, true).unwrap();

        let mut cursor = NeighborCursor::new(&s, a, Direction::Both, AcceptAll).unwrap();
        assert_eq!(cursor.collect_all(&s).unwrap(), vec![b, c]);

        let mut cursor = NeighborCursor::new(&s, a, Direction::Incoming, AcceptAll).unwrap();
        assert_eq!(cursor.advance(&s).unwrap(), Some(b));
        cursor.remove(&mut s).unwrap();
        assert_eq!(cursor.advance(&s).unwrap(), Some(c));
        assert_eq!(cursor.advance(&s).unwrap(), None);
        assert!(s.edge_between(b, a).is_none());
        assert!(s.edge_between(a, b).is_some());
        s.validate().unwrap();
    }

    #[test]
    fn test_neighbour_reported_once_after_removing_out_edge() {
        let mut s = new_structure();
        let a = s.add_node(None).unwrap();
        let b = s.add_node(None).unwrap();
        s.add_edge(a, b, 1.0, true).unwrap();
        s.add_edge(b, a, 1.0, true).unwrap();

        let mut cursor = NeighborCursor::new(&s, a, Direction::Both, AcceptAll).unwrap();
        assert_eq!(cursor.advance(&s).unwrap(), Some(b));
        cursor.remove(&mut s).unwrap();
        assert_eq!(cursor.advance(&s).unwrap(), None);

        assert!(s.edge_between(a, b).is_none());
        assert!(s.edge_between(b, a).is_some());
        s.validate().unwrap();
    }

    #[test]
    fn test_fail_fast_after_weight_change() {
        let mut s = new_structure();
        let a = s.add_node(None).unwrap();
        let b = s.add_node(None).unwrap();
        let c = s.add_node(None).unwrap();
        s.add_edge(a, b, 1.0, true).unwrap();
        let bc = s.add_edge(b, c, 2.0, true).unwrap();

        let mut cursor = EdgeCursor::new(&s, DescendantCursor::all(&s, AcceptAll), false, AcceptAll);
        assert!(cursor.advance(&s).unwrap().is_some());

        let before = s.generation();
        s.set_edge_weight(bc, 99.0).unwrap();
        assert_eq!(s.generation(), before + 1);
        let err = cursor.advance(&s).unwrap_err();
        assert!(matches!(err, GraphError::ConcurrentModification { .. }));
    }

    #[test]
    fn test_fail_fast_after_mutation() {
        let fixture = descendant_scenario();
        let mut s = fixture.structure;
        let mut cursor = DescendantCursor::all(&s, AcceptAll);
        cursor.advance(&s).unwrap();

        s.add_node(None).unwrap();
        let err = cursor.advance(&s).unwrap_err();
        assert!(matches!(err, GraphError::ConcurrentModification { .. }));
    }

    #[test]
    fn test_fail_fast_can_be_disabled() {
        let fixture = descendant_scenario();
        let mut s = fixture.structure;
        s.config.fail_fast = false;
        let mut cursor = DescendantCursor::all(&s, AcceptAll);
        cursor.advance(&s).unwrap();
        s.add_node(None).unwrap();
        assert!(cursor.advance(&s).is_ok());
    }

    #[test]
    fn test_cursor_rejects_other_view() {
        let fixture = descendant_scenario();
        let s = &fixture.structure;
        let other = s.fork(ViewId(9));
        let mut cursor = DescendantCursor::all(s, AcceptAll);
        assert!(matches!(cursor.advance(&other), Err(GraphError::ViewMismatch { .. })));
    }

    #[test]
    fn test_panicking_predicate_leaves_cursor_exhausted() {
        let fixture = descendant_scenario();
        let s = &fixture.structure;
        let mut cursor = DescendantCursor::all(s, |_: &Node| -> bool { panic!("predicate failed") });

        let outcome = catch_unwind(AssertUnwindSafe(|| cursor.advance(s)));
        assert!(outcome.is_err());
        assert_eq!(cursor.advance(s).unwrap(), None);
    }
}
