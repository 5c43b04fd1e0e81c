//! Clusters, visibility and incremental meta-edge maintenance
//!
//! Visibility is a cut through the hierarchy: every root-to-leaf path holds
//! exactly one enabled node. A collapsed cluster is an enabled node with
//! children; an expanded one is disabled and its children carry the cut.
//!
//! An edge whose endpoints are both enabled is a plain visible edge. Any
//! other edge whose nearest enabled ancestors differ is summarised by the
//! meta-edge between those ancestors. Structural changes detach the
//! contributions of the edges incident to the affected subtree, change the
//! structure and attach them again, so the work is proportional to those
//! edges rather than to the whole graph.

use std::collections::BTreeSet;

use tracing::{debug, trace};

use crate::error::{GraphError, Result};
use crate::model::{EdgeId, MetaEdge, NodeId};
use crate::structure::{Structure, corrupted};

impl Structure {
    /// The enabled ancestor-or-self of `id`; `None` for nodes of an
    /// expanded region and for the virtual root.
    pub fn visible_ancestor(&self, id: NodeId) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(at) = current.filter(|n| !n.is_root()) {
            let node = self.nodes.get(&at)?;
            if node.enabled {
                return Some(at);
            }
            current = node.parent;
        }
        None
    }

    /// Whether a strict ancestor of `id` is a collapsed cluster.
    pub fn is_hidden(&self, id: NodeId) -> bool {
        self.has_hidden_context(id)
    }

    /// Group sibling nodes under a new cluster placed at the position of the
    /// first member. In a visible region the cluster comes up collapsed.
    pub fn group(&mut self, members: &[NodeId]) -> Result<NodeId> {
        let Some(&first) = members.first() else {
            return Err(GraphError::InvalidHierarchy("cannot group an empty set".to_string()));
        };
        let unique: BTreeSet<NodeId> = members.iter().copied().collect();
        if unique.len() != members.len() {
            return Err(GraphError::InvalidHierarchy("a node is listed twice".to_string()));
        }
        let parent = self.require_member(first)?.parent.unwrap_or(NodeId::ROOT);
        let mut ordered = Vec::with_capacity(members.len());
        for id in members {
            let node = self.require_member(*id)?;
            if node.parent.unwrap_or(NodeId::ROOT) != parent {
                return Err(GraphError::InvalidHierarchy(format!(
                    "{} and {} do not share a parent",
                    first, id
                )));
            }
            ordered.push((self.pre_of(node), *id));
        }
        ordered.sort_unstable();

        let hidden = self.visible_ancestor(parent).is_some();
        let mut covered = Vec::new();
        for (_, id) in &ordered {
            covered.extend(self.subtree(*id)?);
        }
        let affected = self.incident_edges(&covered);

        self.detach_meta_all(&affected)?;
        let cluster = self.ids.next_node();
        self.insert_node_at(cluster, parent, ordered[0].0)?;
        for (_, id) in &ordered {
            self.relocate(*id, cluster, None)?;
        }
        if !hidden {
            for id in &covered {
                self.node_mut(*id)?.enabled = false;
            }
            self.node_mut(cluster)?.enabled = true;
        }
        self.attach_meta_all(&affected)?;
        self.bump();

        debug!("Grouped {} nodes under cluster {}", ordered.len(), cluster);
        Ok(cluster)
    }

    /// Dissolve a cluster: its children take its place under its parent and
    /// the cluster node is removed together with its own edges. Children of a
    /// collapsed cluster become visible.
    pub fn ungroup(&mut self, cluster: NodeId) -> Result<Vec<NodeId>> {
        let node = self.require_member(cluster)?;
        if node.is_leaf() {
            return Err(GraphError::InvalidHierarchy(format!("{} has no children", cluster)));
        }
        let parent = node.parent.unwrap_or(NodeId::ROOT);
        let collapsed = node.enabled;
        let children = self.children(cluster)?;
        let mut affected = self.incident_edges(&self.subtree(cluster)?);
        let own = self.incident_edges(&[cluster]);

        self.detach_meta_all(&affected)?;
        for edge in &own {
            self.unlink_edge(*edge)?;
            affected.remove(edge);
        }
        for child in &children {
            self.relocate(*child, parent, Some(cluster))?;
            if collapsed {
                self.node_mut(*child)?.enabled = true;
            }
        }
        self.detach_range(cluster)?;
        self.nodes.remove(&cluster);
        self.attach_meta_all(&affected)?;
        self.bump();

        debug!("Ungrouped cluster {} into {} children", cluster, children.len());
        Ok(children)
    }

    /// Open a collapsed cluster: it hides and its children become visible.
    pub fn expand(&mut self, id: NodeId) -> Result<()> {
        let node = self.require_member(id)?;
        if !node.enabled {
            return Err(GraphError::InvalidHierarchy(format!("{} is not a visible cluster", id)));
        }
        if node.is_leaf() {
            return Err(GraphError::InvalidHierarchy(format!("{} has no children", id)));
        }
        let children = self.children(id)?;
        let affected = self.incident_edges(&self.subtree(id)?);

        self.detach_meta_all(&affected)?;
        self.node_mut(id)?.enabled = false;
        for child in &children {
            self.node_mut(*child)?.enabled = true;
        }
        self.attach_meta_all(&affected)?;
        self.bump();

        debug!("Expanded {} into {} children", id, children.len());
        Ok(())
    }

    /// Collapse `id`: its whole subtree hides behind it.
    pub fn retract(&mut self, id: NodeId) -> Result<()> {
        let node = self.require_member(id)?;
        if node.is_leaf() {
            return Err(GraphError::InvalidHierarchy(format!("{} has no children", id)));
        }
        if node.enabled {
            return Err(GraphError::InvalidHierarchy(format!("{} is already collapsed", id)));
        }
        if self.has_hidden_context(id) {
            return Err(GraphError::InvalidHierarchy(format!("{} is inside a collapsed cluster", id)));
        }
        let members = self.subtree(id)?;
        let affected = self.incident_edges(&members);

        self.detach_meta_all(&affected)?;
        for member in &members {
            self.node_mut(*member)?.enabled = *member == id;
        }
        self.attach_meta_all(&affected)?;
        self.bump();

        debug!("Retracted {} over {} descendants", id, members.len() - 1);
        Ok(())
    }

    pub fn meta_edge(&self, id: EdgeId) -> Option<&MetaEdge> {
        self.meta_edges.get(&id)
    }

    /// The meta-edge `source -> target` between two visible nodes.
    pub fn meta_edge_between(&self, source: NodeId, target: NodeId) -> Option<&MetaEdge> {
        let id = self.nodes.get(&source)?.meta_out.get(target)?;
        self.meta_edges.get(&id)
    }

    /// The meta-edge linking `a` and `b` in either direction, preferring `a -> b`.
    pub fn meta_edge_linking(&self, a: NodeId, b: NodeId) -> Option<&MetaEdge> {
        self.meta_edge_between(a, b).or_else(|| self.meta_edge_between(b, a))
    }

    pub fn meta_degree(&self, id: NodeId) -> Result<usize> {
        let node = self.require_member(id)?;
        Ok(node.meta_out.len() + node.meta_in.len())
    }

    pub fn meta_edge_count(&self) -> usize {
        self.meta_edges.len()
    }

    /// Throw away every meta-edge and aggregate again from the edge set.
    pub fn rebuild_meta_edges(&mut self) -> Result<()> {
        self.meta_edges.clear();
        for node in self.nodes.values_mut() {
            node.meta_out = Default::default();
            node.meta_in = Default::default();
        }
        for edge in self.edges.values_mut() {
            edge.meta = None;
        }
        let mut ids: Vec<EdgeId> = self.edges.keys().copied().collect();
        ids.sort_unstable();
        for id in ids {
            self.attach_meta(id)?;
        }
        self.bump();
        debug!("Rebuilt {} meta-edges", self.meta_edges.len());
        Ok(())
    }

    pub(crate) fn has_hidden_context(&self, id: NodeId) -> bool {
        self.nodes
            .get(&id)
            .and_then(|node| node.parent)
            .is_some_and(|parent| self.visible_ancestor(parent).is_some())
    }

    /// A leaf left behind in a visible region takes over the cut.
    pub(crate) fn restore_cut(&mut self, id: NodeId) -> Result<()> {
        if id.is_root() {
            return Ok(());
        }
        let node = self.require(id)?;
        if node.is_leaf() && !node.enabled && self.visible_ancestor(id).is_none() {
            self.node_mut(id)?.enabled = true;
        }
        Ok(())
    }

    /// Endpoints of the meta-edge that should summarise `id`, if any.
    fn meta_endpoints(&self, id: EdgeId) -> Result<Option<(NodeId, NodeId)>> {
        let edge = self.edge_record(id)?;
        let (Some(from), Some(to)) = (
            self.visible_ancestor(edge.source),
            self.visible_ancestor(edge.target),
        ) else {
            return Ok(None);
        };
        if from == to || (from == edge.source && to == edge.target) {
            return Ok(None);
        }
        Ok(Some((from, to)))
    }

    pub(crate) fn attach_meta(&mut self, id: EdgeId) -> Result<()> {
        let Some((from, to)) = self.meta_endpoints(id)? else {
            return Ok(());
        };
        let existing = self.require(from)?.meta_out.get(to);
        let meta_id = match existing {
            Some(existing) => existing,
            None => {
                let created = self.ids.next_edge();
                self.meta_edges
                    .insert(created, MetaEdge::new(created, from, to, self.view));
                self.node_mut(from)?.meta_out.insert(to, created);
                self.node_mut(to)?.meta_in.insert(from, created);
                trace!("Created meta-edge {} {} -> {}", created, from, to);
                created
            }
        };

        let edge = self
            .edges
            .get_mut(&id)
            .ok_or(GraphError::EdgeNotFound(id))?;
        edge.meta = Some(meta_id);
        let meta = self
            .meta_edges
            .get_mut(&meta_id)
            .ok_or_else(|| corrupted(format!("meta-edge {} vanished", meta_id)))?;
        meta.edges.insert(id);
        meta.weight += edge.weight;
        Ok(())
    }

    pub(crate) fn detach_meta(&mut self, id: EdgeId) -> Result<()> {
        let edge = self
            .edges
            .get_mut(&id)
            .ok_or(GraphError::EdgeNotFound(id))?;
        let Some(meta_id) = edge.meta.take() else {
            return Ok(());
        };
        let meta = self
            .meta_edges
            .get_mut(&meta_id)
            .ok_or_else(|| corrupted(format!("{} points at a missing meta-edge", id)))?;
        meta.edges.remove(&id);
        meta.weight -= edge.weight;
        if !meta.edges.is_empty() {
            return Ok(());
        }

        let (from, to) = (meta.source, meta.target);
        self.meta_edges.remove(&meta_id);
        self.node_mut(from)?.meta_out.remove(to);
        self.node_mut(to)?.meta_in.remove(from);
        trace!("Dropped meta-edge {} {} -> {}", meta_id, from, to);
        Ok(())
    }

    pub(crate) fn detach_meta_all(&mut self, edges: &BTreeSet<EdgeId>) -> Result<()> {
        for id in edges {
            self.detach_meta(*id)?;
        }
        Ok(())
    }

    /// Edges removed since the matching detach are skipped.
    pub(crate) fn attach_meta_all(&mut self, edges: &BTreeSet<EdgeId>) -> Result<()> {
        for id in edges {
            if self.edges.contains_key(id) {
                self.attach_meta(*id)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{clustered, new_structure};

    #[test]
    fn test_group_collapses_and_aggregates() {
        let mut s = new_structure();
        let a1 = s.add_node(None).unwrap();
        let a2 = s.add_node(None).unwrap();
        let b1 = s.add_node(None).unwrap();
        let e1 = s.add_edge(a1, b1, 1.5, true).unwrap();

        let a = s.group(&[a1, a2]).unwrap();
        let b = s.group(&[b1]).unwrap();

        let meta = s.meta_edge_between(a, b).unwrap();
        assert_eq!(meta.edges.iter().copied().collect::<Vec<_>>(), vec![e1]);
        assert_eq!(meta.weight, 1.5);

        let e2 = s.add_edge(a2, b1, 2.0, true).unwrap();
        let meta = s.meta_edge_between(a, b).unwrap();
        assert_eq!(meta.count(), 2);
        assert!(meta.edges.contains(&e2));
        assert_eq!(meta.weight, 3.5);
        assert_eq!(s.meta_edge_count(), 1);
        s.validate().unwrap();
    }

    #[test]
    fn test_group_places_cluster_at_first_member() {
        let mut s = new_structure();
        let x = s.add_node(None).unwrap();
        let a = s.add_node(None).unwrap();
        let b = s.add_node(None).unwrap();
        let y = s.add_node(None).unwrap();

        let cluster = s.group(&[b, a]).unwrap();
        assert_eq!(s.pre(x), Some(1));
        assert_eq!(s.pre(cluster), Some(2));
        assert_eq!(s.children(cluster).unwrap(), vec![a, b]);
        assert_eq!(s.pre(y), Some(5));
        s.validate().unwrap();
    }

    #[test]
    fn test_group_requires_siblings() {
        let mut s = new_structure();
        let a = s.add_node(None).unwrap();
        let a1 = s.add_node(Some(a)).unwrap();
        let b = s.add_node(None).unwrap();

        assert!(matches!(s.group(&[a1, b]), Err(GraphError::InvalidHierarchy(_))));
        assert!(matches!(s.group(&[b, b]), Err(GraphError::InvalidHierarchy(_))));
        assert!(matches!(s.group(&[]), Err(GraphError::InvalidHierarchy(_))));
        assert_eq!(s.node_count(), 3);
        s.validate().unwrap();
    }

    #[test]
    fn test_ungroup_restores_flat_view() {
        let fixture = clustered();
        let mut s = fixture.structure;

        let children = s.ungroup(fixture.a).unwrap();
        assert_eq!(children, vec![fixture.a1, fixture.a2]);
        assert!(!s.contains_node(fixture.a));
        assert!(s.node(fixture.a1).unwrap().is_enabled());
        assert!(s.meta_edge_between(fixture.a1, fixture.b).is_some());
        assert!(s.meta_edge_between(fixture.a, fixture.b).is_none());
        s.validate().unwrap();
    }

    #[test]
    fn test_expand_and_retract_move_meta_edges() {
        let fixture = clustered();
        let mut s = fixture.structure;

        s.expand(fixture.b).unwrap();
        let meta = s.meta_edge_between(fixture.a, fixture.b1).unwrap();
        assert_eq!(meta.count(), 2);
        assert!(s.meta_edge_between(fixture.a, fixture.b).is_none());
        s.validate().unwrap();

        s.expand(fixture.a).unwrap();
        // Every endpoint is visible: plain edges, no meta-edges left.
        assert_eq!(s.meta_edge_count(), 0);
        s.validate().unwrap();

        s.retract(fixture.a).unwrap();
        s.retract(fixture.b).unwrap();
        assert_eq!(s.meta_edge_between(fixture.a, fixture.b).unwrap().count(), 2);
        s.validate().unwrap();
    }

    #[test]
    fn test_retract_rejects_hidden_nodes() {
        let mut s = new_structure();
        let a = s.add_node(None).unwrap();
        let a1 = s.add_node(Some(a)).unwrap();
        s.add_node(Some(a1)).unwrap();

        assert!(matches!(s.retract(a1), Err(GraphError::InvalidHierarchy(_))));
        assert!(matches!(s.retract(a), Err(GraphError::InvalidHierarchy(_))));
    }

    #[test]
    fn test_removing_last_child_reenables_parent() {
        let mut s = new_structure();
        let a = s.add_node(None).unwrap();
        let a1 = s.add_node(Some(a)).unwrap();
        let b = s.add_node(None).unwrap();
        s.add_edge(a, b, 1.0, true).unwrap();
        s.expand(a).unwrap();

        s.remove_node(a1).unwrap();
        assert!(s.node(a).unwrap().is_enabled());
        assert_eq!(s.meta_edge_count(), 0);
        s.validate().unwrap();
    }

    #[test]
    fn test_internal_edges_have_no_meta_edge() {
        let mut s = new_structure();
        let a1 = s.add_node(None).unwrap();
        let a2 = s.add_node(None).unwrap();
        let e = s.add_edge(a1, a2, 1.0, true).unwrap();
        s.group(&[a1, a2]).unwrap();

        assert_eq!(s.meta_edge_count(), 0);
        assert_eq!(s.edge(e).unwrap().meta_edge(), None);
        s.validate().unwrap();
    }

    #[test]
    fn test_weight_change_reaches_meta_edge() {
        let fixture = clustered();
        let mut s = fixture.structure;
        s.set_edge_weight(fixture.a1_b1, 10.0).unwrap();

        let meta = s.meta_edge_between(fixture.a, fixture.b).unwrap();
        assert_eq!(meta.weight, 12.0);
        s.validate().unwrap();
    }

    #[test]
    fn test_meta_edge_linking_either_direction() {
        let fixture = clustered();
        let s = &fixture.structure;

        let forward = s.meta_edge_linking(fixture.a, fixture.b).unwrap();
        assert_eq!((forward.source, forward.target), (fixture.a, fixture.b));
        let reverse = s.meta_edge_linking(fixture.b, fixture.a).unwrap();
        assert_eq!(reverse.id, forward.id);
        assert!(s.meta_edge_between(fixture.b, fixture.a).is_none());
    }

    #[test]
    fn test_rebuild_matches_incremental_state() {
        let fixture = clustered();
        let mut s = fixture.structure;
        let before = s.meta_edge_between(fixture.a, fixture.b).unwrap().edges.clone();

        s.rebuild_meta_edges().unwrap();
        assert_eq!(s.meta_edge_between(fixture.a, fixture.b).unwrap().edges, before);
        s.validate().unwrap();
    }
}
