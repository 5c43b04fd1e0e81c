//! Edge insertion, removal and lookup

use tracing::debug;

use crate::error::{GraphError, Result};
use crate::model::{Edge, EdgeId, NodeId};
use crate::structure::{Structure, corrupted};

impl Structure {
    /// Add an edge `source -> target`.
    ///
    /// Fails with [`GraphError::DuplicateEdge`] when the ordered pair is
    /// already connected, or when either this edge or the reverse one is
    /// undirected and the reverse pair is connected. Both endpoint indexes are
    /// checked before either is touched.
    pub fn add_edge(&mut self, source: NodeId, target: NodeId, weight: f64, directed: bool) -> Result<EdgeId> {
        let from = self.require_member(source)?;
        let to = self.require_member(target)?;
        if source == target && !self.config.allow_self_loops {
            return Err(GraphError::SelfLoopRejected(source));
        }
        let duplicate = GraphError::DuplicateEdge {
            from: source,
            to: target,
            view: self.view,
        };
        if from.edges_out.has_neighbour(target) {
            return Err(duplicate);
        }
        if source != target {
            if let Some(reverse) = to.edges_out.get(source) {
                if !directed || !self.edge_record(reverse)?.directed {
                    return Err(duplicate);
                }
            }
        }

        let id = self.ids.next_edge();
        self.edges.insert(
            id,
            Edge {
                id,
                source,
                target,
                weight,
                directed,
                view: self.view,
                meta: None,
            },
        );
        self.node_mut(source)?.edges_out.insert(target, id);
        self.node_mut(target)?.edges_in.insert(source, id);
        self.attach_meta(id)?;
        self.bump();

        debug!("Added edge {} {} -> {} (weight {})", id, source, target, weight);
        Ok(id)
    }

    pub fn remove_edge(&mut self, id: EdgeId) -> Result<Edge> {
        self.edge_record(id)?;
        self.detach_meta(id)?;
        let edge = self.unlink_edge(id)?;
        self.bump();
        debug!("Removed edge {} {} -> {}", id, edge.source, edge.target);
        Ok(edge)
    }

    /// Change the weight of an edge and of the meta-edge summarising it.
    pub fn set_edge_weight(&mut self, id: EdgeId, weight: f64) -> Result<()> {
        let edge = self.edges.get_mut(&id).ok_or(GraphError::EdgeNotFound(id))?;
        let delta = weight - edge.weight;
        edge.weight = weight;
        if let Some(meta) = edge.meta {
            let meta = self
                .meta_edges
                .get_mut(&meta)
                .ok_or_else(|| corrupted(format!("{} points at a missing meta-edge", id)))?;
            meta.weight += delta;
        }
        self.bump();
        Ok(())
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    /// The edge stored for the ordered pair `source -> target`.
    pub fn edge_between(&self, source: NodeId, target: NodeId) -> Option<&Edge> {
        let id = self.nodes.get(&source)?.edges_out.get(target)?;
        self.edges.get(&id)
    }

    /// The edge linking `a` and `b` in either direction, preferring `a -> b`.
    pub fn edge_linking(&self, a: NodeId, b: NodeId) -> Option<&Edge> {
        self.edge_between(a, b).or_else(|| self.edge_between(b, a))
    }

    /// The reverse edge `target -> source`, if any. Self-loops have no twin.
    pub fn undirected_twin(&self, id: EdgeId) -> Option<EdgeId> {
        let edge = self.edges.get(&id)?;
        if edge.is_self_loop() {
            return None;
        }
        self.nodes.get(&edge.target)?.edges_out.get(edge.source)
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Incoming plus outgoing edges; a self-loop counts twice.
    pub fn degree(&self, id: NodeId) -> Result<usize> {
        let node = self.require_member(id)?;
        Ok(node.edges_out.len() + node.edges_in.len())
    }

    pub fn in_degree(&self, id: NodeId) -> Result<usize> {
        Ok(self.require_member(id)?.edges_in.len())
    }

    pub fn out_degree(&self, id: NodeId) -> Result<usize> {
        Ok(self.require_member(id)?.edges_out.len())
    }

    /// Whether an undirected traversal reports `edge`: a mutual pair is
    /// reported through the member with the lower id.
    pub(crate) fn is_canonical(&self, edge: &Edge) -> bool {
        match self.undirected_twin(edge.id) {
            Some(twin) => edge.id < twin,
            None => true,
        }
    }

    pub(crate) fn edge_record(&self, id: EdgeId) -> Result<&Edge> {
        self.edges.get(&id).ok_or(GraphError::EdgeNotFound(id))
    }

    /// Drop an edge from both adjacency indexes. Meta-edge bookkeeping is the
    /// caller's job.
    pub(crate) fn unlink_edge(&mut self, id: EdgeId) -> Result<Edge> {
        let edge = self.edges.remove(&id).ok_or(GraphError::EdgeNotFound(id))?;
        if let Some(source) = self.nodes.get_mut(&edge.source) {
            source.edges_out.remove(edge.target);
        }
        if let Some(target) = self.nodes.get_mut(&edge.target) {
            target.edges_in.remove(edge.source);
        }
        Ok(edge)
    }
}
