//! Bidirected repeat graph with complement pairing.
//!
//! Every edge has a reverse-complement twin reachable through
//! [`RepeatGraph::complement_edge`]; a self-complement (palindromic) edge is
//! its own twin. Nodes live in an arena and are never removed, only added;
//! edges are created in strand pairs and only ever removed. All structural
//! mutations must be mirrored on the complement strand, and
//! [`RepeatGraph::check_symmetry`] verifies that between passes.

use ahash::AHashMap;

use crate::utils::configuration::PipelineError;

/// Edge identifier with a strand bit in the lowest position.
///
/// Forward/complement ids differ only in that bit, so `rc()` is an
/// involution and a pair shares the same printable id with opposite signs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(u64);

impl EdgeId {
    /// The reverse-complement twin of this id.
    #[inline]
    pub fn rc(self) -> Self {
        EdgeId(self.0 ^ 1)
    }

    /// True for the forward (positive) strand of the pair.
    #[inline]
    pub fn strand(self) -> bool {
        self.0 & 1 == 0
    }

    /// Fresh strand-paired id from a pair index. Also used for extracted
    /// path ids, which live in their own namespace.
    pub(crate) fn from_pair(pair: u64, forward: bool) -> Self {
        let id = EdgeId(pair << 1);
        if forward {
            id
        } else {
            id.rc()
        }
    }

    /// Printable form: `+k` for forward strand, `-k` for complement.
    pub fn signed_id(self) -> i64 {
        let base = (self.0 >> 1) as i64 + 1;
        if self.strand() {
            base
        } else {
            -base
        }
    }
}

/// Index into the node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Adjacency lists of non-owning edge references.
#[derive(Debug, Default, Clone)]
pub struct GraphNode {
    pub in_edges: Vec<EdgeId>,
    pub out_edges: Vec<EdgeId>,
}

impl GraphNode {
    /// A graph endpoint: at most one incident edge in total.
    pub fn is_end(&self) -> bool {
        self.in_edges.len() + self.out_edges.len() <= 1
    }

    /// More than one edge on either side.
    pub fn is_bifurcation(&self) -> bool {
        self.out_edges.len() > 1 || self.in_edges.len() > 1
    }
}

/// A directed edge of the bidirected graph.
#[derive(Debug, Clone)]
pub struct GraphEdge {
    pub id: EdgeId,
    pub node_left: NodeId,
    pub node_right: NodeId,
    pub length: i64,
    pub mean_coverage: i64,
    pub self_complement: bool,
}

impl GraphEdge {
    pub fn is_looped(&self) -> bool {
        self.node_left == self.node_right
    }
}

/// Arena-backed bidirected graph. Owns all nodes and edges; everything else
/// refers to them by id.
#[derive(Debug, Default)]
pub struct RepeatGraph {
    nodes: Vec<GraphNode>,
    edges: AHashMap<EdgeId, GraphEdge>,
    next_edge_pair: u64,
}

impl RepeatGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self) -> NodeId {
        self.nodes.push(GraphNode::default());
        NodeId(self.nodes.len() - 1)
    }

    /// Create a forward/complement edge pair. The forward edge runs
    /// `left -> right`, its twin `compl_left -> compl_right`; both share
    /// length and coverage. Returns `(forward, complement)` ids.
    pub fn add_edge_pair(
        &mut self,
        left: NodeId,
        right: NodeId,
        compl_left: NodeId,
        compl_right: NodeId,
        length: i64,
        mean_coverage: i64,
    ) -> (EdgeId, EdgeId) {
        let forward = EdgeId(self.next_edge_pair << 1);
        let complement = forward.rc();
        self.next_edge_pair += 1;

        self.insert_edge(GraphEdge {
            id: forward,
            node_left: left,
            node_right: right,
            length,
            mean_coverage,
            self_complement: false,
        });
        self.insert_edge(GraphEdge {
            id: complement,
            node_left: compl_left,
            node_right: compl_right,
            length,
            mean_coverage,
            self_complement: false,
        });
        (forward, complement)
    }

    /// Create a palindromic edge that is its own complement.
    pub fn add_self_complement_edge(
        &mut self,
        left: NodeId,
        right: NodeId,
        length: i64,
        mean_coverage: i64,
    ) -> EdgeId {
        let id = EdgeId(self.next_edge_pair << 1);
        self.next_edge_pair += 1;
        self.insert_edge(GraphEdge {
            id,
            node_left: left,
            node_right: right,
            length,
            mean_coverage,
            self_complement: true,
        });
        id
    }

    fn insert_edge(&mut self, edge: GraphEdge) {
        self.nodes[edge.node_left.0].out_edges.push(edge.id);
        self.nodes[edge.node_right.0].in_edges.push(edge.id);
        self.edges.insert(edge.id, edge);
    }

    #[inline]
    pub fn has_edge(&self, id: EdgeId) -> bool {
        self.edges.contains_key(&id)
    }

    pub fn edge(&self, id: EdgeId) -> &GraphEdge {
        &self.edges[&id]
    }

    pub fn edge_mut(&mut self, id: EdgeId) -> &mut GraphEdge {
        self.edges.get_mut(&id).expect("edge id is live")
    }

    pub fn node(&self, id: NodeId) -> &GraphNode {
        &self.nodes[id.0]
    }

    /// The reverse-complement twin; the edge itself if palindromic.
    pub fn complement_edge(&self, id: EdgeId) -> EdgeId {
        if self.edges[&id].self_complement {
            id
        } else {
            id.rc()
        }
    }

    /// Edge ids in deterministic order.
    pub fn edge_ids(&self) -> Vec<EdgeId> {
        let mut ids: Vec<EdgeId> = self.edges.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Unlink an edge from both endpoints and drop it from the arena.
    /// Callers remove the complement edge themselves.
    pub fn remove_edge(&mut self, id: EdgeId) {
        if let Some(edge) = self.edges.remove(&id) {
            vec_remove(&mut self.nodes[edge.node_left.0].out_edges, id);
            vec_remove(&mut self.nodes[edge.node_right.0].in_edges, id);
        }
    }

    /// Drop `edge` from `node`'s outgoing list. The edge keeps its
    /// endpoint until re-attached.
    pub fn detach_out_edge(&mut self, node: NodeId, edge: EdgeId) {
        vec_remove(&mut self.nodes[node.0].out_edges, edge);
    }

    /// Drop `edge` from `node`'s incoming list.
    pub fn detach_in_edge(&mut self, node: NodeId, edge: EdgeId) {
        vec_remove(&mut self.nodes[node.0].in_edges, edge);
    }

    /// Rewrite `edge`'s left endpoint onto `node`.
    pub fn attach_out_edge(&mut self, node: NodeId, edge: EdgeId) {
        self.edges.get_mut(&edge).expect("edge id is live").node_left = node;
        self.nodes[node.0].out_edges.push(edge);
    }

    /// Rewrite `edge`'s right endpoint onto `node`.
    pub fn attach_in_edge(&mut self, node: NodeId, edge: EdgeId) {
        self.edges.get_mut(&edge).expect("edge id is live").node_right = node;
        self.nodes[node.0].in_edges.push(edge);
    }

    /// Detach an edge from its right node by rewriting the endpoint onto a
    /// fresh node. The mirrored left-detach of the complement edge is the
    /// caller's responsibility.
    pub fn disconnect_right(&mut self, id: EdgeId) {
        let fresh = self.add_node();
        let old = self.edges[&id].node_right;
        self.detach_in_edge(old, id);
        self.attach_in_edge(fresh, id);
    }

    /// Mirror of [`RepeatGraph::disconnect_right`].
    pub fn disconnect_left(&mut self, id: EdgeId) {
        let fresh = self.add_node();
        let old = self.edges[&id].node_left;
        self.detach_out_edge(old, id);
        self.attach_out_edge(fresh, id);
    }

    /// Verify complement pairing and adjacency consistency. A failure means
    /// a pass forgot to mirror a mutation and the graph is malformed.
    pub fn check_symmetry(&self) -> Result<(), PipelineError> {
        for (id, edge) in &self.edges {
            let compl = self.complement_edge(*id);
            let Some(twin) = self.edges.get(&compl) else {
                return Err(PipelineError::InvariantViolation {
                    message: format!("edge {} has no complement", id.signed_id()),
                });
            };
            if self.complement_edge(compl) != *id {
                return Err(PipelineError::InvariantViolation {
                    message: format!("complement of edge {} is not an involution", id.signed_id()),
                });
            }
            if twin.length != edge.length {
                return Err(PipelineError::InvariantViolation {
                    message: format!("edge {} and its complement differ in length", id.signed_id()),
                });
            }
            if !self.nodes[edge.node_left.0].out_edges.contains(id)
                || !self.nodes[edge.node_right.0].in_edges.contains(id)
            {
                return Err(PipelineError::InvariantViolation {
                    message: format!("edge {} is missing from its node adjacency", id.signed_id()),
                });
            }
        }

        for (n, node) in self.nodes.iter().enumerate() {
            for id in node.in_edges.iter().chain(&node.out_edges) {
                if !self.edges.contains_key(id) {
                    return Err(PipelineError::InvariantViolation {
                        message: format!("node {n} references removed edge {}", id.signed_id()),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Remove the first occurrence of `item` from `vec`.
pub(crate) fn vec_remove<T: PartialEq>(vec: &mut Vec<T>, item: T) {
    if let Some(pos) = vec.iter().position(|x| *x == item) {
        vec.remove(pos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rc_is_an_involution() {
        let mut graph = RepeatGraph::new();
        let a = graph.add_node();
        let b = graph.add_node();
        let ca = graph.add_node();
        let cb = graph.add_node();
        let (fwd, rev) = graph.add_edge_pair(a, b, cb, ca, 100, 5);

        assert_eq!(fwd.rc(), rev);
        assert_eq!(rev.rc(), fwd);
        assert!(fwd.strand());
        assert!(!rev.strand());
        assert_eq!(fwd.signed_id(), -rev.signed_id());
        assert_eq!(graph.complement_edge(graph.complement_edge(fwd)), fwd);
    }

    #[test]
    fn self_complement_edge_is_its_own_twin() {
        let mut graph = RepeatGraph::new();
        let a = graph.add_node();
        let b = graph.add_node();
        let id = graph.add_self_complement_edge(a, b, 50, 3);

        assert_eq!(graph.complement_edge(id), id);
        graph.check_symmetry().unwrap();
    }

    #[test]
    fn remove_edge_unlinks_adjacency() {
        let mut graph = RepeatGraph::new();
        let a = graph.add_node();
        let b = graph.add_node();
        let ca = graph.add_node();
        let cb = graph.add_node();
        let (fwd, rev) = graph.add_edge_pair(a, b, cb, ca, 100, 5);

        graph.remove_edge(fwd);
        graph.remove_edge(rev);

        assert_eq!(graph.num_edges(), 0);
        assert!(graph.node(a).out_edges.is_empty());
        assert!(graph.node(b).in_edges.is_empty());
        graph.check_symmetry().unwrap();
    }

    #[test]
    fn disconnect_right_moves_endpoint_to_fresh_node() {
        let mut graph = RepeatGraph::new();
        let a = graph.add_node();
        let b = graph.add_node();
        let ca = graph.add_node();
        let cb = graph.add_node();
        let (fwd, rev) = graph.add_edge_pair(a, b, cb, ca, 100, 5);

        let nodes_before = graph.num_nodes();
        graph.disconnect_right(fwd);
        graph.disconnect_left(rev);

        assert_eq!(graph.num_nodes(), nodes_before + 2);
        assert!(graph.node(b).in_edges.is_empty());
        assert_ne!(graph.edge(fwd).node_right, b);
        assert_ne!(graph.edge(rev).node_left, cb);
        graph.check_symmetry().unwrap();
    }

    #[test]
    fn symmetry_check_flags_missing_complement() {
        let mut graph = RepeatGraph::new();
        let a = graph.add_node();
        let b = graph.add_node();
        let ca = graph.add_node();
        let cb = graph.add_node();
        let (fwd, _rev) = graph.add_edge_pair(a, b, cb, ca, 100, 5);

        // remove only one strand: the invariant must trip
        graph.remove_edge(fwd);
        assert!(matches!(
            graph.check_symmetry(),
            Err(PipelineError::InvariantViolation { .. })
        ));
    }
}
