//! Maximal unbranching path extraction.
//!
//! A path extends through any internal node with exactly one in-edge and
//! one out-edge and stops at endpoints, bifurcations, or when it closes
//! into a loop. Paths come in complement pairs sharing a fresh strand-
//! paired id, so `path.id.rc()` always names the complement path.

use ahash::AHashSet;

use super::model::{EdgeId, NodeId, RepeatGraph};

/// An ordered run of edges whose internal nodes are all 1-in/1-out.
///
/// `length` and `mean_coverage` are snapshots taken at extraction time;
/// the endpoint accessors read live graph state because surgeries rewrite
/// edge endpoints between the enumeration and mutation phases of a pass.
#[derive(Debug, Clone)]
pub struct UnbranchingPath {
    pub id: EdgeId,
    pub edges: Vec<EdgeId>,
    pub length: i64,
    pub mean_coverage: i64,
}

impl UnbranchingPath {
    fn new(id: EdgeId, edges: Vec<EdgeId>, graph: &RepeatGraph) -> Self {
        let length: i64 = edges.iter().map(|e| graph.edge(*e).length).sum();
        let weighted: i64 = edges
            .iter()
            .map(|e| {
                let edge = graph.edge(*e);
                edge.mean_coverage * edge.length
            })
            .sum();
        let mean_coverage = if length > 0 { weighted / length } else { 0 };
        Self {
            id,
            edges,
            length,
            mean_coverage,
        }
    }

    pub fn front(&self) -> EdgeId {
        self.edges[0]
    }

    pub fn back(&self) -> EdgeId {
        *self.edges.last().expect("paths are non-empty")
    }

    pub fn node_left(&self, graph: &RepeatGraph) -> NodeId {
        graph.edge(self.front()).node_left
    }

    pub fn node_right(&self, graph: &RepeatGraph) -> NodeId {
        graph.edge(self.back()).node_right
    }

    pub fn is_looped(&self, graph: &RepeatGraph) -> bool {
        self.node_left(graph) == self.node_right(graph)
    }

    /// Signed edge ids joined for log output, e.g. `+3,-7`.
    pub fn edges_str(&self) -> String {
        self.edges
            .iter()
            .map(|e| format!("{:+}", e.signed_id()))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Enumerate all maximal unbranching paths of the current graph, both
/// strands of every pair.
pub fn unbranching_paths(graph: &RepeatGraph) -> Vec<UnbranchingPath> {
    let mut visited: AHashSet<EdgeId> = AHashSet::default();
    let mut paths = Vec::new();
    let mut next_pair: u64 = 0;

    for start in graph.edge_ids() {
        if visited.contains(&start) {
            continue;
        }

        let mut chain = vec![start];
        visited.insert(start);

        // grow right
        loop {
            let node = graph.node(graph.edge(*chain.last().expect("non-empty")).node_right);
            if node.in_edges.len() != 1 || node.out_edges.len() != 1 {
                break;
            }
            let next = node.out_edges[0];
            if next == chain[0] || visited.contains(&next) {
                break;
            }
            chain.push(next);
            visited.insert(next);
        }

        // grow left
        loop {
            let node = graph.node(graph.edge(chain[0]).node_left);
            if node.in_edges.len() != 1 || node.out_edges.len() != 1 {
                break;
            }
            let prev = node.in_edges[0];
            if prev == *chain.last().expect("non-empty") || visited.contains(&prev) {
                break;
            }
            chain.insert(0, prev);
            visited.insert(prev);
        }

        let complement: Vec<EdgeId> = chain
            .iter()
            .rev()
            .map(|e| graph.complement_edge(*e))
            .collect();

        let forward_id = EdgeId::from_pair(next_pair, true);
        let complement_id = EdgeId::from_pair(next_pair, false);
        next_pair += 1;

        if complement == chain {
            // palindromic path: its complement is itself
            paths.push(UnbranchingPath::new(forward_id, chain, graph));
            continue;
        }

        for e in &complement {
            visited.insert(*e);
        }
        paths.push(UnbranchingPath::new(forward_id, chain, graph));
        paths.push(UnbranchingPath::new(complement_id, complement, graph));
    }

    paths
}
