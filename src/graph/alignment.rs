//! Read-to-graph alignments and their refresh after graph surgery.
//!
//! Alignments are produced by an external mapper; this module only stores
//! them and keeps them consistent with the graph as passes remove edges.

use super::model::{EdgeId, RepeatGraph};

/// Coordinates of one read-to-edge overlap. `cur_*` index into the read,
/// `ext_*` into the edge sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverlapRange {
    pub cur_begin: i64,
    pub cur_end: i64,
    pub cur_len: i64,
    pub ext_begin: i64,
    pub ext_end: i64,
    pub ext_len: i64,
}

/// One edge of a read's path through the graph.
#[derive(Debug, Clone, Copy)]
pub struct EdgeAlignment {
    pub edge: EdgeId,
    pub overlap: OverlapRange,
}

/// A read's full path: a non-empty ordered sequence of edge alignments.
pub type GraphAlignment = Vec<EdgeAlignment>;

/// Owns the read alignments and refreshes them after mutating passes.
#[derive(Debug, Default)]
pub struct ReadAligner {
    alignments: Vec<GraphAlignment>,
}

impl ReadAligner {
    pub fn new(alignments: Vec<GraphAlignment>) -> Self {
        Self {
            alignments: alignments.into_iter().filter(|a| !a.is_empty()).collect(),
        }
    }

    /// Read-only view; invalidated by [`ReadAligner::update_alignments`].
    pub fn alignments(&self) -> &[GraphAlignment] {
        &self.alignments
    }

    /// Drop references to edges that no longer exist. An alignment crossing
    /// a removed edge is split into its surviving runs; empty fragments are
    /// discarded.
    pub fn update_alignments(&mut self, graph: &RepeatGraph) {
        let mut updated = Vec::with_capacity(self.alignments.len());
        for alignment in &self.alignments {
            let mut run: GraphAlignment = Vec::new();
            for entry in alignment {
                if graph.has_edge(entry.edge) {
                    run.push(*entry);
                } else if !run.is_empty() {
                    updated.push(std::mem::take(&mut run));
                }
            }
            if !run.is_empty() {
                updated.push(run);
            }
        }
        self.alignments = updated;
    }
}

/// Overlap spanning an edge of the given length end to end.
pub fn full_overlap(length: i64) -> OverlapRange {
    OverlapRange {
        cur_begin: 0,
        cur_end: length,
        cur_len: length,
        ext_begin: 0,
        ext_end: length,
        ext_len: length,
    }
}
