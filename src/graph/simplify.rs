//! Coverage-driven simplification of the repeat graph.
//!
//! Five passes, all built on the same two-phase discipline: enumerate over
//! a snapshot of unbranching paths or edges and collect a set of targets,
//! then apply the structural mutations. Every mutation is mirrored on the
//! complement strand, alignments are refreshed after each pass, and the
//! complement invariant is re-checked before the next pass runs.

use ahash::{AHashMap, AHashSet};
use serde::Serialize;
use tracing::debug;

use crate::utils::configuration::{PipelineError, SimplifyConfig};

use super::alignment::ReadAligner;
use super::coverage::{CoverageEstimator, CoverageStats};
use super::model::{EdgeId, RepeatGraph};
use super::paths::{unbranching_paths, UnbranchingPath};

/// Per-pass counters for one full simplification run.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SimplifySummary {
    pub unsupported_edges: usize,
    pub chimeric_cuts: usize,
    pub collapsed_loops: usize,
    pub trimmed_tips: usize,
    pub popped_bulges: usize,
}

/// Owns the graph and the alignment adapter for the duration of the
/// simplification pipeline.
pub struct GraphSimplifier<'a> {
    graph: &'a mut RepeatGraph,
    aligner: &'a mut ReadAligner,
    config: SimplifyConfig,
    stats: CoverageStats,
}

impl<'a> GraphSimplifier<'a> {
    pub fn new(
        graph: &'a mut RepeatGraph,
        aligner: &'a mut ReadAligner,
        config: SimplifyConfig,
    ) -> Self {
        Self {
            graph,
            aligner,
            config,
            stats: CoverageStats::default(),
        }
    }

    pub fn mean_coverage(&self) -> i64 {
        self.stats.mean_coverage
    }

    pub fn unique_cov_threshold(&self) -> f64 {
        self.stats.unique_cov_threshold
    }

    /// Run the whole pipeline in order.
    pub fn simplify(&mut self) -> Result<SimplifySummary, PipelineError> {
        self.estimate_coverage();
        Ok(SimplifySummary {
            unsupported_edges: self.remove_unsupported_edges()?,
            chimeric_cuts: self.remove_unsupported_connections()?,
            collapsed_loops: self.collapse_heterozygous_loops()?,
            trimmed_tips: self.trim_tips()?,
            popped_bulges: self.collapse_heterozygous_bulges()?,
        })
    }

    /// Estimate and assign per-edge coverage from the current alignments.
    pub fn estimate_coverage(&mut self) {
        let estimator = CoverageEstimator::new(self.config.coverage_estimate_window);
        self.stats = estimator.estimate(self.graph, self.aligner);
    }

    /// Remove unbranching paths whose coverage falls below the dataset
    /// cutoff. Metagenome mode clamps the cutoff so uneven datasets do not
    /// lose genuine low-abundance sequence.
    pub fn remove_unsupported_edges(&mut self) -> Result<usize, PipelineError> {
        const MIN_ABSOLUTE: i64 = 1;
        const MAX_META_CUTOFF: i64 = 3;

        let mut threshold =
            (self.stats.mean_coverage as f64 / self.config.graph_cov_drop_rate).round() as i64;
        threshold = threshold.max(MIN_ABSOLUTE);
        if self.config.uneven_coverage {
            threshold = threshold.min(MAX_META_CUTOFF);
        }
        debug!("Read coverage cutoff: {threshold}");

        let mut edges_remove: AHashSet<EdgeId> = AHashSet::default();
        for path in unbranching_paths(self.graph) {
            if !path.id.strand() {
                continue;
            }
            if path.mean_coverage < threshold {
                debug!("Low coverage: {} {}", path.edges_str(), path.mean_coverage);
                for edge in &path.edges {
                    edges_remove.insert(*edge);
                    edges_remove.insert(self.graph.complement_edge(*edge));
                }
            }
        }
        for edge in &edges_remove {
            self.graph.remove_edge(*edge);
        }
        debug!("Removed {} unsupported edges", edges_remove.len() / 2);

        self.finish_pass()?;
        Ok(edges_remove.len() / 2)
    }

    /// Disconnect edges whose junctions are backed by too few reads
    /// relative to the edge's own coverage (chimeric connections).
    pub fn remove_unsupported_connections(&mut self) -> Result<usize, PipelineError> {
        let mut right_connections: AHashMap<EdgeId, i64> = AHashMap::default();
        let mut left_connections: AHashMap<EdgeId, i64> = AHashMap::default();

        for read_path in self.aligner.alignments() {
            if read_path.len() < 2 {
                continue;
            }
            for pair in read_path.windows(2) {
                let (cur, next) = (pair[0].edge, pair[1].edge);
                if cur == next && self.graph.edge(cur).is_looped() {
                    continue;
                }
                if cur == next.rc() {
                    continue;
                }
                *right_connections.entry(cur).or_default() += 1;
                *left_connections.entry(next).or_default() += 1;
                let compl_left = self.graph.complement_edge(cur);
                let compl_right = self.graph.complement_edge(next);
                *right_connections.entry(compl_right).or_default() += 1;
                *left_connections.entry(compl_left).or_default() += 1;
            }
        }

        let mut cuts = 0;
        for id in self.graph.edge_ids() {
            if !id.strand() || self.graph.edge(id).is_looped() {
                continue;
            }
            let compl = self.graph.complement_edge(id);

            let threshold = ((self.graph.edge(id).mean_coverage as f64
                / self.config.graph_cov_drop_rate) as i64)
                .min(1);

            let right_node = self.graph.edge(id).node_right;
            if !self.graph.node(right_node).is_end()
                && self.graph.node(right_node).is_bifurcation()
                && right_connections.get(&id).copied().unwrap_or(0) / 2 < threshold
            {
                debug!(
                    "Chimeric right: {} {}",
                    id.signed_id(),
                    right_connections.get(&id).copied().unwrap_or(0) / 2
                );
                self.graph.disconnect_right(id);
                self.graph.disconnect_left(compl);
                cuts += 1;

                if self.graph.edge(id).self_complement {
                    continue; // both sides already cut
                }
            }

            let left_node = self.graph.edge(id).node_left;
            if !self.graph.node(left_node).is_end()
                && self.graph.node(left_node).is_bifurcation()
                && left_connections.get(&id).copied().unwrap_or(0) / 2 < threshold
            {
                debug!(
                    "Chimeric left: {} {}",
                    id.signed_id(),
                    left_connections.get(&id).copied().unwrap_or(0) / 2
                );
                self.graph.disconnect_left(id);
                self.graph.disconnect_right(compl);
                cuts += 1;
            }
        }

        self.finish_pass()?;
        Ok(cuts)
    }

    /// Collapse simple heterozygous loops: a single unbranching loop
    /// hanging off a 2-in/2-out node, with one entrance and one exit.
    /// Low-coverage loops are detached entirely; the rest are unrolled
    /// into the linear path.
    pub fn collapse_heterozygous_loops(&mut self) -> Result<usize, PipelineError> {
        const COV_MULT: f64 = 1.5;

        let paths = unbranching_paths(self.graph);
        let mut to_unroll: AHashSet<EdgeId> = AHashSet::default();
        let mut to_remove: AHashSet<EdgeId> = AHashSet::default();

        for loop_path in &paths {
            if !loop_path.is_looped(self.graph) {
                continue;
            }
            if self.graph.edge(loop_path.front()).self_complement {
                continue;
            }

            let node = loop_path.node_left(self.graph);
            if self.graph.node(node).in_edges.len() != 2
                || self.graph.node(node).out_edges.len() != 2
            {
                continue;
            }

            let entrance = paths
                .iter()
                .find(|cand| cand.node_right(self.graph) == node && cand.id != loop_path.id);
            let exit = paths
                .iter()
                .find(|cand| cand.node_left(self.graph) == node && cand.id != loop_path.id);
            let (Some(entrance), Some(exit)) = (entrance, exit) else {
                continue;
            };

            if entrance.is_looped(self.graph) {
                continue;
            }
            if entrance.id == exit.id.rc() {
                continue;
            }

            // loop coverage should be roughly equal or less than the
            // entrance coverage (the exit is not part of this bound)
            if loop_path.mean_coverage as f64 > COV_MULT * entrance.mean_coverage as f64 {
                continue;
            }

            // loop should not be longer than the other branches
            if loop_path.length > entrance.length.min(exit.length) {
                continue;
            }

            // remove or unroll depending on the coverage
            if loop_path.mean_coverage < (entrance.mean_coverage + exit.mean_coverage) / 4 {
                to_remove.insert(loop_path.id);
                to_remove.insert(loop_path.id.rc());
            } else {
                to_unroll.insert(loop_path.id);
                to_unroll.insert(loop_path.id.rc());
            }
        }

        for path in &paths {
            if to_unroll.contains(&path.id) {
                let node = path.node_left(self.graph);
                let front = path.front();
                // pick the in-edge that is not the loop's own edge
                let in_edges = &self.graph.node(node).in_edges;
                let index = usize::from(in_edges[0] == front);
                let prev_edge = in_edges[index];

                let fresh = self.graph.add_node();
                self.graph.detach_out_edge(node, front);
                self.graph.detach_in_edge(node, prev_edge);
                self.graph.attach_out_edge(fresh, front);
                self.graph.attach_in_edge(fresh, prev_edge);
            }
            if to_remove.contains(&path.id) {
                let node_left = path.node_left(self.graph);
                let node_right = path.node_right(self.graph);
                let (front, back) = (path.front(), path.back());

                let fresh_left = self.graph.add_node();
                let fresh_right = self.graph.add_node();
                self.graph.detach_out_edge(node_left, front);
                self.graph.detach_in_edge(node_right, back);
                self.graph.attach_out_edge(fresh_left, front);
                self.graph.attach_in_edge(fresh_right, back);
            }
        }

        let collapsed = (to_remove.len() + to_unroll.len()) / 2;
        debug!("Removed {collapsed} heterozygous loops");

        self.finish_pass()?;
        Ok(collapsed)
    }

    /// Trim terminal unbranching paths (tips) whose coverage is dwarfed by
    /// the coverage of the graph beyond them, as witnessed by the reads
    /// that traverse the tip.
    pub fn trim_tips(&mut self) -> Result<usize, PipelineError> {
        const MAX_COV_DIFF: f64 = 5.0;

        let paths = unbranching_paths(self.graph);

        // reads indexed by every edge they traverse except their last
        let mut read_index: AHashMap<EdgeId, Vec<usize>> = AHashMap::default();
        for (read_id, read_path) in self.aligner.alignments().iter().enumerate() {
            if read_path.len() < 2 {
                continue;
            }
            for entry in &read_path[..read_path.len() - 1] {
                read_index.entry(entry.edge).or_default().push(read_id);
            }
        }

        let mut to_remove: AHashSet<EdgeId> = AHashSet::default();
        for tip_path in &paths {
            let left = tip_path.node_left(self.graph);
            if !self.graph.node(left).in_edges.is_empty() {
                continue;
            }
            if tip_path.length > self.config.tip_length_threshold {
                continue;
            }

            // mean coverage of the read paths beyond the tip edge
            let mut sum_cov: i64 = 0;
            let mut sum_len: i64 = 0;
            for read_id in read_index.get(&tip_path.back()).into_iter().flatten() {
                let read = &self.aligner.alignments()[*read_id];
                let mut passed_tip = false;
                for entry in read {
                    if entry.edge == tip_path.back() {
                        passed_tip = true;
                        continue;
                    }
                    if !passed_tip {
                        continue;
                    }
                    let edge = self.graph.edge(entry.edge);
                    sum_cov += edge.mean_coverage * edge.length;
                    sum_len += edge.length;
                }
            }
            if sum_len == 0 {
                continue;
            }
            let read_coverage = (sum_cov / sum_len) as f64;

            if read_coverage / MAX_COV_DIFF > tip_path.mean_coverage as f64 {
                debug!(
                    "Tip {} len: {} tipCov: {} contCov: {}",
                    tip_path.edges_str(),
                    tip_path.length,
                    tip_path.mean_coverage,
                    read_coverage
                );
                // excise on the complement strand, consistent with the
                // other passes
                to_remove.insert(tip_path.id.rc());
            }
        }

        let mut trimmed = 0;
        for path in &paths {
            if to_remove.contains(&path.id) {
                let target = path.front();
                let compl = self.graph.complement_edge(target);
                self.graph.disconnect_left(target);
                self.graph.disconnect_right(compl);
                trimmed += 1;
            }
        }
        debug!("{trimmed} tips clipped");

        self.finish_pass()?;
        Ok(trimmed)
    }

    /// Pop heterozygous bulges: two parallel unbranching paths with the
    /// same endpoints, matching coverage sum and comparable lengths. The
    /// lower-coverage branch is detached onto fresh nodes.
    pub fn collapse_heterozygous_bulges(&mut self) -> Result<usize, PipelineError> {
        const MAX_COV_VAR: f64 = 0.20;
        const MAX_LEN_VAR: f64 = 0.50;

        let paths = unbranching_paths(self.graph);
        let mut to_separate: AHashSet<EdgeId> = AHashSet::default();

        for path in &paths {
            if path.is_looped(self.graph) {
                continue;
            }

            let two_paths: Vec<&UnbranchingPath> = paths
                .iter()
                .filter(|cand| {
                    cand.node_left(self.graph) == path.node_left(self.graph)
                        && cand.node_right(self.graph) == path.node_right(self.graph)
                })
                .collect();

            // making sure the structure is ok
            if two_paths.len() != 2 {
                continue;
            }
            if two_paths[0].id == two_paths[1].id.rc() {
                continue;
            }
            if to_separate.contains(&two_paths[0].id) || to_separate.contains(&two_paths[1].id) {
                continue;
            }
            let node_left = two_paths[0].node_left(self.graph);
            let node_right = two_paths[0].node_right(self.graph);
            if self.graph.node(node_left).in_edges.len() != 1
                || self.graph.node(node_right).out_edges.len() != 1
            {
                continue;
            }

            let entrance = paths.iter().find(|cand| cand.node_right(self.graph) == node_left);
            let exit = paths.iter().find(|cand| cand.node_left(self.graph) == node_right);
            let (Some(entrance), Some(exit)) = (entrance, exit) else {
                continue;
            };

            // the two branches together should carry roughly the entrance
            // and exit coverage
            let cov_sum = (two_paths[0].mean_coverage + two_paths[1].mean_coverage) as f64;
            let entrance_diff = (cov_sum - entrance.mean_coverage as f64).abs() / cov_sum;
            let exit_diff = (cov_sum - exit.mean_coverage as f64).abs() / cov_sum;
            if entrance_diff > MAX_COV_VAR || exit_diff > MAX_COV_VAR {
                continue;
            }

            // branches of roughly the same length, both significantly
            // shorter than the entrance and exit
            let (len0, len1) = (two_paths[0].length, two_paths[1].length);
            if (len0 - len1).abs() as f64 > MAX_LEN_VAR * len0.min(len1) as f64 {
                continue;
            }
            let bubble_size = ((len0 + len1) / 2) as f64;
            if bubble_size > entrance.length as f64 || bubble_size > exit.length as f64 {
                continue;
            }

            let weaker = if two_paths[0].mean_coverage < two_paths[1].mean_coverage {
                two_paths[0]
            } else {
                two_paths[1]
            };
            to_separate.insert(weaker.id);
            to_separate.insert(weaker.id.rc());
        }

        for path in &paths {
            if to_separate.contains(&path.id) {
                let node_left = path.node_left(self.graph);
                let node_right = path.node_right(self.graph);
                let (front, back) = (path.front(), path.back());

                let fresh_left = self.graph.add_node();
                let fresh_right = self.graph.add_node();
                self.graph.detach_out_edge(node_left, front);
                self.graph.detach_in_edge(node_right, back);
                self.graph.attach_out_edge(fresh_left, front);
                self.graph.attach_in_edge(fresh_right, back);
            }
        }

        let popped = to_separate.len() / 2;
        debug!("Popped {popped} heterozygous bulges");

        self.finish_pass()?;
        Ok(popped)
    }

    /// Refresh the alignment views and verify the complement invariant;
    /// runs after every mutating pass.
    fn finish_pass(&mut self) -> Result<(), PipelineError> {
        self.aligner.update_alignments(self.graph);
        self.graph.check_symmetry()
    }
}
