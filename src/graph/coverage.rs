//! Window-wise coverage estimation.
//!
//! Each edge is cut into fixed-size windows; read alignments bump every
//! window strictly inside their span, which keeps partially covered
//! boundary windows out of the statistics. Per-edge coverage is the median
//! window count symmetrised with the complement edge, restoring the
//! complement invariant the raw counts break.

use ahash::AHashMap;
use tracing::{debug, info};

use super::alignment::ReadAligner;
use super::model::{EdgeId, RepeatGraph};

/// Dataset-wide statistics produced by [`CoverageEstimator::estimate`].
#[derive(Debug, Clone, Copy)]
pub struct CoverageStats {
    /// Mean window coverage across all edges (1 when there are no windows)
    pub mean_coverage: i64,
    /// Coverage above which an edge is unlikely to be a unique segment
    pub unique_cov_threshold: f64,
}

impl Default for CoverageStats {
    fn default() -> Self {
        Self {
            mean_coverage: 1,
            unique_cov_threshold: 2.0,
        }
    }
}

/// Assigns per-edge mean coverage and derives the dataset statistics.
pub struct CoverageEstimator {
    window: usize,
}

impl CoverageEstimator {
    pub fn new(window: usize) -> Self {
        Self { window }
    }

    /// Count window coverage from the current alignments, write the
    /// symmetrised median into every edge and return the global stats.
    pub fn estimate(&self, graph: &mut RepeatGraph, aligner: &ReadAligner) -> CoverageStats {
        let window = self.window as i64;
        let mut wnd_coverage: AHashMap<EdgeId, Vec<i32>> = AHashMap::default();
        for id in graph.edge_ids() {
            let num_windows = (graph.edge(id).length / window) as usize;
            wnd_coverage.insert(id, vec![0; num_windows]);
        }

        for path in aligner.alignments() {
            for entry in path {
                let Some(coverage) = wnd_coverage.get_mut(&entry.edge) else {
                    continue;
                };
                let ovlp = entry.overlap;
                for pos in (ovlp.ext_begin / window + 1)..(ovlp.ext_end / window) {
                    if pos >= 0 && (pos as usize) < coverage.len() {
                        coverage[pos as usize] += 1;
                    }
                }
            }
        }

        let mut sum_cov: i64 = 0;
        let mut sum_windows: i64 = 0;
        for windows in wnd_coverage.values() {
            sum_cov += windows.iter().map(|c| *c as i64).sum::<i64>();
            sum_windows += windows.len() as i64;
        }
        let mean_coverage = if sum_windows != 0 {
            sum_cov / sum_windows
        } else {
            1
        };
        info!("Mean edge coverage: {mean_coverage}");

        let mut unique_candidates: Vec<i64> = Vec::new();
        for id in graph.edge_ids() {
            if wnd_coverage[&id].is_empty() {
                continue;
            }
            let compl = graph.complement_edge(id);
            let median_cov = (median(&wnd_coverage[&id]) + median(&wnd_coverage[&compl])) / 2;

            let multiplicity = median_cov as f64 / mean_coverage as f64;
            if multiplicity.round() as i64 == 1 {
                unique_candidates.push(median_cov);
            }
            debug!(
                "{}\tlen:{}\tcov:{}\tmult:{:.2}",
                id.signed_id(),
                graph.edge(id).length,
                median_cov,
                multiplicity
            );
            graph.edge_mut(id).mean_coverage = median_cov;
        }

        // a unique edge should sit well above three quarters of its peers
        const UNIQUE_MULT: f64 = 1.75;
        let unique_cov_threshold = if unique_candidates.is_empty() {
            2.0
        } else {
            UNIQUE_MULT * quantile(&unique_candidates, 75) as f64
        };
        debug!("Unique coverage threshold {unique_cov_threshold}");

        CoverageStats {
            mean_coverage,
            unique_cov_threshold,
        }
    }
}

/// Median by sorted middle element.
pub(crate) fn median(values: &[i32]) -> i64 {
    if values.is_empty() {
        return 0;
    }
    let mut sorted: Vec<i32> = values.to_vec();
    sorted.sort_unstable();
    sorted[sorted.len() / 2] as i64
}

/// The `q`-th percentile by sorted rank.
pub(crate) fn quantile(values: &[i64], q: usize) -> i64 {
    if values.is_empty() {
        return 0;
    }
    let mut sorted: Vec<i64> = values.to_vec();
    sorted.sort_unstable();
    let rank = (q * sorted.len() / 100).min(sorted.len() - 1);
    sorted[rank]
}
