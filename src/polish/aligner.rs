//! Incremental global alignment between a candidate and its branches.
//!
//! For every branch the aligner keeps two full Needleman-Wunsch matrices:
//! one over the sequences as given and one over their reversals. The
//! optimal score of any single-base edit then splits into a prefix score
//! (a row of the forward matrix) and a suffix score (the mirrored row of
//! the reverse matrix), so each probe costs O(|branch|) and touches no
//! stored state.

use super::score_matrix::ScoreMatrix;

/// Per-branch forward and reverse DP matrices, reused across edit probes.
pub struct IncrementalAligner<'a> {
    score_mat: &'a ScoreMatrix,
    forward: Vec<Vec<Vec<f64>>>,
    reverse: Vec<Vec<Vec<f64>>>,
}

impl<'a> IncrementalAligner<'a> {
    pub fn new(num_branches: usize, score_mat: &'a ScoreMatrix) -> Self {
        Self {
            score_mat,
            forward: vec![Vec::new(); num_branches],
            reverse: vec![Vec::new(); num_branches],
        }
    }

    /// Fully (re)compute branch `k`'s matrices for `candidate` and return
    /// the optimal global alignment score.
    pub fn global_alignment(&mut self, candidate: &str, branch: &str, k: usize) -> f64 {
        let cand = candidate.as_bytes();
        let brn = branch.as_bytes();
        self.forward[k] = self.fill_matrix(cand, brn);

        let cand_rev: Vec<u8> = cand.iter().rev().copied().collect();
        let brn_rev: Vec<u8> = brn.iter().rev().copied().collect();
        self.reverse[k] = self.fill_matrix(&cand_rev, &brn_rev);

        self.forward[k][cand.len()][brn.len()]
    }

    /// Score of the alignment with candidate position `letter_index - 1`
    /// (1-based external index) removed.
    pub fn add_deletion(&self, k: usize, letter_index: usize) -> f64 {
        let rows = self.forward[k].len(); // candidate length + 1
        let front = &self.forward[k][letter_index - 1];
        let back = &self.reverse[k][rows - 1 - letter_index];
        Self::best_split(front, back)
    }

    /// Score with candidate position `letter_index - 1` replaced by
    /// `letter`. Recomputes exactly one forward row.
    pub fn add_substitution(&self, k: usize, letter_index: usize, letter: u8, branch: &str) -> f64 {
        let rows = self.forward[k].len();
        let updated = self.extend_row(&self.forward[k][letter_index - 1], letter, branch);
        let back = &self.reverse[k][rows - 1 - letter_index];
        Self::best_split(&updated, back)
    }

    /// Score with `letter` inserted before candidate position
    /// `letter_index - 1`. Recomputes exactly one forward row.
    pub fn add_insertion(&self, k: usize, letter_index: usize, letter: u8, branch: &str) -> f64 {
        let rows = self.forward[k].len();
        let updated = self.extend_row(&self.forward[k][letter_index - 1], letter, branch);
        let back = &self.reverse[k][rows - letter_index];
        Self::best_split(&updated, back)
    }

    fn fill_matrix(&self, a: &[u8], b: &[u8]) -> Vec<Vec<f64>> {
        let mut m = vec![vec![0.0; b.len() + 1]; a.len() + 1];
        for i in 1..=a.len() {
            m[i][0] = m[i - 1][0] + self.score_mat.score(a[i - 1], b'-');
        }
        for j in 1..=b.len() {
            m[0][j] = m[0][j - 1] + self.score_mat.score(b'-', b[j - 1]);
        }
        for i in 1..=a.len() {
            for j in 1..=b.len() {
                let diag = m[i - 1][j - 1] + self.score_mat.score(a[i - 1], b[j - 1]);
                let up = m[i - 1][j] + self.score_mat.score(a[i - 1], b'-');
                let left = m[i][j - 1] + self.score_mat.score(b'-', b[j - 1]);
                m[i][j] = diag.max(up).max(left);
            }
        }
        m
    }

    /// One DP row extended by a single candidate letter.
    fn extend_row(&self, prev: &[f64], letter: u8, branch: &str) -> Vec<f64> {
        let b = branch.as_bytes();
        let mut row = vec![0.0; prev.len()];
        row[0] = prev[0] + self.score_mat.score(letter, b'-');
        for j in 1..prev.len() {
            let diag = prev[j - 1] + self.score_mat.score(letter, b[j - 1]);
            let up = prev[j] + self.score_mat.score(letter, b'-');
            let left = row[j - 1] + self.score_mat.score(b'-', b[j - 1]);
            row[j] = diag.max(up).max(left);
        }
        row
    }

    /// Best way to stitch a forward prefix row to a reverse suffix row.
    fn best_split(front: &[f64], back: &[f64]) -> f64 {
        let cols = front.len();
        (0..cols)
            .map(|j| front[j] + back[cols - 1 - j])
            .fold(f64::NEG_INFINITY, f64::max)
    }
}
