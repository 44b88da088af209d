//! 5x5 substitution score table over the alphabet `A C G T -`.
//!
//! Loaded once from a whitespace-delimited text file and read-only
//! afterwards. Higher scores mean better matches; the gap column doubles as
//! the linear gap penalty for the aligner.

use std::fs;
use std::path::Path;

use crate::utils::configuration::PipelineError;

/// Nucleotide alphabet in scanning order
pub const ALPHABET: [u8; 4] = [b'A', b'C', b'G', b'T'];

const MATRIX_DIM: usize = 5;
const GAP_INDEX: usize = 4;

/// Pairwise similarity scores for `{A, C, G, T, -}`.
#[derive(Debug, Clone)]
pub struct ScoreMatrix {
    scores: [[f64; MATRIX_DIM]; MATRIX_DIM],
}

impl ScoreMatrix {
    /// Parse a 5x5 table of floats, row/column order `A C G T -`.
    /// Any whitespace separates entries; exactly 25 numbers are required.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;

        let mut values = Vec::with_capacity(MATRIX_DIM * MATRIX_DIM);
        for token in text.split_whitespace() {
            let value: f64 = token.parse().map_err(|_| {
                PipelineError::bad_format(path, format!("invalid score entry '{token}'"))
            })?;
            values.push(value);
        }
        if values.len() != MATRIX_DIM * MATRIX_DIM {
            return Err(PipelineError::bad_format(
                path,
                format!("expected 25 score entries, found {}", values.len()),
            ));
        }

        let mut scores = [[0.0; MATRIX_DIM]; MATRIX_DIM];
        for (i, row) in scores.iter_mut().enumerate() {
            row.copy_from_slice(&values[i * MATRIX_DIM..(i + 1) * MATRIX_DIM]);
        }
        Ok(Self { scores })
    }

    /// Flat table: one score for matches, one for mismatches, one for gaps.
    pub fn uniform(match_score: f64, mismatch: f64, gap: f64) -> Self {
        let mut scores = [[mismatch; MATRIX_DIM]; MATRIX_DIM];
        for i in 0..MATRIX_DIM - 1 {
            scores[i][i] = match_score;
            scores[i][GAP_INDEX] = gap;
            scores[GAP_INDEX][i] = gap;
        }
        scores[GAP_INDEX][GAP_INDEX] = gap;
        Self { scores }
    }

    /// Score of aligning `a` against `b`; bases outside the alphabet score
    /// as gaps.
    #[inline]
    pub fn score(&self, a: u8, b: u8) -> f64 {
        self.scores[Self::index(a)][Self::index(b)]
    }

    #[inline]
    fn index(c: u8) -> usize {
        match c {
            b'A' => 0,
            b'C' => 1,
            b'G' => 2,
            b'T' => 3,
            _ => GAP_INDEX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn uniform_matrix_scores() {
        let mat = ScoreMatrix::uniform(1.0, -1.0, -2.0);
        assert_eq!(mat.score(b'A', b'A'), 1.0);
        assert_eq!(mat.score(b'A', b'C'), -1.0);
        assert_eq!(mat.score(b'G', b'-'), -2.0);
        assert_eq!(mat.score(b'-', b'T'), -2.0);
    }

    #[test]
    fn parses_whitespace_delimited_table() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for row in 0..5 {
            let line: Vec<String> = (0..5).map(|col| format!("{}.5", row * 5 + col)).collect();
            writeln!(file, "{}", line.join("\t")).unwrap();
        }

        let mat = ScoreMatrix::from_file(file.path()).unwrap();
        assert_eq!(mat.score(b'A', b'A'), 0.5);
        assert_eq!(mat.score(b'C', b'G'), 7.5);
        assert_eq!(mat.score(b'T', b'-'), 19.5);
    }

    #[test]
    fn rejects_short_table() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "1 2 3 4 5").unwrap();
        let err = ScoreMatrix::from_file(file.path()).unwrap_err();
        assert!(matches!(err, PipelineError::BadFormat { .. }));
    }

    #[test]
    fn rejects_garbage_entries() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", vec!["x"; 25].join(" ")).unwrap();
        let err = ScoreMatrix::from_file(file.path()).unwrap_err();
        assert!(matches!(err, PipelineError::BadFormat { .. }));
    }
}
