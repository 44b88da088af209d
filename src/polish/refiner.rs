//! Iterative best-edit search over a bubble.
//!
//! Each iteration scores every single-base edit of the current candidate
//! against all branches and keeps the best strict improvement; the loop
//! stops at the first iteration that finds none. Scores only ever grow and
//! are bounded above, so termination is guaranteed.

use serde::Serialize;

use super::aligner::IncrementalAligner;
use super::bubble::Bubble;
use super::score_matrix::{ScoreMatrix, ALPHABET};

/// The edit applied by one refinement iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum EditMethod {
    /// No edit: the record carries the plain global alignment score
    Global,
    Deletion { index: usize },
    Substitution { index: usize, letter: char },
    Insertion { index: usize, letter: char },
}

/// Outcome of one refinement iteration: the chosen edit, the summed
/// alignment score it achieves and the resulting candidate.
#[derive(Debug, Clone, Serialize)]
pub struct EditRecord {
    pub method: EditMethod,
    pub score: f64,
    pub read: String,
}

/// Best-edit searcher; borrows the score matrix, owns no other state.
pub struct Refiner<'a> {
    score_mat: &'a ScoreMatrix,
}

impl<'a> Refiner<'a> {
    pub fn new(score_mat: &'a ScoreMatrix) -> Self {
        Self { score_mat }
    }

    /// Refine a bubble to convergence. Returns one record per iteration;
    /// the last record is always the identity `Global` record of the
    /// converged candidate.
    pub fn refine(&self, bubble: &Bubble) -> Vec<EditRecord> {
        let mut aligner = IncrementalAligner::new(bubble.branches.len(), self.score_mat);
        let mut records = Vec::new();
        let mut current = bubble.candidate.clone();

        loop {
            let record = self.best_edit(&current, &bubble.branches, &mut aligner);
            let improved = record.read != current;
            current = record.read.clone();
            records.push(record);
            if !improved {
                break;
            }
        }
        records
    }

    /// The record a caller reports for a converged bubble: the last edit
    /// that changed the candidate, or the initial global record if none
    /// ever did.
    pub fn final_record(records: &[EditRecord]) -> &EditRecord {
        records
            .iter()
            .rev()
            .find(|r| r.method != EditMethod::Global)
            .unwrap_or(&records[records.len() - 1])
    }

    /// Score every candidate edit and keep the best strict improvement.
    /// Scanning order: deletions by index, then substitutions by index and
    /// alphabet, then insertions by index and alphabet; first seen wins.
    fn best_edit(
        &self,
        candidate: &str,
        branches: &[String],
        aligner: &mut IncrementalAligner,
    ) -> EditRecord {
        let global: f64 = branches
            .iter()
            .enumerate()
            .map(|(k, branch)| aligner.global_alignment(candidate, branch, k))
            .sum();
        let mut best = EditRecord {
            method: EditMethod::Global,
            score: global,
            read: candidate.to_string(),
        };

        for del_index in 0..candidate.len() {
            let score: f64 = (0..branches.len())
                .map(|k| aligner.add_deletion(k, del_index + 1))
                .sum();
            if score > best.score {
                let mut read = candidate.to_string();
                read.remove(del_index);
                best = EditRecord {
                    method: EditMethod::Deletion { index: del_index },
                    score,
                    read,
                };
            }
        }

        for sub_index in 0..candidate.len() {
            for letter in ALPHABET {
                if letter == candidate.as_bytes()[sub_index] {
                    continue;
                }
                let score: f64 = branches
                    .iter()
                    .enumerate()
                    .map(|(k, branch)| aligner.add_substitution(k, sub_index + 1, letter, branch))
                    .sum();
                if score > best.score {
                    let mut read = candidate.as_bytes().to_vec();
                    read[sub_index] = letter;
                    best = EditRecord {
                        method: EditMethod::Substitution {
                            index: sub_index,
                            letter: letter as char,
                        },
                        score,
                        read: String::from_utf8(read).expect("alphabet is ASCII"),
                    };
                }
            }
        }

        for ins_index in 0..=candidate.len() {
            for letter in ALPHABET {
                let score: f64 = branches
                    .iter()
                    .enumerate()
                    .map(|(k, branch)| aligner.add_insertion(k, ins_index + 1, letter, branch))
                    .sum();
                if score > best.score {
                    let mut read = candidate.as_bytes().to_vec();
                    read.insert(ins_index, letter);
                    best = EditRecord {
                        method: EditMethod::Insertion {
                            index: ins_index,
                            letter: letter as char,
                        },
                        score,
                        read: String::from_utf8(read).expect("alphabet is ASCII"),
                    };
                }
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bubble(candidate: &str, branches: &[&str]) -> Bubble {
        Bubble {
            header: "test".to_string(),
            position: 0,
            candidate: candidate.to_string(),
            branches: branches.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn matrix() -> ScoreMatrix {
        ScoreMatrix::uniform(1.0, -1.0, -2.0)
    }

    #[test]
    fn single_deletion_polish() {
        let mat = matrix();
        let records = Refiner::new(&mat).refine(&bubble("ACGTA", &["ACTA", "ACTA", "ACTA"]));

        let last = Refiner::final_record(&records);
        assert_eq!(last.method, EditMethod::Deletion { index: 2 });
        assert_eq!(last.read, "ACTA");
        assert_eq!(last.score, 12.0);
    }

    #[test]
    fn identical_branch_is_a_noop() {
        let mat = matrix();
        let records = Refiner::new(&mat).refine(&bubble("ACG", &["ACG"]));

        assert_eq!(records.len(), 1);
        let last = Refiner::final_record(&records);
        assert_eq!(last.method, EditMethod::Global);
        assert_eq!(last.read, "ACG");
        assert_eq!(last.score, 3.0);
    }

    #[test]
    fn substitution_beats_insertion() {
        let mat = matrix();
        let records = Refiner::new(&mat).refine(&bubble("AAA", &["ACA", "ACA"]));

        let last = Refiner::final_record(&records);
        assert_eq!(
            last.method,
            EditMethod::Substitution {
                index: 1,
                letter: 'C'
            }
        );
        assert_eq!(last.read, "ACA");
        assert_eq!(last.score, 6.0);
    }

    #[test]
    fn zero_branches_returns_identity_global() {
        let mat = matrix();
        let records = Refiner::new(&mat).refine(&bubble("ACGT", &[]));

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].method, EditMethod::Global);
        assert_eq!(records[0].score, 0.0);
        assert_eq!(records[0].read, "ACGT");
    }

    #[test]
    fn scores_never_decrease_across_iterations() {
        let mat = matrix();
        let input = bubble("ACGTTGCA", &["AGTTGCA", "AGTTGCA", "ACGTTGA"]);
        let records = Refiner::new(&mat).refine(&input);

        for pair in records.windows(2) {
            assert!(pair[1].score >= pair[0].score);
        }
        let last = Refiner::final_record(&records);
        let drift = last.read.len() as i64 - input.candidate.len() as i64;
        assert!(drift.unsigned_abs() as usize <= records.len());
    }

    #[test]
    fn multiple_edits_converge() {
        let mat = matrix();
        let records = Refiner::new(&mat).refine(&bubble("ACGTT", &["ATTA", "ATTA", "ATTA"]));

        let last = Refiner::final_record(&records);
        assert_eq!(last.read, "ATTA");
        // at least two corrective iterations plus the terminal global one
        assert!(records.len() >= 3);
    }
}
