//! Bubble-level polishing pipeline.
//!
//! Bubbles are independent, so refinement fans out over a rayon pool; the
//! output file is written serially afterwards so each bubble's records stay
//! a contiguous block between separators.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use chrono::Local;
use clap::ValueEnum;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::bubble::{read_bubbles, Bubble};
use super::refiner::{EditMethod, EditRecord, Refiner};
use super::score_matrix::ScoreMatrix;

const SEPARATOR: &str = "------------------------------------------";

/// How much of the refinement trace ends up in the output file.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Final record per bubble only
    Short,
    /// Every per-iteration record
    Verbose,
}

/// Counters reported after a polishing run.
#[derive(Debug, Clone, Serialize)]
pub struct PolishSummary {
    pub bubbles: usize,
    pub edited: usize,
    pub iterations: usize,
}

/// Owns the score matrix and drives parse -> refine -> write.
pub struct PolishOrchestrator {
    score_mat: ScoreMatrix,
}

impl PolishOrchestrator {
    pub fn new(score_mat: ScoreMatrix) -> Self {
        Self { score_mat }
    }

    pub fn run<P: AsRef<Path>>(
        &self,
        bubbles_path: P,
        output_path: P,
        format: OutputFormat,
    ) -> Result<PolishSummary> {
        let bubbles = read_bubbles(bubbles_path.as_ref())?;
        info!("Parsed {} bubbles", bubbles.len());

        let output_path = output_path.as_ref();
        let file = File::create(output_path)
            .with_context(|| format!("failed to create {}", output_path.display()))?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "File was produced at: {}", Local::now().format("%c"))?;
        writeln!(writer)?;

        if bubbles.is_empty() {
            warn!("No bubbles in input, producing empty output");
            writer.flush()?;
            return Ok(PolishSummary {
                bubbles: 0,
                edited: 0,
                iterations: 0,
            });
        }

        let traces = self.refine_all(&bubbles);

        let mut edited = 0;
        let mut iterations = 0;
        for records in &traces {
            iterations += records.len();
            let last = Refiner::final_record(records);
            if last.method != EditMethod::Global {
                edited += 1;
            }

            writeln!(writer, "{SEPARATOR}")?;
            match format {
                OutputFormat::Verbose => {
                    for record in records {
                        write_record(&mut writer, record)?;
                    }
                }
                OutputFormat::Short => write_record(&mut writer, last)?,
            }
            writeln!(writer, "{SEPARATOR}")?;
        }
        writer.flush()?;

        info!(
            "Polished {} bubbles ({} edited) in {} iterations",
            bubbles.len(),
            edited,
            iterations
        );
        Ok(PolishSummary {
            bubbles: bubbles.len(),
            edited,
            iterations,
        })
    }

    /// Refine bubbles in parallel, reporting progress at 10% steps.
    fn refine_all(&self, bubbles: &[Bubble]) -> Vec<Vec<EditRecord>> {
        let refiner = Refiner::new(&self.score_mat);
        let done = AtomicUsize::new(0);
        let total = bubbles.len();

        bubbles
            .par_iter()
            .map(|bubble| {
                let records = refiner.refine(bubble);
                let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
                if finished * 10 / total > (finished - 1) * 10 / total {
                    debug!("Polishing progress: {}%", finished * 100 / total);
                }
                records
            })
            .collect()
    }
}

fn write_record<W: Write>(writer: &mut W, record: &EditRecord) -> Result<()> {
    writeln!(writer, "{:<22}{}", "Consensus: ", record.read)?;
    writeln!(writer, "{:<22}{:.2}", "Score: ", record.score)?;
    let method = match record.method {
        EditMethod::Global => "global",
        EditMethod::Deletion { .. } => "deletion",
        EditMethod::Substitution { .. } => "substitution",
        EditMethod::Insertion { .. } => "insertion",
    };
    writeln!(writer, "{:<22}{}", "Last method applied: ", method)?;

    match record.method {
        EditMethod::Global => {}
        EditMethod::Deletion { index } => {
            writeln!(writer, "Char at index: {index} was deleted.")?;
        }
        EditMethod::Substitution { index, letter } => {
            writeln!(writer, "Char at index {index} was substituted with '{letter}'.")?;
        }
        EditMethod::Insertion { index, letter } => {
            writeln!(writer, "'{letter}' was inserted at index {index}.")?;
        }
    }
    writeln!(writer)?;
    Ok(())
}
