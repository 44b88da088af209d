//! Bubble records and the line-oriented bubble file grammar.
//!
//! A bubble is one polishing work unit: a candidate sequence plus the noisy
//! sibling reads that cover the same locus. The on-disk format is
//!
//! ```text
//! ><header> <position> <numReads>
//! <candidate>
//! (>anything
//! <read>) x numReads
//! ```
//!
//! Sequences are upcased on parse and validated against `{A, C, G, T}`.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::utils::configuration::PipelineError;

/// A candidate sequence with its sibling reads. Immutable after load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bubble {
    pub header: String,
    pub position: i64,
    pub candidate: String,
    pub branches: Vec<String>,
}

/// Parse a bubble file. Malformed headers, sequences outside the alphabet
/// and truncated records all fail with `BadFormat`.
pub fn read_bubbles<P: AsRef<Path>>(path: P) -> Result<Vec<Bubble>, PipelineError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
    let mut lines = BufReader::new(file).lines();
    let mut bubbles = Vec::new();

    loop {
        let header_line = match next_line(&mut lines, path)? {
            Some(line) if !line.is_empty() => line,
            _ => break,
        };

        let tokens: Vec<&str> = header_line.split_whitespace().collect();
        if tokens.len() < 3 || !tokens[0].starts_with('>') {
            return Err(PipelineError::bad_format(
                path,
                format!("malformed bubble header '{header_line}'"),
            ));
        }
        let header = tokens[0][1..].to_string();
        let position: i64 = tokens[1].parse().map_err(|_| {
            PipelineError::bad_format(path, format!("invalid bubble position '{}'", tokens[1]))
        })?;
        let num_reads: usize = tokens[2].parse().map_err(|_| {
            PipelineError::bad_format(path, format!("invalid read count '{}'", tokens[2]))
        })?;

        let candidate = match next_line(&mut lines, path)? {
            Some(line) => upcase_sequence(&line, path)?,
            None => {
                return Err(PipelineError::bad_format(path, "missing candidate sequence"));
            }
        };

        let mut branches = Vec::with_capacity(num_reads);
        for _ in 0..num_reads {
            // read header line is present but its content is not used
            if next_line(&mut lines, path)?.is_none() {
                return Err(PipelineError::bad_format(
                    path,
                    format!("expected {num_reads} reads for bubble '{header}'"),
                ));
            }
            match next_line(&mut lines, path)? {
                Some(line) => branches.push(upcase_sequence(&line, path)?),
                None => {
                    return Err(PipelineError::bad_format(
                        path,
                        format!("expected {num_reads} reads for bubble '{header}'"),
                    ));
                }
            }
        }

        bubbles.push(Bubble {
            header,
            position,
            candidate,
            branches,
        });
    }

    Ok(bubbles)
}

/// Serialise bubbles back into the on-disk grammar. Inverse of
/// [`read_bubbles`] up to read headers and letter case.
pub fn write_bubbles<W: Write>(bubbles: &[Bubble], writer: &mut W) -> io::Result<()> {
    for bubble in bubbles {
        writeln!(
            writer,
            ">{} {} {}",
            bubble.header,
            bubble.position,
            bubble.branches.len()
        )?;
        writeln!(writer, "{}", bubble.candidate)?;
        for (i, branch) in bubble.branches.iter().enumerate() {
            writeln!(writer, ">read_{i}")?;
            writeln!(writer, "{branch}")?;
        }
    }
    Ok(())
}

fn next_line(
    lines: &mut impl Iterator<Item = io::Result<String>>,
    path: &Path,
) -> Result<Option<String>, PipelineError> {
    match lines.next() {
        Some(Ok(line)) => Ok(Some(line)),
        Some(Err(e)) => Err(PipelineError::io(path, e)),
        None => Ok(None),
    }
}

fn upcase_sequence(line: &str, path: &Path) -> Result<String, PipelineError> {
    let upper = line.trim_end().to_ascii_uppercase();
    if let Some(bad) = upper.bytes().find(|b| !matches!(b, b'A' | b'C' | b'G' | b'T')) {
        return Err(PipelineError::bad_format(
            path,
            format!("unexpected character '{}' in sequence", bad as char),
        ));
    }
    Ok(upper)
}
