//! # ContigForge - Assembly Post-Processing Toolkit
//!
//! Post-processing for genome assemblies: a consensus polisher that refines
//! candidate sequences against their sibling reads by iterated single-base
//! edits, and a repeat-graph simplifier that cleans a bidirected assembly
//! graph with coverage-driven surgeries while preserving reverse-complement
//! symmetry.

pub mod graph;
pub mod polish;
pub mod utils;

// Re-export commonly used types at crate level
pub use crate::graph::{GraphSimplifier, ReadAligner, RepeatGraph};
pub use crate::polish::{PolishOrchestrator, ScoreMatrix};
pub use crate::utils::configuration::{PipelineError, SimplifyConfig};

/// Result type used throughout the crate
pub type Result<T> = anyhow::Result<T>;

/// Error type used throughout the crate
pub type Error = anyhow::Error;
