//! Consensus polishing: parse bubbles, refine candidates against their
//! sibling reads by iterated single-base edits, write the result trace.

pub mod aligner;
pub mod bubble;
pub mod orchestrator;
pub mod refiner;
pub mod score_matrix;

pub use aligner::IncrementalAligner;
pub use bubble::{read_bubbles, write_bubbles, Bubble};
pub use orchestrator::{OutputFormat, PolishOrchestrator, PolishSummary};
pub use refiner::{EditMethod, EditRecord, Refiner};
pub use score_matrix::ScoreMatrix;
