//! Repeat-graph model and coverage-driven simplification.

pub mod alignment;
pub mod coverage;
pub mod model;
pub mod paths;
pub mod simplify;

pub use alignment::{full_overlap, EdgeAlignment, GraphAlignment, OverlapRange, ReadAligner};
pub use coverage::{CoverageEstimator, CoverageStats};
pub use model::{EdgeId, GraphEdge, GraphNode, NodeId, RepeatGraph};
pub use paths::{unbranching_paths, UnbranchingPath};
pub use simplify::{GraphSimplifier, SimplifySummary};
