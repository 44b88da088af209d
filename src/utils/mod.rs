pub mod configuration;

pub use configuration::{PipelineError, SimplifyConfig};
