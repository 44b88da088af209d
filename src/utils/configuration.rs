//! Configuration records and the shared error taxonomy.
//!
//! All tunables are loaded once (TOML file or built-in defaults) and passed
//! around as immutable values; nothing in the core mutates them after
//! startup.

use std::path::Path;

use config::{Config, ConfigError, File, FileFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by the polishing and graph-simplification pipelines.
///
/// All of these are fatal: the caller aborts the run, there is no retry and
/// no partial-output recovery.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("bad format in {path}: {message}")]
    BadFormat { path: String, message: String },

    #[error("complement symmetry violated: {message}")]
    InvariantViolation { message: String },

    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

impl PipelineError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn bad_format(path: &Path, message: impl Into<String>) -> Self {
        PipelineError::BadFormat {
            path: path.display().to_string(),
            message: message.into(),
        }
    }
}

/// Tunables for the repeat-graph simplification passes.
///
/// Mirrors the process-wide configuration keys consumed by the simplifier:
/// window size for coverage estimation, the coverage-drop divisor, the tip
/// length cutoff, and the metagenome (uneven coverage) switch.
/// `unique_edge_length` is reserved: loaded and validated but not consumed
/// by any of the current passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimplifyConfig {
    /// Window size for window-wise coverage estimation
    pub coverage_estimate_window: usize,
    /// Divisor applied to mean coverage to obtain removal cutoffs
    pub graph_cov_drop_rate: f64,
    /// Maximum length of an unbranching path considered a tip
    pub tip_length_threshold: i64,
    /// Reserved: minimum length of edges treated as unique
    pub unique_edge_length: i64,
    /// Metagenome mode: coverage across the dataset is uneven
    pub uneven_coverage: bool,
}

impl Default for SimplifyConfig {
    fn default() -> Self {
        Self {
            coverage_estimate_window: 100,
            graph_cov_drop_rate: 5.0,
            tip_length_threshold: 100_000,
            unique_edge_length: 50_000,
            uneven_coverage: false,
        }
    }
}

impl SimplifyConfig {
    /// Load from a TOML file, falling back to defaults for missing keys.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let defaults = SimplifyConfig::default();
        let cfg = Config::builder()
            .set_default(
                "coverage_estimate_window",
                defaults.coverage_estimate_window as i64,
            )?
            .set_default("graph_cov_drop_rate", defaults.graph_cov_drop_rate)?
            .set_default("tip_length_threshold", defaults.tip_length_threshold)?
            .set_default("unique_edge_length", defaults.unique_edge_length)?
            .set_default("uneven_coverage", defaults.uneven_coverage)?
            .add_source(File::from(path.as_ref()).format(FileFormat::Toml))
            .build()?;
        Ok(cfg.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_sane() {
        let cfg = SimplifyConfig::default();
        assert!(cfg.coverage_estimate_window > 0);
        assert!(cfg.graph_cov_drop_rate > 1.0);
        assert!(!cfg.uneven_coverage);
    }

    #[test]
    fn config_loads_partial_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "graph_cov_drop_rate = 2.0").unwrap();
        writeln!(file, "uneven_coverage = true").unwrap();

        let cfg = SimplifyConfig::from_file(file.path()).unwrap();
        assert_eq!(cfg.graph_cov_drop_rate, 2.0);
        assert!(cfg.uneven_coverage);
        // untouched keys keep their defaults
        assert_eq!(cfg.coverage_estimate_window, 100);
    }

    #[test]
    fn config_rejects_malformed_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "graph_cov_drop_rate = [not a number").unwrap();
        assert!(SimplifyConfig::from_file(file.path()).is_err());
    }
}
