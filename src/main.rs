use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use contig_forge::polish::{OutputFormat, PolishOrchestrator, ScoreMatrix};

#[derive(Parser)]
#[command(name = "contig-forge")]
#[command(about = "Assembly post-processing: consensus polishing and repeat-graph cleanup")]
#[command(version = "0.1.0")]
pub struct Cli {
    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Polish bubble candidates against their sibling reads
    Polish {
        /// Input bubbles file
        #[arg(required = true)]
        bubbles: PathBuf,

        /// Substitution score matrix (5x5, A C G T -)
        #[arg(short, long)]
        matrix: PathBuf,

        /// Output file
        #[arg(short, long, default_value = "results.txt")]
        output: PathBuf,

        /// Emit only the final record per bubble, or the full trace
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Short)]
        format: OutputFormat,
    },
}

/// Main entry point for the post-processing toolkit
fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging only if not already set
    if !tracing::dispatcher::has_been_set() {
        let log_level = if cli.verbose { "debug" } else { "info" };
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new(log_level))
            .init();
    }

    match cli.command {
        Commands::Polish {
            bubbles,
            matrix,
            output,
            format,
        } => {
            let score_mat = ScoreMatrix::from_file(&matrix)?;
            let summary = PolishOrchestrator::new(score_mat).run(&bubbles, &output, format)?;
            println!(
                "Polished {} bubbles: {} edited, {} iterations total",
                summary.bubbles, summary.edited, summary.iterations
            );
        }
    }

    Ok(())
}
