//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// provcheck: validate, enrich and score healthcare provider directories
#[derive(Parser)]
#[command(name = "provcheck")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Pipeline configuration file (TOML)
    #[arg(short, long, global = true, env = "PROVCHECK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate, enrich and score a provider file
    Run(RunArgs),

    /// Rebuild the review queue from saved results
    Queue {
        /// Results file written by `provcheck run --output`
        #[arg(value_name = "RESULTS_JSON")]
        file: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "csv")]
        format: ExportChoice,

        /// Write the queue to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Only show the first N entries
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Check NPI identifiers and print their check digits
    CheckNpi {
        /// NPIs to check
        #[arg(value_name = "NPI", required = true)]
        npis: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[derive(Args)]
pub struct RunArgs {
    /// Provider file (CSV, TSV or JSON)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// NPI registry JSON to use as a reference source
    #[arg(long)]
    pub registry: Option<PathBuf>,

    /// Practice directory JSON to use as a reference source
    #[arg(long)]
    pub directory: Option<PathBuf>,

    /// Add the synthetic reference source
    #[arg(long)]
    pub synthetic: bool,

    /// Records processed concurrently
    #[arg(short, long)]
    pub parallelism: Option<usize>,

    /// Write per-record results here (JSON, or a CSV directory snapshot)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write the review queue here
    #[arg(short, long)]
    pub queue_output: Option<PathBuf>,

    /// Format for the queue file (default: from extension, else json)
    #[arg(short, long)]
    pub format: Option<ExportChoice>,

    /// Input delimiter (auto-detected when omitted)
    #[arg(long)]
    pub delimiter: Option<char>,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

/// Export format choice.
#[derive(Clone, Copy, Debug, Default)]
pub enum ExportChoice {
    #[default]
    Csv,
    Json,
}

impl std::str::FromStr for ExportChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportChoice::Csv),
            "json" => Ok(ExportChoice::Json),
            _ => Err(format!("Unknown format: {}. Use csv or json.", s)),
        }
    }
}

impl std::fmt::Display for ExportChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportChoice::Csv => write!(f, "csv"),
            ExportChoice::Json => write!(f, "json"),
        }
    }
}

impl From<ExportChoice> for provcheck::export::ExportFormat {
    fn from(choice: ExportChoice) -> Self {
        match choice {
            ExportChoice::Csv => provcheck::export::ExportFormat::Csv,
            ExportChoice::Json => provcheck::export::ExportFormat::Json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_flags() {
        let cli = Cli::parse_from([
            "provcheck",
            "run",
            "providers.csv",
            "--synthetic",
            "--parallelism",
            "8",
            "--queue-output",
            "queue.csv",
        ]);
        match cli.command {
            Commands::Run(args) => {
                assert!(args.synthetic);
                assert_eq!(args.parallelism, Some(8));
                assert_eq!(args.queue_output, Some(PathBuf::from("queue.csv")));
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_check_npi_requires_values() {
        assert!(Cli::try_parse_from(["provcheck", "check-npi"]).is_err());
    }
}
