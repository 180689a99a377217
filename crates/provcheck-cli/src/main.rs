//! provcheck CLI - provider directory validation and review queue.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run(args) => commands::run::run(args, cli.config.as_deref(), cli.verbose),
        Commands::Queue {
            file,
            format,
            output,
            limit,
        } => commands::queue::run(file, format, output, limit, cli.config.as_deref()),
        Commands::CheckNpi { npis, json } => commands::check_npi::run(npis, json),
        Commands::Config => commands::config::run(cli.config.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Log to stderr; `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    let default = if verbose { "provcheck=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
