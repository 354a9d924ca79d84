//! symdeps CLI - file-level symbol dependencies for TypeScript projects.
//!
//! Usage:
//!   symdeps report                   # Units ranked by fan-out
//!   symdeps report --unsorted --no-cache
//!   symdeps graph --suffix core.ts   # Graphviz DOT
//!   symdeps deps src/core.ts         # One unit as JSON
//!   symdeps json                     # Whole graph as JSON
//!   symdeps stats                    # Counts

use anyhow::Result;
use clap::Parser;
use symdeps::cli::{execute, Cli};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    // stdout carries the rendered output only
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let output = execute(cli)?;
    println!("{}", output);
    Ok(())
}
