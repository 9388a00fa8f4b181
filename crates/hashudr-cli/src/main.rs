//! # hashudr CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use hashudr_cli::algorithms::{run_algorithms, AlgorithmsArgs};
use hashudr_cli::key::{run_key, KeyArgs};

/// Compute hash keys the way the `key` database function does.
#[derive(Parser, Debug)]
#[command(name = "hashudr", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compute the key of a text or file.
    Key(KeyArgs),

    /// List the algorithm selectors.
    Algorithms(AlgorithmsArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Without -v, RUST_LOG decides.
    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Key(args) => run_key(&args),
        Commands::Algorithms(args) => run_algorithms(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
