//! # custody CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use custody_cli::capabilities::{run_capabilities, CapabilitiesArgs};
use custody_cli::journal::{run_journal, JournalArgs};

/// Evidence custody operator CLI.
///
/// Inspects and verifies audit journals written by the custody API, and
/// prints the capability table the role gate enforces.
#[derive(Parser, Debug)]
#[command(name = "custody", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Read, summarize, or verify a JSON-lines audit journal.
    Journal(JournalArgs),

    /// Print which roles may perform which actions.
    Capabilities(CapabilitiesArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity level.
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
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
        Commands::Journal(args) => run_journal(&args),
        Commands::Capabilities(args) => run_capabilities(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}
