//! Tictac CLI
//!
//! Command-line tools for the tic-tac-toe game store.
//!
//! # Commands
//!
//! - `reconcile` - Create or update collections, validators and indexes
//! - `inspect` - Display collections, validator policy and indexes
//! - `verify` - Re-check stored documents against their validators
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Tic-tac-toe game store tools.
#[derive(Parser)]
#[command(name = "tictac")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the store directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or update the declared collections, validators and indexes
    Reconcile {
        /// Skip validator rewrites that would not change anything
        #[arg(long)]
        diff_validators: bool,

        /// Report same-named indexes whose keys or options differ
        #[arg(long)]
        full_index_check: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Display collections, validator policy and indexes
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Re-check stored documents against their collection validators
    Verify,

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // RUST_LOG wins over the verbosity flag.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Reconcile {
            diff_validators,
            full_index_check,
            format,
        } => {
            let path = cli.path.ok_or("Store path required for reconcile")?;
            commands::reconcile::run(&path, diff_validators, full_index_check, &format)?;
        }
        Commands::Inspect { format } => {
            let path = cli.path.ok_or("Store path required for inspect")?;
            commands::inspect::run(&path, &format)?;
        }
        Commands::Verify => {
            let path = cli.path.ok_or("Store path required for verify")?;
            commands::verify::run(&path)?;
        }
        Commands::Version => {
            println!("Tictac CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Declaration set v{}", tictac_schema::SCHEMA_VERSION);
        }
    }

    Ok(())
}
