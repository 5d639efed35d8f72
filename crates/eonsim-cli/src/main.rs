//! eonsim CLI - run elastic optical network RMSA simulations

// Clippy pedantic allows - these are intentional design choices
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{run, sweep};

#[derive(Parser)]
#[command(name = "eonsim", version, about = "Elastic optical network RMSA simulator")]
struct Cli {
    /// Log filter, e.g. "info" or "eonsim_engine=debug"
    #[arg(long, global = true, default_value = "info")]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single simulation
    Run(run::RunArgs),
    /// Sweep a range of erlang values on worker threads
    Sweep(sweep::SweepArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&cli.log).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Run(args) => run::execute(args),
        Commands::Sweep(args) => sweep::execute(args),
    }
}
