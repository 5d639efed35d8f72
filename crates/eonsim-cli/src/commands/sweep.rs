//! `eonsim sweep` - independent runs across a range of erlang values
//!
//! Each worker thread owns a private network, generator, strategy, and
//! Q-table; workers share nothing, so running them in parallel is safe.

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Args;
use tracing::info;

use eonsim_engine::{RunSummary, SimConfig};

use super::{load_topology, run_simulation, timestamp, write_json, StrategyArg};

#[derive(Args)]
pub struct SweepArgs {
    /// Path to a TOML run configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to a TOML topology description (defaults to the built-in
    /// NSFNET)
    #[arg(long)]
    topology: Option<PathBuf>,

    /// First erlang value
    #[arg(long)]
    erlang_start: f64,

    /// Last erlang value (inclusive)
    #[arg(long)]
    erlang_end: f64,

    /// Step between erlang values
    #[arg(long, default_value_t = 50.0)]
    erlang_step: f64,

    /// Strategy preset
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Directory for result summaries
    #[arg(long, default_value = "results")]
    output: PathBuf,
}

pub fn execute(args: SweepArgs) -> Result<()> {
    if args.erlang_step <= 0.0 {
        return Err(anyhow!("erlang step must be positive"));
    }
    if args.erlang_end < args.erlang_start {
        return Err(anyhow!("erlang range is empty"));
    }

    let mut base = SimConfig::load(args.config.as_deref())?;
    if let Some(strategy) = args.strategy {
        base.strategy = strategy.into();
    }
    let topology = load_topology(args.topology.as_deref())?;

    let mut erlangs = Vec::new();
    let mut erlang = args.erlang_start;
    while erlang <= args.erlang_end {
        erlangs.push(erlang);
        erlang += args.erlang_step;
    }
    info!(runs = erlangs.len(), "starting sweep");

    let summaries: Vec<RunSummary> = std::thread::scope(|scope| {
        let handles: Vec<_> = erlangs
            .iter()
            .map(|&erlang| {
                let config = SimConfig {
                    erlang,
                    ..base.clone()
                };
                let topology = &topology;
                scope.spawn(move || run_simulation(&config, topology))
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .map_err(|_| anyhow!("sweep worker panicked"))?
            })
            .collect::<Result<Vec<_>>>()
    })?;

    for summary in &summaries {
        info!(
            erlang = summary.erlang,
            allocations = summary.allocations,
            spectrum_blocked = summary.spectrum_blocked_volume,
            "sweep point complete"
        );
    }

    let file_name = format!("sweep_{}_{}.json", base.strategy.name(), timestamp());
    write_json(&args.output, &file_name, &summaries)?;
    Ok(())
}
