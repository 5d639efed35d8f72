//! `eonsim run` - a single simulation

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::info;

use eonsim_engine::SimConfig;

use super::{load_topology, run_simulation, timestamp, write_json, StrategyArg};

#[derive(Args)]
pub struct RunArgs {
    /// Path to a TOML run configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to a TOML topology description (defaults to the built-in
    /// NSFNET)
    #[arg(long)]
    topology: Option<PathBuf>,

    /// Seed for every pseudo-random source
    #[arg(long)]
    seed: Option<u64>,

    /// Target demand count
    #[arg(long)]
    demands: Option<u64>,

    /// Traffic intensity in erlang
    #[arg(long)]
    erlang: Option<f64>,

    /// Link-cut intensity
    #[arg(long)]
    alpha: Option<f64>,

    /// Strategy preset
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Directory for result summaries
    #[arg(long, default_value = "results")]
    output: PathBuf,
}

pub fn execute(args: RunArgs) -> Result<()> {
    let mut config = SimConfig::load(args.config.as_deref())?;
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(demands) = args.demands {
        config.demands = demands;
    }
    if let Some(erlang) = args.erlang {
        config.erlang = erlang;
    }
    if let Some(alpha) = args.alpha {
        config.alpha = alpha;
    }
    if let Some(strategy) = args.strategy {
        config.strategy = strategy.into();
    }

    let topology = load_topology(args.topology.as_deref())?;
    let summary = run_simulation(&config, &topology)?;

    info!(
        algorithm = %summary.algorithm,
        erlang = summary.erlang,
        total_volume = summary.total_volume,
        allocations = summary.allocations,
        spectrum_blocked = summary.spectrum_blocked_volume,
        regenerators_blocked = summary.regenerators_blocked_volume,
        link_failure_blocked = summary.link_failure_blocked_volume,
        "run complete"
    );

    let file_name = format!("{}_{}.json", summary.algorithm, timestamp());
    write_json(&args.output, &file_name, &summary)?;
    Ok(())
}
