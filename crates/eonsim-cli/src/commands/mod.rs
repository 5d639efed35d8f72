//! CLI command modules

pub mod run;
pub mod sweep;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use tracing::info;

use eonsim_engine::{
    ControlHandle, RunSummary, SimConfig, Simulation, StrategyKind, TopologySpec,
    TrafficGenerator,
};
use eonsim_rl::RmsaStrategy;

/// Strategy preset selectable on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StrategyArg {
    Ql,
    Amra,
}

impl From<StrategyArg> for StrategyKind {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Ql => StrategyKind::Ql,
            StrategyArg::Amra => StrategyKind::Amra,
        }
    }
}

/// Load the topology description, falling back to the built-in NSFNET.
pub fn load_topology(path: Option<&Path>) -> Result<TopologySpec> {
    match path {
        Some(path) => TopologySpec::load(path),
        None => Ok(TopologySpec::nsfnet()),
    }
}

/// Build and run one simulation for `config`, returning its summary.
pub fn run_simulation(config: &SimConfig, topology: &TopologySpec) -> Result<RunSummary> {
    let network = topology.build()?;
    let generator = TrafficGenerator::new(
        &network,
        config.demands,
        config.erlang,
        config.replica_preservation,
        config.traffic.clone(),
        config.seed,
    );
    let strategy = RmsaStrategy::new(
        config.strategy.name(),
        &network,
        config.strategy_config(),
        config.seed,
    );
    let mut simulation = Simulation::new(
        network,
        generator,
        strategy,
        config.alpha,
        config.erlang,
        config.seed,
        ControlHandle::new(),
    );
    simulation.run();
    Ok(simulation.summary())
}

/// Write a JSON document into `output`, creating the directory if
/// needed, and return the file path.
pub fn write_json(output: &Path, file_name: &str, value: &impl serde::Serialize) -> Result<PathBuf> {
    std::fs::create_dir_all(output)
        .with_context(|| format!("creating results directory {}", output.display()))?;
    let path = output.join(file_name);
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(&path, json)
        .with_context(|| format!("writing results to {}", path.display()))?;
    info!(path = %path.display(), "results written");
    Ok(path)
}

/// Timestamp fragment for result file names.
pub fn timestamp() -> String {
    chrono::Utc::now().format("%Y_%m_%d_%H_%M_%S").to_string()
}
