//! Run configuration, layered from defaults, an optional TOML file, and
//! environment variables

use std::path::Path;

use anyhow::{Context, Result};
use config::{Environment, File};
use serde::{Deserialize, Serialize};

use eonsim_rl::StrategyConfig;

/// Configuration for one simulation run.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seed for every pseudo-random source in the run.
    pub seed: u64,
    /// Target demand count; the generator stops after producing it.
    pub demands: u64,
    /// Traffic intensity, controls demand holding times.
    pub erlang: f64,
    /// Link-cut intensity; a cut fires with probability `alpha / erlang`
    /// per loop iteration.
    pub alpha: f64,
    /// Preserve the full volume on backup paths instead of squeezing.
    pub replica_preservation: bool,
    /// Which strategy preset to run.
    pub strategy: StrategyKind,
    pub learning: LearningConfig,
    pub traffic: TrafficConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            demands: 10_000,
            erlang: 300.0,
            alpha: 0.0,
            replica_preservation: false,
            strategy: StrategyKind::Ql,
            learning: LearningConfig::default(),
            traffic: TrafficConfig::default(),
        }
    }
}

/// Strategy preset selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Ql,
    Amra,
}

impl StrategyKind {
    pub fn name(self) -> &'static str {
        match self {
            StrategyKind::Ql => "QL",
            StrategyKind::Amra => "AMRA",
        }
    }
}

/// Q-learning knobs; unset values fall back to the preset's defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LearningConfig {
    pub epsilon: Option<f64>,
    pub learning_rate: Option<f64>,
    pub discount_factor: Option<f64>,
    pub negative_reward: Option<f64>,
    pub learning_cap: Option<u64>,
}

/// Traffic-shape knobs for the generator.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TrafficConfig {
    /// Smallest generated volume (Gb/s), rounded to 10 Gb/s steps.
    pub min_volume: f64,
    /// Largest generated volume (Gb/s).
    pub max_volume: f64,
    /// Backup volume as a fraction of the working volume.
    pub squeeze_ratio: f64,
    /// Fraction of demands that request a backup path.
    pub backup_ratio: f64,
    /// Fraction of arrivals that are anycast pairs.
    pub anycast_ratio: f64,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            min_volume: 10.0,
            max_volume: 400.0,
            squeeze_ratio: 0.5,
            backup_ratio: 0.2,
            anycast_ratio: 0.1,
        }
    }
}

impl SimConfig {
    /// Load configuration: defaults, then the optional file, then
    /// `EONSIM_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        builder = builder.add_source(Environment::with_prefix("EONSIM").separator("__"));
        let loaded = builder.build().context("building configuration")?;
        loaded
            .try_deserialize()
            .context("deserializing configuration")
    }

    /// Resolve the strategy preset with any explicit learning overrides.
    pub fn strategy_config(&self) -> StrategyConfig {
        let mut config = match self.strategy {
            StrategyKind::Ql => StrategyConfig::ql(),
            StrategyKind::Amra => StrategyConfig::amra(),
        };
        if let Some(epsilon) = self.learning.epsilon {
            config.epsilon = epsilon;
        }
        if let Some(learning_rate) = self.learning.learning_rate {
            config.learning_rate = learning_rate;
        }
        if let Some(discount_factor) = self.learning.discount_factor {
            config.discount_factor = discount_factor;
        }
        if let Some(negative_reward) = self.learning.negative_reward {
            config.negative_reward = negative_reward;
        }
        if let Some(learning_cap) = self.learning.learning_cap {
            config.learning_cap = Some(learning_cap);
        }
        config
    }
}
