//! RMSA strategies: rank candidate paths with the Q-table and commit
//! the first feasible one

use std::cmp::Ordering;
use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use eonsim_core::{
    Demand, DemandAllocationResult, Network, NetworkError, NodeId, PartedPath, Result,
};

use crate::policy::{
    select_modulation, span_failure_reward, span_success_reward, state_key, success_base,
};
use crate::qtable::QTable;

/// Tunable constants of the RMSA decision engine.
///
/// The two historical variants share one algorithm and differ only in
/// these values; see [`StrategyConfig::ql`] and [`StrategyConfig::amra`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Probability of exploiting the Q-table instead of exploring.
    pub epsilon: f64,
    /// Temporal-difference learning rate (alpha).
    pub learning_rate: f64,
    /// Temporal-difference discount factor (gamma).
    pub discount_factor: f64,
    /// Fixed penalty fed into failure and wasteful-choice rewards.
    pub negative_reward: f64,
    /// Explore over the whole catalogue instead of only currently
    /// feasible formats.
    pub explore_all_formats: bool,
    /// Stop Q-updates after this many processed demands; `None` keeps
    /// learning for the whole run.
    pub learning_cap: Option<u64>,
}

impl StrategyConfig {
    /// The QL variant: strong penalty, exploration restricted to
    /// feasible formats, table frozen late in the run.
    pub fn ql() -> Self {
        Self {
            epsilon: 0.5,
            learning_rate: 0.9,
            discount_factor: 0.8,
            negative_reward: -3500.0,
            explore_all_formats: false,
            learning_cap: Some(8000),
        }
    }

    /// The AMRA variant: milder penalty, exploration over the whole
    /// catalogue, no learning cap.
    pub fn amra() -> Self {
        Self {
            epsilon: 0.5,
            learning_rate: 0.9,
            discount_factor: 0.8,
            negative_reward: -1000.0,
            explore_all_formats: true,
            learning_cap: None,
        }
    }
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self::ql()
    }
}

/// The RMSA decision engine: one Q-table, one seeded RNG, one config.
///
/// Owns all mutable learning state for a run; parallel runs each build
/// their own instance.
pub struct RmsaStrategy {
    name: String,
    qtable: QTable,
    config: StrategyConfig,
    rng: StdRng,
    processed: u64,
}

impl RmsaStrategy {
    pub fn new(
        name: impl Into<String>,
        network: &Network,
        config: StrategyConfig,
        seed: u64,
    ) -> Self {
        Self {
            name: name.into(),
            qtable: QTable::new(network.link_count()),
            config,
            rng: StdRng::seed_from_u64(seed),
            processed: 0,
        }
    }

    pub fn ql(network: &Network, seed: u64) -> Self {
        Self::new("QL", network, StrategyConfig::ql(), seed)
    }

    pub fn amra(network: &Network, seed: u64) -> Self {
        Self::new("AMRA", network, StrategyConfig::amra(), seed)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn qtable(&self) -> &QTable {
        &self.qtable
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// Reset learning state for a fresh run.
    pub fn reset(&mut self) {
        self.qtable.reset();
        self.processed = 0;
    }

    /// Provision `demand` against `network`.
    ///
    /// Ranks the candidate working paths, commits the first that fits,
    /// then optionally provisions a disjoint backup at the squeezed
    /// volume. Every touched span receives a Q-update. `Err` is a
    /// structural failure; blocked outcomes are `Ok` variants.
    pub fn allocate_demand(
        &mut self,
        demand: &mut Demand,
        network: &mut Network,
    ) -> Result<DemandAllocationResult> {
        self.processed += 1;
        let v = demand.volume_bucket();

        let routes = network.candidate_paths(demand.source(), demand.destination(), None);
        if routes.is_empty() {
            return Ok(DemandAllocationResult::NoSpectrum);
        }

        let candidates = self.rank_candidates(&routes, v, network)?;
        if candidates.is_empty() {
            return Ok(DemandAllocationResult::NoRegenerators);
        }

        // every attempted candidate updates the table, win or lose
        let mut committed = false;
        for path in &candidates {
            if demand.allocate(network, path.clone(), v)? {
                if let Some(working) = demand.working_path() {
                    self.reward_success(working, v, network)?;
                }
                committed = true;
                break;
            }
            self.reward_failure(path, v, network)?;
        }

        if !committed {
            trace!(demand = %demand.id(), "no candidate committed");
            return Ok(DemandAllocationResult::NoSpectrum);
        }

        if demand.allocate_backup() {
            self.allocate_backup_path(demand, network)?;
        }

        let working = demand
            .working_path()
            .cloned()
            .ok_or_else(|| NetworkError::Internal("committed demand lost its working path".into()))?;
        Ok(DemandAllocationResult::Success {
            working,
            backup: demand.backup_path().cloned(),
        })
    }

    /// Steps 2-5 of the shared algorithm, against the backup candidate
    /// set and the squeezed volume. Backup failure never reverts the
    /// working allocation.
    fn allocate_backup_path(&mut self, demand: &mut Demand, network: &mut Network) -> Result<()> {
        let v = demand.squeezed_volume_bucket();
        let routes =
            network.candidate_paths(demand.source(), demand.destination(), demand.working_path());
        if routes.is_empty() {
            return Ok(());
        }
        let candidates = self.rank_candidates(&routes, v, network)?;

        for path in &candidates {
            if demand.allocate(network, path.clone(), v)? {
                if let Some(backup) = demand.backup_path() {
                    self.reward_success(backup, v, network)?;
                }
                return Ok(());
            }
            self.reward_failure(path, v, network)?;
        }
        debug!(demand = %demand.id(), "backup not provisioned");
        Ok(())
    }

    /// Segment every route, pick a modulation per span, score, drop the
    /// unrealizable candidates, and sort by metric ascending (stable, so
    /// ties keep insertion order).
    fn rank_candidates(
        &mut self,
        routes: &[Vec<NodeId>],
        v: usize,
        network: &Network,
    ) -> Result<Vec<PartedPath>> {
        let mut candidates = Vec::with_capacity(routes.len());
        for route in routes {
            let mut path = PartedPath::from_route(route, network)?;
            path.merge_regeneratorless_parts(network.catalogue(), v);
            self.apply_metrics(&mut path, v, network)?;
            candidates.push(path);
        }
        candidates.retain(|p| p.metric().is_finite());
        candidates.sort_by(|a, b| {
            a.metric()
                .partial_cmp(&b.metric())
                .unwrap_or(Ordering::Equal)
        });
        Ok(candidates)
    }

    fn apply_metrics(&mut self, path: &mut PartedPath, v: usize, network: &Network) -> Result<()> {
        for i in 0..path.part_count() {
            let choice = select_modulation(
                &self.qtable,
                network,
                &path.parts()[i],
                v,
                self.config.epsilon,
                self.config.explore_all_formats,
                &mut self.rng,
            )?;
            match choice {
                Some(c) => path.parts_mut()[i].set_modulation(c.modulation, c.cost),
                None => {
                    path.set_metric(f64::INFINITY);
                    return Ok(());
                }
            }
        }
        path.calculate_metric_from_parts();
        path.merge_identical_modulation(network.catalogue(), v);

        if !network.can_switch_modulation() {
            self.unify_modulation(path, v, network)?;
            path.calculate_metric_from_parts();
        }

        if !Self::regenerators_available(path, network)? {
            path.set_metric(f64::INFINITY);
            return Ok(());
        }
        let increment =
            network.regenerator_metric_value() * path.needed_regenerators() as f64;
        path.set_metric(path.metric() + increment);
        Ok(())
    }

    /// Force every span onto the longest span's format. The longest
    /// span's reach covers every shorter span, so feasibility holds.
    fn unify_modulation(
        &mut self,
        path: &mut PartedPath,
        v: usize,
        network: &Network,
    ) -> Result<()> {
        let Some(modulation) = path.modulation_from_longest_part() else {
            return Ok(());
        };
        for i in 0..path.part_count() {
            let key = state_key(&path.parts()[i], v, modulation, network)?;
            let cost = -self.qtable.get(key);
            path.parts_mut()[i].set_modulation(modulation, cost);
        }
        Ok(())
    }

    /// Whether every interior boundary node still has a free regenerator
    /// for each span ending there.
    fn regenerators_available(path: &PartedPath, network: &Network) -> Result<bool> {
        let mut needed: HashMap<NodeId, usize> = HashMap::new();
        for node in path.boundary_nodes() {
            *needed.entry(node).or_insert(0) += 1;
        }
        for (node, count) in needed {
            if network.node(node)?.free_regenerators() < count {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn learning_active(&self) -> bool {
        self.config
            .learning_cap
            .map_or(true, |cap| self.processed <= cap)
    }

    fn reward_success(&mut self, path: &PartedPath, v: usize, network: &Network) -> Result<()> {
        if !self.learning_active() {
            return Ok(());
        }
        let base = success_base(path, network)?;
        for part in path.parts() {
            let Some(modulation) = part.modulation() else {
                continue;
            };
            let reward =
                span_success_reward(part, v, base, self.config.negative_reward, network)?;
            let key = state_key(part, v, modulation, network)?;
            self.qtable.update(
                key,
                reward,
                self.config.learning_rate,
                self.config.discount_factor,
            );
        }
        Ok(())
    }

    /// Failure update over every span of a candidate that never
    /// committed: spans that still fit get the success-shaped reward,
    /// spans with no contiguous run get the penalty.
    fn reward_failure(&mut self, path: &PartedPath, v: usize, network: &Network) -> Result<()> {
        if !self.learning_active() {
            return Ok(());
        }
        let base = success_base(path, network)?;
        for part in path.parts() {
            let Some(modulation) = part.modulation() else {
                continue;
            };
            let slots = network.catalogue().slots(modulation, v);
            let reward = if part.can_fit(network, slots)? {
                span_success_reward(part, v, base, self.config.negative_reward, network)?
            } else {
                span_failure_reward(part, v, self.config.negative_reward, network)?
            };
            let key = state_key(part, v, modulation, network)?;
            self.qtable.update(
                key,
                reward,
                self.config.learning_rate,
                self.config.discount_factor,
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_differ_only_in_shaping_constants() {
        let ql = StrategyConfig::ql();
        let amra = StrategyConfig::amra();
        assert_eq!(ql.epsilon, amra.epsilon);
        assert_eq!(ql.learning_rate, amra.learning_rate);
        assert_eq!(ql.discount_factor, amra.discount_factor);
        assert_ne!(ql.negative_reward, amra.negative_reward);
        assert_ne!(ql.explore_all_formats, amra.explore_all_formats);
    }

    #[test]
    fn test_config_round_trips_through_serde() {
        let config = StrategyConfig::amra();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: StrategyConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.negative_reward, config.negative_reward);
        assert_eq!(parsed.learning_cap, config.learning_cap);
    }
}
