//! The sequential simulation loop
//!
//! Demand processing is strictly sequential: the spectrum bitmaps and
//! the Q-table are shared mutable state and the all-or-nothing commit
//! depends on non-interleaved access. The only concurrency is the
//! supervisory [`ControlHandle`], checked at demand boundaries.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use eonsim_core::{Demand, Network, NetworkError, Result};
use eonsim_rl::RmsaStrategy;

use crate::control::ControlHandle;
use crate::generator::TrafficGenerator;
use crate::stats::{RunStats, RunSummary};

/// One simulation run: network, generator, strategy, and counters.
///
/// Each run owns its state exclusively; parameter sweeps build one
/// `Simulation` per worker.
pub struct Simulation {
    network: Network,
    generator: TrafficGenerator,
    strategy: RmsaStrategy,
    stats: RunStats,
    active: Vec<Demand>,
    control: ControlHandle,
    link_cutter: StdRng,
    alpha: f64,
    erlang: f64,
    seed: u64,
}

impl Simulation {
    pub fn new(
        network: Network,
        generator: TrafficGenerator,
        strategy: RmsaStrategy,
        alpha: f64,
        erlang: f64,
        seed: u64,
        control: ControlHandle,
    ) -> Self {
        Self {
            network,
            generator,
            strategy,
            stats: RunStats::default(),
            active: Vec::new(),
            control,
            link_cutter: StdRng::seed_from_u64(seed),
            alpha,
            erlang,
            seed,
        }
    }

    pub fn control(&self) -> ControlHandle {
        self.control.clone()
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn strategy(&self) -> &RmsaStrategy {
        &self.strategy
    }

    pub fn generated_count(&self) -> u64 {
        self.generator.generated_count()
    }

    /// Drive the run to completion (or cancellation).
    ///
    /// A structural network error ends provisioning: the remaining
    /// demands are drained into the unhandled counter and held
    /// resources are released, so the run still reports consistently.
    pub fn run(&mut self) {
        info!(
            demands = self.generator.target(),
            erlang = self.erlang,
            alpha = self.alpha,
            algorithm = self.strategy.name(),
            "simulation started"
        );

        let mut structural: Option<NetworkError> = None;
        while let Some(demand) = self.generator.next() {
            let outcome = self.step(demand);
            if let Err(e) = outcome {
                structural = Some(e);
                break;
            }

            self.control.wait_while_paused();
            if self.control.is_cancelled() {
                info!("simulation cancelled");
                break;
            }
        }

        if let Some(error) = structural {
            warn!(%error, "structural network failure, draining remaining demands");
            while let Some(demand) = self.generator.next() {
                self.stats.record_unhandled(demand.volume());
            }
        }

        self.release_active();

        info!(
            total_volume = self.stats.total_volume,
            spectrum_blocked_pct = self.stats.spectrum_blocked_fraction() * 100.0,
            regenerators_blocked_pct = self.stats.regenerators_blocked_fraction() * 100.0,
            link_failure_blocked_pct = self.stats.link_failure_blocked_fraction() * 100.0,
            allocations = self.stats.allocations,
            "simulation finished"
        );
    }

    /// One loop iteration: either a link-cut event with reallocation, or
    /// ordinary demand handling, then demand aging.
    fn step(&mut self, demand: Demand) -> Result<()> {
        if self.link_cutter.gen::<f64>() < self.alpha / self.erlang {
            self.cut_and_reallocate()?;
        } else {
            let is_anycast = demand.is_anycast();
            self.handle_demand(demand)?;
            if is_anycast {
                if let Some(pair) = self.generator.next() {
                    self.handle_demand(pair)?;
                }
            }
        }
        self.age_demands()
    }

    fn handle_demand(&mut self, mut demand: Demand) -> Result<()> {
        let result = self.strategy.allocate_demand(&mut demand, &mut self.network)?;
        self.stats.record(&demand, &result);
        if result.is_success() {
            self.active.push(demand);
        }
        Ok(())
    }

    /// Cut one random link; demands whose working path crossed it are
    /// released and reallocated. A reallocation success is re-handled as
    /// an ordinary successful allocation; a failure adds the volume to
    /// the link-failure counter exactly once.
    fn cut_and_reallocate(&mut self) -> Result<()> {
        let Some(link) = self.network.cut_link(&mut self.link_cutter) else {
            return Ok(());
        };

        let mut affected = Vec::new();
        let mut kept = Vec::with_capacity(self.active.len());
        for mut demand in self.active.drain(..) {
            if demand.backup_path().is_some_and(|p| p.uses_link(link)) {
                demand.release_backup(&mut self.network)?;
            }
            if demand.working_path().is_some_and(|p| p.uses_link(link)) {
                demand.release_working(&mut self.network)?;
                affected.push(demand);
            } else {
                kept.push(demand);
            }
        }
        self.active = kept;

        for mut demand in affected {
            let result = self.strategy.allocate_demand(&mut demand, &mut self.network)?;
            if result.is_success() {
                self.stats.record(&demand, &result);
                self.active.push(demand);
            } else {
                self.stats.record_link_failure_blocked(demand.volume());
            }
        }
        Ok(())
    }

    /// Age active demands one tick and release the expired ones.
    fn age_demands(&mut self) -> Result<()> {
        let mut expired = Vec::new();
        let mut kept = Vec::with_capacity(self.active.len());
        for mut demand in self.active.drain(..) {
            demand.tick();
            if demand.expired() {
                expired.push(demand);
            } else {
                kept.push(demand);
            }
        }
        self.active = kept;
        for mut demand in expired {
            demand.release(&mut self.network)?;
        }
        Ok(())
    }

    fn release_active(&mut self) {
        for mut demand in std::mem::take(&mut self.active) {
            if let Err(error) = demand.release(&mut self.network) {
                warn!(demand = %demand.id(), %error, "failed to release demand at run end");
            }
        }
    }

    /// Build the serializable end-of-run summary.
    pub fn summary(&self) -> RunSummary {
        RunSummary::new(
            self.strategy.name().to_string(),
            self.erlang,
            self.seed,
            self.alpha,
            self.generator.target(),
            self.generator.generated_count(),
            &self.stats,
        )
    }
}
