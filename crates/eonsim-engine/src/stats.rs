//! Run counters and the serializable result summary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use eonsim_core::{Demand, DemandAllocationResult, Modulation, PartedPath};

/// Read-only counters a run accumulates.
///
/// The three blocked categories are expected steady-state outcomes,
/// counted rather than treated as errors.
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    pub total_volume: f64,
    pub spectrum_blocked_volume: f64,
    pub regenerators_blocked_volume: f64,
    pub link_failure_blocked_volume: f64,
    pub unhandled_volume: f64,
    pub allocations: u64,
    pub regenerators_used: u64,
    pub modulation_usage: [f64; Modulation::COUNT],
}

impl RunStats {
    /// Record one handled demand and its allocation outcome.
    pub fn record(&mut self, demand: &Demand, result: &DemandAllocationResult) {
        self.total_volume += demand.volume();
        match result {
            DemandAllocationResult::Success { working, backup } => {
                self.allocations += 1;
                self.regenerators_used += working.needed_regenerators() as u64;
                if let Some(backup) = backup {
                    self.regenerators_used += backup.needed_regenerators() as u64;
                }
                self.record_modulation_usage(working);
            }
            DemandAllocationResult::NoSpectrum => {
                self.spectrum_blocked_volume += demand.volume();
            }
            DemandAllocationResult::NoRegenerators => {
                self.regenerators_blocked_volume += demand.volume();
            }
        }
    }

    fn record_modulation_usage(&mut self, working: &PartedPath) {
        let parts = working.part_count() as f64;
        for part in working.parts() {
            if let Some(m) = part.modulation() {
                self.modulation_usage[m.index()] += 1.0 / parts;
            }
        }
    }

    /// Record a demand that lost its working path to a link cut and
    /// could not be reallocated.
    pub fn record_link_failure_blocked(&mut self, volume: f64) {
        self.link_failure_blocked_volume += volume;
    }

    /// Record a demand skipped after a structural failure; its volume
    /// still counts toward the run total.
    pub fn record_unhandled(&mut self, volume: f64) {
        self.unhandled_volume += volume;
        self.total_volume += volume;
    }

    pub fn regenerators_per_allocation(&self) -> f64 {
        if self.allocations == 0 {
            0.0
        } else {
            self.regenerators_used as f64 / self.allocations as f64
        }
    }

    pub fn spectrum_blocked_fraction(&self) -> f64 {
        self.blocked_fraction(self.spectrum_blocked_volume)
    }

    pub fn regenerators_blocked_fraction(&self) -> f64 {
        self.blocked_fraction(self.regenerators_blocked_volume)
    }

    pub fn link_failure_blocked_fraction(&self) -> f64 {
        self.blocked_fraction(self.link_failure_blocked_volume)
    }

    fn blocked_fraction(&self, blocked: f64) -> f64 {
        if self.total_volume == 0.0 {
            0.0
        } else {
            blocked / self.total_volume
        }
    }
}

/// Serializable end-of-run summary, the minimal result contract an
/// external reporter persists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub algorithm: String,
    pub erlang: f64,
    pub seed: u64,
    pub alpha: f64,
    pub demand_target: u64,
    pub demands_generated: u64,
    pub total_volume: f64,
    pub spectrum_blocked_volume: f64,
    pub regenerators_blocked_volume: f64,
    pub link_failure_blocked_volume: f64,
    pub unhandled_volume: f64,
    pub allocations: u64,
    pub regenerators_per_allocation: f64,
    pub modulation_usage: Vec<f64>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn new(
        algorithm: String,
        erlang: f64,
        seed: u64,
        alpha: f64,
        demand_target: u64,
        demands_generated: u64,
        stats: &RunStats,
    ) -> Self {
        Self {
            algorithm,
            erlang,
            seed,
            alpha,
            demand_target,
            demands_generated,
            total_volume: stats.total_volume,
            spectrum_blocked_volume: stats.spectrum_blocked_volume,
            regenerators_blocked_volume: stats.regenerators_blocked_volume,
            link_failure_blocked_volume: stats.link_failure_blocked_volume,
            unhandled_volume: stats.unhandled_volume,
            allocations: stats.allocations,
            regenerators_per_allocation: stats.regenerators_per_allocation(),
            modulation_usage: stats.modulation_usage.to_vec(),
            finished_at: Utc::now(),
        }
    }
}
