//! Dense Q-value table over (link, volume bucket, usage bucket, modulation)

use ndarray::Array4;

use eonsim_core::{LinkId, Modulation, VOLUME_BUCKETS};

/// Number of link-usage buckets (10% steps).
pub const USAGE_BUCKETS: usize = 10;

/// One Q-table cell address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateKey {
    pub link: LinkId,
    pub volume: usize,
    pub usage: usize,
    pub modulation: Modulation,
}

/// Per-run Q-value table, zero-initialized and reset once per run.
///
/// The table-wide maximum feeds every temporal-difference update, so it
/// is cached and only rescanned when the previous maximum is lowered.
#[derive(Debug, Clone, PartialEq)]
pub struct QTable {
    values: Array4<f64>,
    max: f64,
}

impl QTable {
    pub fn new(link_count: usize) -> Self {
        Self {
            values: Array4::zeros((link_count, VOLUME_BUCKETS, USAGE_BUCKETS, Modulation::COUNT)),
            max: 0.0,
        }
    }

    pub fn link_count(&self) -> usize {
        self.values.shape()[0]
    }

    pub fn reset(&mut self) {
        self.values.fill(0.0);
        self.max = 0.0;
    }

    /// Usage bucket for an occupancy fraction:
    /// `clamp(floor(percentage * 10), 0, 9)`.
    pub fn usage_bucket(occupied_percentage: f64) -> usize {
        let bucket = (occupied_percentage * USAGE_BUCKETS as f64).floor() as i64;
        bucket.clamp(0, USAGE_BUCKETS as i64 - 1) as usize
    }

    pub fn get(&self, key: StateKey) -> f64 {
        self.values[Self::index(key)]
    }

    /// Table-wide maximum Q value.
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Temporal-difference update:
    /// `newQ = oldQ + alpha * (reward + gamma * max(Q) - oldQ)`.
    ///
    /// Returns the new value.
    pub fn update(&mut self, key: StateKey, reward: f64, alpha: f64, gamma: f64) -> f64 {
        let old = self.get(key);
        let new = old + alpha * (reward + gamma * self.max - old);
        self.set(key, new);
        new
    }

    fn set(&mut self, key: StateKey, value: f64) {
        let index = Self::index(key);
        let old = self.values[index];
        self.values[index] = value;
        if value >= self.max {
            self.max = value;
        } else if old == self.max {
            self.max = self
                .values
                .iter()
                .copied()
                .fold(f64::NEG_INFINITY, f64::max);
        }
    }

    /// Highest-Q format among `feasible` for the given state; ties go to
    /// the more spectrally efficient (higher-index) format.
    pub fn best_feasible(
        &self,
        link: LinkId,
        volume: usize,
        usage: usize,
        feasible: &[Modulation],
    ) -> Option<(Modulation, f64)> {
        let mut best: Option<(Modulation, f64)> = None;
        for &m in feasible {
            let q = self.get(StateKey {
                link,
                volume,
                usage,
                modulation: m,
            });
            match best {
                Some((_, best_q)) if q < best_q => {}
                _ => best = Some((m, q)),
            }
        }
        best
    }

    fn index(key: StateKey) -> (usize, usize, usize, usize) {
        (key.link.0, key.volume, key.usage, key.modulation.index())
    }
}
