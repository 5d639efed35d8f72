//! Traffic generation: a finite, seeded, non-restartable demand sequence

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use eonsim_core::{Demand, Network, NodeId};

use crate::config::TrafficConfig;

/// Produces demands until the configured target count is reached.
///
/// Anycast arrivals occupy two consecutive positions in the sequence:
/// the flexible-destination pair leg is emitted directly after its
/// sibling. The sequence cannot be restarted; build a new generator for
/// a new run.
pub struct TrafficGenerator {
    rng: StdRng,
    nodes: Vec<NodeId>,
    target: u64,
    generated: u64,
    erlang: f64,
    replica_preservation: bool,
    traffic: TrafficConfig,
    pending_pair: Option<Demand>,
}

impl TrafficGenerator {
    pub fn new(
        network: &Network,
        target: u64,
        erlang: f64,
        replica_preservation: bool,
        traffic: TrafficConfig,
        seed: u64,
    ) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            nodes: network.nodes().iter().map(|n| n.id()).collect(),
            target,
            generated: 0,
            erlang,
            replica_preservation,
            traffic,
            pending_pair: None,
        }
    }

    /// Demands produced so far, pair legs included.
    pub fn generated_count(&self) -> u64 {
        self.generated
    }

    pub fn target(&self) -> u64 {
        self.target
    }

    fn random_volume(&mut self) -> f64 {
        let min_step = (self.traffic.min_volume / 10.0).ceil().max(1.0) as u64;
        let max_step = (self.traffic.max_volume / 10.0).floor().max(min_step as f64) as u64;
        10.0 * self.rng.gen_range(min_step..=max_step) as f64
    }

    fn random_holding_time(&mut self) -> u64 {
        // exponential holding with mean `erlang` ticks; one arrival per
        // tick makes the offered load equal the configured erlang
        let u: f64 = 1.0 - self.rng.gen::<f64>();
        (-u.ln() * self.erlang).ceil().max(1.0) as u64
    }

    fn random_node_pair(&mut self) -> (NodeId, NodeId) {
        let source = self.nodes[self.rng.gen_range(0..self.nodes.len())];
        loop {
            let destination = self.nodes[self.rng.gen_range(0..self.nodes.len())];
            if destination != source {
                return (source, destination);
            }
        }
    }

    fn build_demand(&mut self, source: NodeId, destination: NodeId, volume: f64) -> Demand {
        let holding = self.random_holding_time();
        let mut demand = Demand::new(source, destination, volume, holding);
        if self.rng.gen::<f64>() < self.traffic.backup_ratio {
            let squeezed = if self.replica_preservation {
                volume
            } else {
                volume * self.traffic.squeeze_ratio
            };
            demand = demand.with_backup(squeezed);
        }
        demand
    }
}

impl Iterator for TrafficGenerator {
    type Item = Demand;

    fn next(&mut self) -> Option<Demand> {
        if let Some(pair) = self.pending_pair.take() {
            self.generated += 1;
            return Some(pair);
        }
        if self.generated >= self.target {
            return None;
        }
        if self.nodes.len() < 2 {
            return None;
        }
        self.generated += 1;

        let (source, destination) = self.random_node_pair();
        let volume = self.random_volume();

        if self.nodes.len() >= 3 && self.rng.gen::<f64>() < self.traffic.anycast_ratio {
            // anycast: two independently tracked legs from one source
            let second_destination = loop {
                let candidate = self.nodes[self.rng.gen_range(0..self.nodes.len())];
                if candidate != source && candidate != destination {
                    break candidate;
                }
            };
            let first = self.build_demand(source, destination, volume).with_anycast();
            let second = self
                .build_demand(source, second_destination, volume)
                .with_anycast();
            self.pending_pair = Some(second);
            return Some(first);
        }

        Some(self.build_demand(source, destination, volume))
    }
}
