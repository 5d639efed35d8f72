//! Parted paths: segmentation of a route into modulation-feasible spans

use serde::{Deserialize, Serialize};

use crate::error::{NetworkError, Result};
use crate::modulation::{Modulation, ModulationCatalogue};
use crate::topology::{Direction, LinkId, Network, NodeId};

/// A slot range committed on one traversed link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedRange {
    pub link: LinkId,
    pub core: usize,
    pub direction: Direction,
    pub offset: usize,
    pub count: usize,
}

/// Contiguous span between regenerator sites (or route endpoints).
///
/// Created during segmentation; the modulation and the reserved slot
/// ranges are filled in as the span is decided and committed.
#[derive(Debug, Clone)]
pub struct PathPart {
    nodes: Vec<NodeId>,
    length: f64,
    modulation: Option<Modulation>,
    cost: f64,
    reserved: Vec<ReservedRange>,
}

impl PathPart {
    fn from_hop(a: NodeId, b: NodeId, length: f64) -> Self {
        Self {
            nodes: vec![a, b],
            length,
            modulation: None,
            cost: 0.0,
            reserved: Vec::new(),
        }
    }

    pub fn source(&self) -> NodeId {
        self.nodes[0]
    }

    pub fn destination(&self) -> NodeId {
        self.nodes[self.nodes.len() - 1]
    }

    /// Node sequence of the span, endpoints included.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Physical length of the span in km.
    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn modulation(&self) -> Option<Modulation> {
        self.modulation
    }

    /// Ranking cost contributed by this span.
    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn set_modulation(&mut self, modulation: Modulation, cost: f64) {
        self.modulation = Some(modulation);
        self.cost = cost;
    }

    pub fn reserved(&self) -> &[ReservedRange] {
        &self.reserved
    }

    pub(crate) fn set_reserved(&mut self, reserved: Vec<ReservedRange>) {
        self.reserved = reserved;
    }

    pub(crate) fn clear_reserved(&mut self) {
        self.reserved.clear();
    }

    /// Each hop of the span as (link, direction of travel).
    pub fn hops(&self, network: &Network) -> Result<Vec<(LinkId, Direction)>> {
        self.nodes
            .windows(2)
            .map(|hop| {
                let id = network.link_between(hop[0], hop[1])?;
                let direction = network.link(id)?.direction_from(hop[0]);
                Ok((id, direction))
            })
            .collect()
    }

    /// Occupancy of the busiest traversed link, in the direction of
    /// travel.
    pub fn occupied_percentage(&self, network: &Network) -> Result<f64> {
        let mut busiest = 0.0_f64;
        for (id, direction) in self.hops(network)? {
            busiest = busiest.max(network.link(id)?.occupied_percentage(direction));
        }
        Ok(busiest)
    }

    /// The traversed link with the highest occupancy in the direction of
    /// travel.
    pub fn busiest_link(&self, network: &Network) -> Result<LinkId> {
        let hops = self.hops(network)?;
        let mut best = None;
        let mut best_occupancy = -1.0;
        for (id, direction) in hops {
            let occupancy = network.link(id)?.occupied_percentage(direction);
            if occupancy > best_occupancy {
                best_occupancy = occupancy;
                best = Some(id);
            }
        }
        best.ok_or(NetworkError::EmptyRoute)
    }

    /// Whether every traversed link still has a contiguous run of `count`
    /// free slots on some core.
    pub fn can_fit(&self, network: &Network, count: usize) -> Result<bool> {
        for (id, direction) in self.hops(network)? {
            if network.link(id)?.first_fit(direction, count).is_none() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Extend this span over the next one; modulation is reset since the
    /// merged span must be re-decided.
    fn absorb(&mut self, next: PathPart) {
        debug_assert_eq!(self.destination(), next.source());
        self.nodes.extend_from_slice(&next.nodes[1..]);
        self.length += next.length;
        self.modulation = None;
        self.cost = 0.0;
    }

    /// Merge a same-modulation successor, keeping modulation and summing
    /// costs.
    fn absorb_identical(&mut self, next: PathPart) {
        debug_assert_eq!(self.destination(), next.source());
        debug_assert_eq!(self.modulation, next.modulation);
        self.nodes.extend_from_slice(&next.nodes[1..]);
        self.length += next.length;
        self.cost += next.cost;
    }
}

/// Ordered sequence of spans covering one candidate route.
///
/// Invariant: `part[i].destination() == part[i + 1].source()`.
#[derive(Debug, Clone)]
pub struct PartedPath {
    parts: Vec<PathPart>,
    metric: f64,
    committed_regenerators: Vec<NodeId>,
}

impl PartedPath {
    /// Build a parted path from a candidate route, one span per hop.
    pub fn from_route(route: &[NodeId], network: &Network) -> Result<Self> {
        if route.len() < 2 {
            return Err(NetworkError::EmptyRoute);
        }
        let mut parts = Vec::with_capacity(route.len() - 1);
        for hop in route.windows(2) {
            let id = network.link_between(hop[0], hop[1])?;
            let length = network.link(id)?.length();
            parts.push(PathPart::from_hop(hop[0], hop[1], length));
        }
        Ok(Self {
            parts,
            metric: 0.0,
            committed_regenerators: Vec::new(),
        })
    }

    pub fn parts(&self) -> &[PathPart] {
        &self.parts
    }

    pub fn parts_mut(&mut self) -> &mut [PathPart] {
        &mut self.parts
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    pub fn source(&self) -> NodeId {
        self.parts[0].source()
    }

    pub fn destination(&self) -> NodeId {
        self.parts[self.parts.len() - 1].destination()
    }

    pub fn metric(&self) -> f64 {
        self.metric
    }

    pub fn set_metric(&mut self, metric: f64) {
        self.metric = metric;
    }

    /// Regenerators this path needs: one per interior span boundary.
    pub fn needed_regenerators(&self) -> usize {
        self.parts.len().saturating_sub(1)
    }

    /// Interior boundary nodes, one entry per needed regenerator.
    pub fn boundary_nodes(&self) -> Vec<NodeId> {
        self.parts[1..].iter().map(PathPart::source).collect()
    }

    /// Whether any committed slot range of this path crosses `link`.
    pub fn uses_link(&self, link: LinkId) -> bool {
        self.parts
            .iter()
            .flat_map(|p| p.reserved.iter())
            .any(|r| r.link == link)
    }

    /// Highest busiest-link occupancy across all spans.
    pub fn max_occupied_percentage(&self, network: &Network) -> Result<f64> {
        let mut max = 0.0_f64;
        for part in &self.parts {
            max = max.max(part.occupied_percentage(network)?);
        }
        Ok(max)
    }

    /// Greedy left-to-right segmentation: extend each span while some
    /// catalogue format can reach the combined length at bucket `v`.
    ///
    /// Greedy-longest-reach yields the minimal regenerator count because
    /// reach is monotone in format order and length is additive along a
    /// simple route.
    pub fn merge_regeneratorless_parts(&mut self, catalogue: &ModulationCatalogue, v: usize) {
        let max_reach = catalogue.max_reach(v);
        let mut i = 0;
        while i + 1 < self.parts.len() {
            let combined = self.parts[i].length() + self.parts[i + 1].length();
            if max_reach > combined {
                let next = self.parts.remove(i + 1);
                self.parts[i].absorb(next);
            } else {
                i += 1;
            }
        }
    }

    /// Coalesce adjacent spans that resolved to the same modulation, as
    /// long as the format still reaches the combined length at bucket `v`.
    pub fn merge_identical_modulation(&mut self, catalogue: &ModulationCatalogue, v: usize) {
        let mut i = 0;
        while i + 1 < self.parts.len() {
            let (a, b) = (&self.parts[i], &self.parts[i + 1]);
            let mergeable = match (a.modulation(), b.modulation()) {
                (Some(ma), Some(mb)) if ma == mb => {
                    catalogue.reach(ma, v) > a.length() + b.length()
                }
                _ => false,
            };
            if mergeable {
                let next = self.parts.remove(i + 1);
                self.parts[i].absorb_identical(next);
            } else {
                i += 1;
            }
        }
    }

    /// Metric = sum of per-span costs; the regenerator increment is the
    /// strategy's to add.
    pub fn calculate_metric_from_parts(&mut self) {
        self.metric = self.parts.iter().map(PathPart::cost).sum();
    }

    /// Modulation of the longest span, used to unify formats on networks
    /// that cannot switch modulation at regenerators.
    pub fn modulation_from_longest_part(&self) -> Option<Modulation> {
        self.parts
            .iter()
            .max_by(|a, b| {
                a.length()
                    .partial_cmp(&b.length())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .and_then(PathPart::modulation)
    }

    pub fn committed_regenerators(&self) -> &[NodeId] {
        &self.committed_regenerators
    }

    pub(crate) fn set_committed_regenerators(&mut self, nodes: Vec<NodeId>) {
        self.committed_regenerators = nodes;
    }

    pub(crate) fn clear_committed(&mut self) {
        self.committed_regenerators.clear();
        for part in &mut self.parts {
            part.clear_reserved();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modulation::VOLUME_BUCKETS;

    fn line(lengths: &[f64]) -> Network {
        let mut b = Network::builder();
        let mut prev = b.add_node("n0", 8);
        for (i, &length) in lengths.iter().enumerate() {
            let node = b.add_node(format!("n{}", i + 1), 8);
            b.add_link(prev, node, length);
            prev = node;
        }
        b.build().unwrap()
    }

    fn flat_catalogue(reaches: [f64; Modulation::COUNT]) -> ModulationCatalogue {
        let reach = reaches.iter().map(|&r| [r; VOLUME_BUCKETS]).collect();
        let slots = (0..Modulation::COUNT)
            .map(|m| [Modulation::COUNT - m; VOLUME_BUCKETS])
            .collect();
        ModulationCatalogue::new(reach, slots)
    }

    #[test]
    fn test_from_route_builds_one_part_per_hop() {
        let net = line(&[100.0, 200.0, 50.0]);
        let route: Vec<NodeId> = (0..4).map(NodeId).collect();
        let path = PartedPath::from_route(&route, &net).unwrap();
        assert_eq!(path.part_count(), 3);
        assert_eq!(path.source(), NodeId(0));
        assert_eq!(path.destination(), NodeId(3));
        for pair in path.parts().windows(2) {
            assert_eq!(pair[0].destination(), pair[1].source());
        }
    }

    #[test]
    fn test_greedy_merge_respects_reach() {
        // max reach 300: [100, 150] merges, extending over the next 100
        // would exceed it
        let net = line(&[100.0, 150.0, 100.0]);
        let catalogue = flat_catalogue([300.0, 250.0, 200.0, 150.0, 120.0, 110.0]);
        let route: Vec<NodeId> = (0..4).map(NodeId).collect();
        let mut path = PartedPath::from_route(&route, &net).unwrap();

        path.merge_regeneratorless_parts(&catalogue, 0);

        assert_eq!(path.part_count(), 2);
        assert_eq!(path.parts()[0].length(), 250.0);
        assert_eq!(path.parts()[1].length(), 100.0);
        assert_eq!(path.needed_regenerators(), 1);
        assert_eq!(path.boundary_nodes(), vec![NodeId(2)]);
    }

    #[test]
    fn test_unreachable_hop_stays_unmerged() {
        let net = line(&[500.0, 100.0]);
        let catalogue = flat_catalogue([300.0, 250.0, 200.0, 150.0, 120.0, 110.0]);
        let route: Vec<NodeId> = (0..3).map(NodeId).collect();
        let mut path = PartedPath::from_route(&route, &net).unwrap();

        path.merge_regeneratorless_parts(&catalogue, 0);

        // the 500 km hop exceeds every reach; no feasible modulation
        // exists for it and the candidate will be rejected downstream
        assert_eq!(path.part_count(), 2);
        assert!(catalogue.feasible(0, path.parts()[0].length()).is_empty());
    }

    #[test]
    fn test_merge_identical_modulation() {
        let net = line(&[100.0, 100.0, 100.0]);
        let catalogue = flat_catalogue([1000.0, 250.0, 200.0, 150.0, 120.0, 110.0]);
        let route: Vec<NodeId> = (0..4).map(NodeId).collect();
        let mut path = PartedPath::from_route(&route, &net).unwrap();

        path.parts_mut()[0].set_modulation(Modulation::Qpsk, 1.0);
        path.parts_mut()[1].set_modulation(Modulation::Qpsk, 2.0);
        path.parts_mut()[2].set_modulation(Modulation::Bpsk, 3.0);

        path.merge_identical_modulation(&catalogue, 0);

        // QPSK reach 250 covers 100 + 100
        assert_eq!(path.part_count(), 2);
        assert_eq!(path.parts()[0].modulation(), Some(Modulation::Qpsk));
        assert_eq!(path.parts()[0].cost(), 3.0);
        assert_eq!(path.parts()[0].length(), 200.0);

        path.calculate_metric_from_parts();
        assert_eq!(path.metric(), 6.0);
    }

    #[test]
    fn test_modulation_from_longest_part() {
        let net = line(&[100.0, 300.0]);
        let route: Vec<NodeId> = (0..3).map(NodeId).collect();
        let mut path = PartedPath::from_route(&route, &net).unwrap();
        path.parts_mut()[0].set_modulation(Modulation::Qam16, 0.0);
        path.parts_mut()[1].set_modulation(Modulation::Qpsk, 0.0);
        assert_eq!(path.modulation_from_longest_part(), Some(Modulation::Qpsk));
    }
}
