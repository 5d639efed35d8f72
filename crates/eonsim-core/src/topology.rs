//! Network topology: nodes, multi-core links, candidate-route tables,
//! and random link-failure simulation

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{NetworkError, Result};
use crate::modulation::ModulationCatalogue;
use crate::path::PartedPath;
use crate::routes;
use crate::spectrum::Spectrum;

/// Node identifier, a dense index usable as a matrix axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Link identifier, a dense index usable as a matrix axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LinkId(pub usize);

impl std::fmt::Display for LinkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "l{}", self.0)
    }
}

/// Transmission direction over a link: `Up` runs from the link's first
/// endpoint to its second, `Down` the reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
}

/// A network node with its regenerator pool.
#[derive(Debug, Clone)]
pub struct NetworkNode {
    id: NodeId,
    name: String,
    regenerators: usize,
    occupied_regenerators: usize,
}

impl NetworkNode {
    fn new(id: NodeId, name: String, regenerators: usize) -> Self {
        Self {
            id,
            name,
            regenerators,
            occupied_regenerators: 0,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn regenerators(&self) -> usize {
        self.regenerators
    }

    pub fn free_regenerators(&self) -> usize {
        self.regenerators - self.occupied_regenerators
    }

    /// Take `count` regenerators from the pool; false when too few remain.
    pub fn try_occupy_regenerators(&mut self, count: usize) -> bool {
        if self.free_regenerators() < count {
            return false;
        }
        self.occupied_regenerators += count;
        true
    }

    pub fn release_regenerators(&mut self, count: usize) -> Result<()> {
        if count > self.occupied_regenerators {
            return Err(NetworkError::RegeneratorUnderflow(self.id.0));
        }
        self.occupied_regenerators -= count;
        Ok(())
    }

    pub fn clear_occupied(&mut self) {
        self.occupied_regenerators = 0;
    }
}

/// One fiber core: an up and a down spectrum of identical size.
#[derive(Debug, Clone)]
pub struct Core {
    up: Spectrum,
    down: Spectrum,
}

impl Core {
    fn new(slot_count: usize) -> Self {
        Self {
            up: Spectrum::new(slot_count),
            down: Spectrum::new(slot_count),
        }
    }

    pub fn spectrum(&self, direction: Direction) -> &Spectrum {
        match direction {
            Direction::Up => &self.up,
            Direction::Down => &self.down,
        }
    }

    pub fn spectrum_mut(&mut self, direction: Direction) -> &mut Spectrum {
        match direction {
            Direction::Up => &mut self.up,
            Direction::Down => &mut self.down,
        }
    }
}

/// A fiber link between two nodes, possibly multi-core.
#[derive(Debug, Clone)]
pub struct NetworkLink {
    id: LinkId,
    a: NodeId,
    b: NodeId,
    length: f64,
    cores: Vec<Core>,
    failed: bool,
}

impl NetworkLink {
    fn new(id: LinkId, a: NodeId, b: NodeId, length: f64, cores: usize, slot_count: usize) -> Self {
        Self {
            id,
            a,
            b,
            length,
            cores: (0..cores).map(|_| Core::new(slot_count)).collect(),
            failed: false,
        }
    }

    pub fn id(&self) -> LinkId {
        self.id
    }

    pub fn endpoints(&self) -> (NodeId, NodeId) {
        (self.a, self.b)
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn core_count(&self) -> usize {
        self.cores.len()
    }

    pub fn core(&self, core: usize) -> Result<&Core> {
        self.cores.get(core).ok_or(NetworkError::UnknownCore {
            link: self.id.0,
            core,
        })
    }

    /// Direction of travel when entering the link at `from`.
    pub fn direction_from(&self, from: NodeId) -> Direction {
        if from == self.a {
            Direction::Up
        } else {
            Direction::Down
        }
    }

    /// First core (in index order) with a contiguous run of `count` free
    /// slots in `direction`, together with the run's offset.
    pub fn first_fit(&self, direction: Direction, count: usize) -> Option<(usize, usize)> {
        self.cores
            .iter()
            .enumerate()
            .find_map(|(i, core)| core.spectrum(direction).can_allocate(count).map(|o| (i, o)))
    }

    /// Occupied fraction across all cores in `direction`.
    pub fn occupied_percentage(&self, direction: Direction) -> f64 {
        let (occupied, total) = self.cores.iter().fold((0, 0), |(occ, tot), core| {
            let s = core.spectrum(direction);
            (occ + s.occupied_slots(), tot + s.slot_count())
        });
        if total == 0 {
            0.0
        } else {
            occupied as f64 / total as f64
        }
    }

    pub fn reserve(
        &mut self,
        core: usize,
        direction: Direction,
        offset: usize,
        count: usize,
    ) -> Result<()> {
        let link = self.id.0;
        let core = self
            .cores
            .get_mut(core)
            .ok_or(NetworkError::UnknownCore { link, core })?;
        core.spectrum_mut(direction).reserve(offset, count)
    }

    pub fn release(
        &mut self,
        core: usize,
        direction: Direction,
        offset: usize,
        count: usize,
    ) -> Result<()> {
        let link = self.id.0;
        let core = self
            .cores
            .get_mut(core)
            .ok_or(NetworkError::UnknownCore { link, core })?;
        core.spectrum_mut(direction).release(offset, count)
    }

    fn reset_spectrum(&mut self, slot_count: usize) {
        let cores = self.cores.len();
        self.cores = (0..cores).map(|_| Core::new(slot_count)).collect();
    }
}

/// The full network state one simulation run mutates.
#[derive(Debug, Clone)]
pub struct Network {
    nodes: Vec<NetworkNode>,
    links: Vec<NetworkLink>,
    link_index: HashMap<(NodeId, NodeId), LinkId>,
    candidate_routes: HashMap<(NodeId, NodeId), Vec<Vec<NodeId>>>,
    catalogue: ModulationCatalogue,
    slots_per_core: usize,
    regenerator_metric_value: f64,
    can_switch_modulation: bool,
    failed_link: Option<LinkId>,
}

impl Network {
    pub fn builder() -> NetworkBuilder {
        NetworkBuilder::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn nodes(&self) -> &[NetworkNode] {
        &self.nodes
    }

    pub fn links(&self) -> &[NetworkLink] {
        &self.links
    }

    pub fn node(&self, id: NodeId) -> Result<&NetworkNode> {
        self.nodes.get(id.0).ok_or(NetworkError::UnknownNode(id.0))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut NetworkNode> {
        self.nodes
            .get_mut(id.0)
            .ok_or(NetworkError::UnknownNode(id.0))
    }

    pub fn link(&self, id: LinkId) -> Result<&NetworkLink> {
        self.links
            .get(id.0)
            .ok_or(NetworkError::UnknownLinkId(id.0))
    }

    pub fn link_mut(&mut self, id: LinkId) -> Result<&mut NetworkLink> {
        self.links
            .get_mut(id.0)
            .ok_or(NetworkError::UnknownLinkId(id.0))
    }

    pub fn link_between(&self, a: NodeId, b: NodeId) -> Result<LinkId> {
        let key = if a.0 <= b.0 { (a, b) } else { (b, a) };
        self.link_index
            .get(&key)
            .copied()
            .ok_or(NetworkError::UnknownLink { a: a.0, b: b.0 })
    }

    pub fn catalogue(&self) -> &ModulationCatalogue {
        &self.catalogue
    }

    pub fn regenerator_metric_value(&self) -> f64 {
        self.regenerator_metric_value
    }

    pub fn can_switch_modulation(&self) -> bool {
        self.can_switch_modulation
    }

    /// Neighbors of `n` with the connecting link length, skipping failed
    /// links.
    pub(crate) fn neighbors(&self, n: NodeId) -> Vec<(NodeId, f64)> {
        self.links
            .iter()
            .filter(|l| !l.failed)
            .filter_map(|l| {
                if l.a == n {
                    Some((l.b, l.length))
                } else if l.b == n {
                    Some((l.a, l.length))
                } else {
                    None
                }
            })
            .collect()
    }

    /// Ordered candidate routes from `source` to `destination`, filtered
    /// down to routes avoiding failed links and, when `exclude` is given,
    /// routes link-disjoint from that committed path.
    pub fn candidate_paths(
        &self,
        source: NodeId,
        destination: NodeId,
        exclude: Option<&PartedPath>,
    ) -> Vec<Vec<NodeId>> {
        let Some(routes) = self.candidate_routes.get(&(source, destination)) else {
            return Vec::new();
        };
        routes
            .iter()
            .filter(|route| self.route_usable(route, exclude))
            .cloned()
            .collect()
    }

    fn route_usable(&self, route: &[NodeId], exclude: Option<&PartedPath>) -> bool {
        route.windows(2).all(|hop| {
            match self.link_between(hop[0], hop[1]) {
                Ok(id) => {
                    let alive = !self.links[id.0].failed;
                    let disjoint = exclude.map_or(true, |p| !p.uses_link(id));
                    alive && disjoint
                }
                Err(_) => false,
            }
        })
    }

    /// Restore any previously-cut link, then cut one random live link.
    ///
    /// Allocations crossing the cut link are the caller's to release; the
    /// failed link is excluded from candidate enumeration until the next
    /// cut.
    pub fn cut_link(&mut self, rng: &mut StdRng) -> Option<LinkId> {
        if let Some(prev) = self.failed_link.take() {
            self.links[prev.0].failed = false;
        }
        if self.links.is_empty() {
            return None;
        }
        let id = LinkId(rng.gen_range(0..self.links.len()));
        self.links[id.0].failed = true;
        self.failed_link = Some(id);
        debug!(link = %id, "link cut");
        Some(id)
    }

    /// Mark a specific link failed, for driving failure scenarios.
    pub fn fail_link(&mut self, id: LinkId) -> Result<()> {
        if let Some(prev) = self.failed_link.take() {
            self.links[prev.0].failed = false;
        }
        self.link_mut(id)?.failed = true;
        self.failed_link = Some(id);
        Ok(())
    }

    /// Reset all mutable run state: fresh spectra, free regenerator
    /// pools, failed link restored.
    pub fn reset(&mut self) {
        let slot_count = self.slots_per_core;
        for link in &mut self.links {
            link.reset_spectrum(slot_count);
            link.failed = false;
        }
        for node in &mut self.nodes {
            node.clear_occupied();
        }
        self.failed_link = None;
    }
}

/// Builder for [`Network`]; candidate-route tables are computed at
/// [`build`](NetworkBuilder::build) time.
#[derive(Debug, Clone)]
pub struct NetworkBuilder {
    nodes: Vec<(String, usize)>,
    links: Vec<(NodeId, NodeId, f64)>,
    slots_per_core: usize,
    cores_per_link: usize,
    candidates_per_pair: usize,
    catalogue: ModulationCatalogue,
    regenerator_metric_value: f64,
    can_switch_modulation: bool,
}

impl Default for NetworkBuilder {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            links: Vec::new(),
            slots_per_core: 80,
            cores_per_link: 1,
            candidates_per_pair: 3,
            catalogue: ModulationCatalogue::standard(),
            regenerator_metric_value: 25.0,
            can_switch_modulation: true,
        }
    }
}

impl NetworkBuilder {
    pub fn add_node(&mut self, name: impl Into<String>, regenerators: usize) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push((name.into(), regenerators));
        id
    }

    pub fn add_link(&mut self, a: NodeId, b: NodeId, length: f64) -> &mut Self {
        self.links.push((a, b, length));
        self
    }

    pub fn slots_per_core(&mut self, slots: usize) -> &mut Self {
        self.slots_per_core = slots;
        self
    }

    pub fn cores_per_link(&mut self, cores: usize) -> &mut Self {
        self.cores_per_link = cores;
        self
    }

    pub fn candidates_per_pair(&mut self, k: usize) -> &mut Self {
        self.candidates_per_pair = k;
        self
    }

    pub fn catalogue(&mut self, catalogue: ModulationCatalogue) -> &mut Self {
        self.catalogue = catalogue;
        self
    }

    pub fn regenerator_metric_value(&mut self, value: f64) -> &mut Self {
        self.regenerator_metric_value = value;
        self
    }

    pub fn can_switch_modulation(&mut self, can: bool) -> &mut Self {
        self.can_switch_modulation = can;
        self
    }

    pub fn build(&self) -> Result<Network> {
        if self.nodes.is_empty() {
            return Err(NetworkError::Topology("network has no nodes".into()));
        }
        let nodes: Vec<NetworkNode> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, (name, regenerators))| {
                NetworkNode::new(NodeId(i), name.clone(), *regenerators)
            })
            .collect();

        let mut links = Vec::with_capacity(self.links.len());
        let mut link_index = HashMap::new();
        for &(a, b, length) in &self.links {
            if a.0 >= nodes.len() || b.0 >= nodes.len() {
                return Err(NetworkError::Topology(format!(
                    "link {a}-{b} references an unknown node"
                )));
            }
            if a == b {
                return Err(NetworkError::Topology(format!("self-link at {a}")));
            }
            if length <= 0.0 {
                return Err(NetworkError::Topology(format!(
                    "link {a}-{b} has non-positive length"
                )));
            }
            let key = if a.0 <= b.0 { (a, b) } else { (b, a) };
            if link_index.contains_key(&key) {
                return Err(NetworkError::Topology(format!("duplicate link {a}-{b}")));
            }
            let id = LinkId(links.len());
            link_index.insert(key, id);
            links.push(NetworkLink::new(
                id,
                key.0,
                key.1,
                length,
                self.cores_per_link,
                self.slots_per_core,
            ));
        }

        let mut network = Network {
            nodes,
            links,
            link_index,
            candidate_routes: HashMap::new(),
            catalogue: self.catalogue.clone(),
            slots_per_core: self.slots_per_core,
            regenerator_metric_value: self.regenerator_metric_value,
            can_switch_modulation: self.can_switch_modulation,
            failed_link: None,
        };
        network.candidate_routes = routes::candidate_route_table(&network, self.candidates_per_pair);
        Ok(network)
    }
}
