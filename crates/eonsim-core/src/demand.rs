//! Provisioning demands and the all-or-nothing allocation lifecycle

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::trace;
use uuid::Uuid;

use crate::error::{NetworkError, Result};
use crate::modulation::volume_bucket;
use crate::path::{PartedPath, ReservedRange};
use crate::topology::{Network, NodeId};

/// Demand identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DemandId(pub Uuid);

impl DemandId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DemandId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DemandId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of one demand allocation attempt.
///
/// The blocked variants are expected steady-state outcomes, counted by
/// the driver rather than treated as errors.
#[derive(Debug, Clone)]
pub enum DemandAllocationResult {
    Success {
        working: PartedPath,
        backup: Option<PartedPath>,
    },
    /// No candidate yielded a committable contiguous slot range.
    NoSpectrum,
    /// Every candidate failed modulation/regenerator feasibility before
    /// spectrum was attempted.
    NoRegenerators,
}

impl DemandAllocationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, DemandAllocationResult::Success { .. })
    }
}

/// A provisioning request with its committed paths.
#[derive(Debug, Clone)]
pub struct Demand {
    id: DemandId,
    source: NodeId,
    destination: NodeId,
    volume: f64,
    squeezed_volume: f64,
    anycast: bool,
    wants_backup: bool,
    holding_time: u64,
    age: u64,
    working: Option<PartedPath>,
    backup: Option<PartedPath>,
}

impl Demand {
    pub fn new(source: NodeId, destination: NodeId, volume: f64, holding_time: u64) -> Self {
        Self {
            id: DemandId::new(),
            source,
            destination,
            volume,
            squeezed_volume: volume,
            anycast: false,
            wants_backup: false,
            holding_time,
            age: 0,
            working: None,
            backup: None,
        }
    }

    /// Request backup provisioning at the given squeezed volume.
    pub fn with_backup(mut self, squeezed_volume: f64) -> Self {
        self.wants_backup = true;
        self.squeezed_volume = squeezed_volume;
        self
    }

    /// Mark this demand as one leg of an anycast pair.
    pub fn with_anycast(mut self) -> Self {
        self.anycast = true;
        self
    }

    pub fn id(&self) -> DemandId {
        self.id
    }

    pub fn source(&self) -> NodeId {
        self.source
    }

    pub fn destination(&self) -> NodeId {
        self.destination
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn squeezed_volume(&self) -> f64 {
        self.squeezed_volume
    }

    pub fn is_anycast(&self) -> bool {
        self.anycast
    }

    pub fn wants_backup(&self) -> bool {
        self.wants_backup
    }

    pub fn volume_bucket(&self) -> usize {
        volume_bucket(self.volume)
    }

    pub fn squeezed_volume_bucket(&self) -> usize {
        volume_bucket(self.squeezed_volume)
    }

    pub fn working_path(&self) -> Option<&PartedPath> {
        self.working.as_ref()
    }

    pub fn backup_path(&self) -> Option<&PartedPath> {
        self.backup.as_ref()
    }

    /// Policy predicate: should a backup path be provisioned now?
    pub fn allocate_backup(&self) -> bool {
        self.wants_backup && self.working.is_some() && self.backup.is_none()
    }

    /// Advance the demand's age by one tick.
    pub fn tick(&mut self) {
        self.age += 1;
    }

    pub fn expired(&self) -> bool {
        self.age >= self.holding_time
    }

    /// Commit `path` for this demand at volume bucket `v`.
    ///
    /// Reserves one contiguous run per traversed link per span and one
    /// regenerator per interior boundary. Any failure rolls everything
    /// reserved for this path back and returns `Ok(false)`; the network
    /// is then link-by-link identical to before the call. `Err` is
    /// reserved for structural faults.
    pub fn allocate(&mut self, network: &mut Network, mut path: PartedPath, v: usize) -> Result<bool> {
        // slot needs per span, resolved before any mutation
        let needs = {
            let catalogue = network.catalogue();
            path.parts()
                .iter()
                .map(|part| {
                    part.modulation()
                        .map(|m| catalogue.slots(m, v))
                        .ok_or(NetworkError::PathNotModulated)
                })
                .collect::<Result<Vec<usize>>>()?
        };

        let mut taken_regenerators: Vec<NodeId> = Vec::new();
        let mut taken_slots: Vec<ReservedRange> = Vec::new();

        let mut boundary_need: HashMap<NodeId, usize> = HashMap::new();
        for node in path.boundary_nodes() {
            *boundary_need.entry(node).or_insert(0) += 1;
        }
        for (&node, &count) in &boundary_need {
            if network.node_mut(node)?.try_occupy_regenerators(count) {
                taken_regenerators.extend(std::iter::repeat(node).take(count));
            } else {
                self.rollback(network, &taken_slots, &taken_regenerators)?;
                trace!(demand = %self.id, %node, "no free regenerator, rolling back");
                return Ok(false);
            }
        }

        let mut part_ranges: Vec<Vec<ReservedRange>> = Vec::with_capacity(path.part_count());
        for (part, &count) in path.parts().iter().zip(&needs) {
            let hops = part.hops(network)?;
            let mut ranges = Vec::with_capacity(hops.len());
            for (link, direction) in hops {
                match network.link(link)?.first_fit(direction, count) {
                    Some((core, offset)) => {
                        network.link_mut(link)?.reserve(core, direction, offset, count)?;
                        let range = ReservedRange {
                            link,
                            core,
                            direction,
                            offset,
                            count,
                        };
                        taken_slots.push(range);
                        ranges.push(range);
                    }
                    None => {
                        self.rollback(network, &taken_slots, &taken_regenerators)?;
                        trace!(demand = %self.id, %link, "no contiguous run, rolling back");
                        return Ok(false);
                    }
                }
            }
            part_ranges.push(ranges);
        }

        for (part, ranges) in path.parts_mut().iter_mut().zip(part_ranges) {
            part.set_reserved(ranges);
        }
        path.set_committed_regenerators(taken_regenerators);

        if self.working.is_none() {
            self.working = Some(path);
        } else {
            self.backup = Some(path);
        }
        Ok(true)
    }

    fn rollback(
        &self,
        network: &mut Network,
        slots: &[ReservedRange],
        regenerators: &[NodeId],
    ) -> Result<()> {
        for range in slots {
            network
                .link_mut(range.link)?
                .release(range.core, range.direction, range.offset, range.count)?;
        }
        for &node in regenerators {
            network.node_mut(node)?.release_regenerators(1)?;
        }
        Ok(())
    }

    /// Release the working path's slots and regenerators.
    pub fn release_working(&mut self, network: &mut Network) -> Result<()> {
        if let Some(path) = self.working.take() {
            Self::release_path(network, path)?;
        }
        Ok(())
    }

    /// Release the backup path's slots and regenerators.
    pub fn release_backup(&mut self, network: &mut Network) -> Result<()> {
        if let Some(path) = self.backup.take() {
            Self::release_path(network, path)?;
        }
        Ok(())
    }

    /// Release everything this demand holds.
    pub fn release(&mut self, network: &mut Network) -> Result<()> {
        self.release_working(network)?;
        self.release_backup(network)
    }

    fn release_path(network: &mut Network, mut path: PartedPath) -> Result<()> {
        for part in path.parts() {
            for range in part.reserved() {
                network
                    .link_mut(range.link)?
                    .release(range.core, range.direction, range.offset, range.count)?;
            }
        }
        for &node in path.committed_regenerators() {
            network.node_mut(node)?.release_regenerators(1)?;
        }
        path.clear_committed();
        Ok(())
    }
}
