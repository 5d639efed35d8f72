//! eonsim core - network state for RMSA provisioning
//!
//! This crate provides the resource model an RMSA decision engine
//! mutates: per-link spectrum bitmaps, the modulation catalogue,
//! the topology graph with candidate-route tables, path segmentation,
//! and the demand allocation lifecycle.

// Clippy pedantic allows - these are intentional design choices
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::module_name_repetitions)]

pub mod demand;
pub mod error;
pub mod modulation;
pub mod path;
mod routes;
pub mod spectrum;
pub mod topology;

pub use demand::{Demand, DemandAllocationResult, DemandId};
pub use error::{NetworkError, Result};
pub use modulation::{volume_bucket, Modulation, ModulationCatalogue, VOLUME_BUCKETS};
pub use path::{PartedPath, PathPart, ReservedRange};
pub use spectrum::Spectrum;
pub use topology::{
    Core, Direction, LinkId, Network, NetworkBuilder, NetworkLink, NetworkNode, NodeId,
};
