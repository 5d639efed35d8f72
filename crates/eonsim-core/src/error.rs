//! Error types for eonsim

use thiserror::Error;

/// Structural errors raised by the network core.
///
/// Expected provisioning outcomes (no spectrum, no regenerators) are not
/// errors; they are reported through
/// [`DemandAllocationResult`](crate::demand::DemandAllocationResult).
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("slot range {offset}+{count} overlaps an occupied slot")]
    SpectrumOccupied { offset: usize, count: usize },

    #[error("slot range {offset}+{count} is not fully reserved")]
    SpectrumNotReserved { offset: usize, count: usize },

    #[error("slot range {offset}+{count} exceeds spectrum size {slot_count}")]
    SlotRangeOutOfBounds {
        offset: usize,
        count: usize,
        slot_count: usize,
    },

    #[error("unknown node {0}")]
    UnknownNode(usize),

    #[error("no link between nodes {a} and {b}")]
    UnknownLink { a: usize, b: usize },

    #[error("unknown link id {0}")]
    UnknownLinkId(usize),

    #[error("link {link} has no core {core}")]
    UnknownCore { link: usize, core: usize },

    #[error("route must contain at least two nodes")]
    EmptyRoute,

    #[error("path part has no modulation assigned")]
    PathNotModulated,

    #[error("regenerator bookkeeping underflow at node {0}")]
    RegeneratorUnderflow(usize),

    #[error("invalid topology: {0}")]
    Topology(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias for eonsim core operations
pub type Result<T> = std::result::Result<T, NetworkError>;
