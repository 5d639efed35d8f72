//! eonsim RL - Q-learning value estimation and RMSA strategies
//!
//! This crate provides the online learning half of the RMSA engine: a
//! dense Q-table over (link, volume bucket, usage bucket, modulation),
//! epsilon-greedy modulation selection with reward shaping, and the
//! allocation strategies that rank and commit candidate paths.

// Clippy pedantic allows - these are intentional design choices
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::float_cmp)]

pub mod policy;
pub mod qtable;
pub mod strategy;

pub use policy::SpanChoice;
pub use qtable::{QTable, StateKey, USAGE_BUCKETS};
pub use strategy::{RmsaStrategy, StrategyConfig};
