//! Epsilon-greedy modulation selection and reward shaping

use rand::rngs::StdRng;
use rand::Rng;

use eonsim_core::{Modulation, Network, PartedPath, PathPart, Result};

use crate::qtable::{QTable, StateKey};

/// A modulation picked for one span, with the ranking cost it
/// contributes to its path.
#[derive(Debug, Clone, Copy)]
pub struct SpanChoice {
    pub modulation: Modulation,
    pub cost: f64,
}

/// Q-table address for a span decision: the span's busiest link, the
/// demand's volume bucket, and the busiest link's usage bucket.
pub fn state_key(
    part: &PathPart,
    v: usize,
    modulation: Modulation,
    network: &Network,
) -> Result<StateKey> {
    Ok(StateKey {
        link: part.busiest_link(network)?,
        volume: v,
        usage: QTable::usage_bucket(part.occupied_percentage(network)?),
        modulation,
    })
}

/// Epsilon-greedy format selection for one span.
///
/// With probability `epsilon` the highest-Q feasible format is exploited
/// (cost: negated Q value); otherwise a format is drawn uniformly from
/// the exploration pool (cost: negated table maximum). The pool is the
/// feasible set, or the whole catalogue when `explore_all_formats` is
/// set, in which case an out-of-reach draw voids the span.
///
/// `None` means no usable format exists and the candidate path must be
/// rejected.
pub fn select_modulation(
    qtable: &QTable,
    network: &Network,
    part: &PathPart,
    v: usize,
    epsilon: f64,
    explore_all_formats: bool,
    rng: &mut StdRng,
) -> Result<Option<SpanChoice>> {
    let catalogue = network.catalogue();
    let feasible = catalogue.feasible(v, part.length());

    if rng.gen::<f64>() < epsilon {
        if feasible.is_empty() {
            return Ok(None);
        }
        let link = part.busiest_link(network)?;
        let usage = QTable::usage_bucket(part.occupied_percentage(network)?);
        let choice = qtable
            .best_feasible(link, v, usage, &feasible)
            .map(|(modulation, q)| SpanChoice {
                modulation,
                cost: -q,
            });
        Ok(choice)
    } else {
        let pool: &[Modulation] = if explore_all_formats {
            &Modulation::ALL
        } else {
            &feasible
        };
        if pool.is_empty() {
            return Ok(None);
        }
        let modulation = pool[rng.gen_range(0..pool.len())];
        if catalogue.reach(modulation, v) <= part.length() {
            return Ok(None);
        }
        Ok(Some(SpanChoice {
            modulation,
            cost: -qtable.max(),
        }))
    }
}

/// Base success reward: `100 * (1 - max occupied percentage across
/// spans)`, computed against the committed network state.
pub fn success_base(path: &PartedPath, network: &Network) -> Result<f64> {
    Ok(100.0 * (1.0 - path.max_occupied_percentage(network)?))
}

/// Per-span success reward: the base scaled by how much of the format's
/// reach the span actually uses, overridden by a fixed penalty when a
/// strictly more slot-efficient format would also have fit.
pub fn span_success_reward(
    part: &PathPart,
    v: usize,
    base: f64,
    negative_reward: f64,
    network: &Network,
) -> Result<f64> {
    let catalogue = network.catalogue();
    let modulation = part
        .modulation()
        .ok_or(eonsim_core::NetworkError::PathNotModulated)?;
    let slots = catalogue.slots(modulation, v);

    for alternative in Modulation::ALL {
        if alternative == modulation {
            continue;
        }
        let alternative_slots = catalogue.slots(alternative, v);
        if alternative_slots < slots && part.can_fit(network, alternative_slots)? {
            return Ok(2.0 * negative_reward);
        }
    }
    Ok(base * part.length() / catalogue.reach(modulation, v))
}

/// Per-span failure reward for a span whose chosen format found no
/// contiguous run: doubled when some alternative format would have fit.
pub fn span_failure_reward(
    part: &PathPart,
    v: usize,
    negative_reward: f64,
    network: &Network,
) -> Result<f64> {
    let catalogue = network.catalogue();
    let modulation = part
        .modulation()
        .ok_or(eonsim_core::NetworkError::PathNotModulated)?;

    for alternative in Modulation::ALL {
        if alternative == modulation {
            continue;
        }
        if part.can_fit(network, catalogue.slots(alternative, v))? {
            return Ok(2.0 * negative_reward);
        }
    }
    Ok(negative_reward)
}
