//! Modulation formats and their reach / slot-consumption tables

use serde::{Deserialize, Serialize};

/// Number of discrete volume buckets (10 Gb/s increments up to 400 Gb/s).
pub const VOLUME_BUCKETS: usize = 40;

/// Ordered catalogue of modulation formats.
///
/// Spectral efficiency rises and transmission reach falls along the
/// declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Modulation {
    Bpsk,
    Qpsk,
    Qam8,
    Qam16,
    Qam32,
    Qam64,
}

impl Modulation {
    pub const COUNT: usize = 6;

    pub const ALL: [Modulation; Modulation::COUNT] = [
        Modulation::Bpsk,
        Modulation::Qpsk,
        Modulation::Qam8,
        Modulation::Qam16,
        Modulation::Qam32,
        Modulation::Qam64,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn bits_per_symbol(self) -> usize {
        self.index() + 1
    }
}

impl std::fmt::Display for Modulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Modulation::Bpsk => "BPSK",
            Modulation::Qpsk => "QPSK",
            Modulation::Qam8 => "8QAM",
            Modulation::Qam16 => "16QAM",
            Modulation::Qam32 => "32QAM",
            Modulation::Qam64 => "64QAM",
        };
        write!(f, "{name}")
    }
}

/// Discretized index of a requested bitrate in 10 Gb/s increments:
/// `clamp(ceil(units / 10) - 1, 0, 39)`.
pub fn volume_bucket(units: f64) -> usize {
    let bucket = (units / 10.0).ceil() as i64 - 1;
    bucket.clamp(0, VOLUME_BUCKETS as i64 - 1) as usize
}

/// Per-format lookup tables: transmission reach (km) and slot consumption
/// for every volume bucket.
#[derive(Debug, Clone)]
pub struct ModulationCatalogue {
    reach: Vec<[f64; VOLUME_BUCKETS]>,
    slots: Vec<[usize; VOLUME_BUCKETS]>,
}

impl ModulationCatalogue {
    /// Build a catalogue from explicit tables, one row per format in
    /// catalogue order.
    pub fn new(reach: Vec<[f64; VOLUME_BUCKETS]>, slots: Vec<[usize; VOLUME_BUCKETS]>) -> Self {
        assert_eq!(reach.len(), Modulation::COUNT);
        assert_eq!(slots.len(), Modulation::COUNT);
        Self { reach, slots }
    }

    /// Default tables: reach halves per format step and degrades mildly
    /// with volume; slot consumption assumes 12.5 Gb/s per slot per bit of
    /// the symbol.
    pub fn standard() -> Self {
        const BASE_REACH: [f64; Modulation::COUNT] = [8000.0, 4000.0, 2000.0, 1000.0, 500.0, 250.0];
        const GBPS_PER_SLOT_PER_BIT: f64 = 12.5;

        let mut reach = Vec::with_capacity(Modulation::COUNT);
        let mut slots = Vec::with_capacity(Modulation::COUNT);
        for m in Modulation::ALL {
            let mut reach_row = [0.0; VOLUME_BUCKETS];
            let mut slots_row = [0; VOLUME_BUCKETS];
            for (v, (reach_cell, slots_cell)) in
                reach_row.iter_mut().zip(slots_row.iter_mut()).enumerate()
            {
                let volume = 10.0 * (v as f64 + 1.0);
                *reach_cell = BASE_REACH[m.index()] * (1.0 - 0.01 * v as f64);
                *slots_cell = (volume / (GBPS_PER_SLOT_PER_BIT * m.bits_per_symbol() as f64))
                    .ceil() as usize;
            }
            reach.push(reach_row);
            slots.push(slots_row);
        }
        Self { reach, slots }
    }

    /// Transmission reach (km) of `m` at volume bucket `v`.
    pub fn reach(&self, m: Modulation, v: usize) -> f64 {
        self.reach[m.index()][v]
    }

    /// Contiguous slots consumed by `m` at volume bucket `v`.
    pub fn slots(&self, m: Modulation, v: usize) -> usize {
        self.slots[m.index()][v]
    }

    /// Formats whose reach at bucket `v` strictly covers a span of
    /// `length` km, in catalogue order. Empty means the span is
    /// unrealizable without a closer regenerator.
    pub fn feasible(&self, v: usize, length: f64) -> Vec<Modulation> {
        Modulation::ALL
            .into_iter()
            .filter(|&m| self.reach(m, v) > length)
            .collect()
    }

    /// Longest reach any format offers at bucket `v`.
    pub fn max_reach(&self, v: usize) -> f64 {
        Modulation::ALL
            .into_iter()
            .map(|m| self.reach(m, v))
            .fold(0.0, f64::max)
    }
}
