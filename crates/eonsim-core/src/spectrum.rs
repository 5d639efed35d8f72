//! Per-link frequency slot bitmap
//!
//! Every allocation is a single contiguous run of slots. Bitmaps are small
//! (tens to hundreds of slots), so linear first-fit scans are fine.

use serde::{Deserialize, Serialize};

use crate::error::{NetworkError, Result};

/// Fixed-size ordered sequence of frequency slots on one link direction.
///
/// Mutated only through [`reserve`](Spectrum::reserve) and
/// [`release`](Spectrum::release); recreated fresh at run reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spectrum {
    slots: Vec<bool>,
    occupied: usize,
}

impl Spectrum {
    /// Create a spectrum with `slot_count` free slots.
    pub fn new(slot_count: usize) -> Self {
        Self {
            slots: vec![false; slot_count],
            occupied: 0,
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn occupied_slots(&self) -> usize {
        self.occupied
    }

    /// Fraction of slots currently occupied, in `[0, 1]`.
    pub fn occupied_percentage(&self) -> f64 {
        if self.slots.is_empty() {
            return 0.0;
        }
        self.occupied as f64 / self.slots.len() as f64
    }

    /// First-fit scan for a contiguous run of `count` free slots.
    ///
    /// Read-only. Returns the offset of the first such run, or `None` when
    /// no run of that length exists.
    pub fn can_allocate(&self, count: usize) -> Option<usize> {
        if count == 0 || count > self.slots.len() {
            return None;
        }
        let mut run = 0;
        for (i, &occupied) in self.slots.iter().enumerate() {
            if occupied {
                run = 0;
            } else {
                run += 1;
                if run == count {
                    return Some(i + 1 - count);
                }
            }
        }
        None
    }

    /// Mark `count` slots starting at `offset` occupied.
    ///
    /// Fails without mutating when any slot in the range is already
    /// occupied or the range falls outside the spectrum.
    pub fn reserve(&mut self, offset: usize, count: usize) -> Result<()> {
        self.check_range(offset, count)?;
        if self.slots[offset..offset + count].iter().any(|&s| s) {
            return Err(NetworkError::SpectrumOccupied { offset, count });
        }
        for slot in &mut self.slots[offset..offset + count] {
            *slot = true;
        }
        self.occupied += count;
        Ok(())
    }

    /// Free an exact previously-reserved range.
    pub fn release(&mut self, offset: usize, count: usize) -> Result<()> {
        self.check_range(offset, count)?;
        if self.slots[offset..offset + count].iter().any(|&s| !s) {
            return Err(NetworkError::SpectrumNotReserved { offset, count });
        }
        for slot in &mut self.slots[offset..offset + count] {
            *slot = false;
        }
        self.occupied -= count;
        Ok(())
    }

    fn check_range(&self, offset: usize, count: usize) -> Result<()> {
        if count == 0 || offset + count > self.slots.len() {
            return Err(NetworkError::SlotRangeOutOfBounds {
                offset,
                count,
                slot_count: self.slots.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_fit_fills_left_to_right() {
        let mut spectrum = Spectrum::new(8);

        let offset = spectrum.can_allocate(3).unwrap();
        assert_eq!(offset, 0);
        spectrum.reserve(offset, 3).unwrap();

        let offset = spectrum.can_allocate(3).unwrap();
        assert_eq!(offset, 3);
        spectrum.reserve(offset, 3).unwrap();

        assert_eq!(spectrum.can_allocate(3), None);
        assert_eq!(spectrum.can_allocate(2), Some(6));
    }

    #[test]
    fn test_reserve_occupied_range_fails() {
        let mut spectrum = Spectrum::new(10);
        spectrum.reserve(2, 4).unwrap();

        let err = spectrum.reserve(4, 2).unwrap_err();
        assert!(matches!(err, NetworkError::SpectrumOccupied { .. }));
        // the failed call must not have touched anything
        assert_eq!(spectrum.occupied_slots(), 4);
    }

    #[test]
    fn test_release_requires_exact_reserved_range() {
        let mut spectrum = Spectrum::new(10);
        spectrum.reserve(0, 4).unwrap();

        let err = spectrum.release(2, 4).unwrap_err();
        assert!(matches!(err, NetworkError::SpectrumNotReserved { .. }));

        spectrum.release(0, 4).unwrap();
        assert_eq!(spectrum.occupied_slots(), 0);
    }

    #[test]
    fn test_release_reserve_round_trip() {
        let mut spectrum = Spectrum::new(16);
        spectrum.reserve(0, 5).unwrap();
        spectrum.reserve(8, 3).unwrap();
        let before = spectrum.clone();

        spectrum.release(8, 3).unwrap();
        spectrum.reserve(8, 3).unwrap();

        assert_eq!(spectrum, before);
    }

    #[test]
    fn test_occupied_percentage() {
        let mut spectrum = Spectrum::new(10);
        assert_eq!(spectrum.occupied_percentage(), 0.0);
        spectrum.reserve(0, 5).unwrap();
        assert_eq!(spectrum.occupied_percentage(), 0.5);
    }

    #[test]
    fn test_out_of_bounds_rejected() {
        let mut spectrum = Spectrum::new(4);
        assert!(spectrum.reserve(3, 2).is_err());
        assert!(spectrum.reserve(0, 0).is_err());
        assert_eq!(spectrum.can_allocate(5), None);
        assert_eq!(spectrum.can_allocate(0), None);
    }
}
