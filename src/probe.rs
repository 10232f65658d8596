//! Hash normalization and the perturbed probe sequence.
//!
//! Every table operation walks the same deterministic sequence of slot
//! indices for a given hash and table mask. The walk starts at `hash & mask`
//! and then follows the recurrence
//!
//! ```text
//! index   = (5 * index + perturb + 1) & mask
//! perturb = perturb >> 5
//! ```
//!
//! with `perturb` seeded from the full 64-bit hash. Folding `perturb` in lets
//! the high bits of the hash influence the walk even in small tables. Once
//! `perturb` has been shifted down to zero the recurrence is a full-period
//! linear congruential generator modulo the capacity, so every slot is
//! eventually visited.

use core::iter::FusedIterator;

/// Multiplier applied to the previous index at each step.
const MULTIPLIER: u64 = 5;

/// Number of bits `perturb` is shifted right after each step.
const PERTURB_SHIFT: u32 = 5;

/// Number of steps after the first one until `perturb` has been shifted down
/// to zero for any 64-bit hash.
const PERTURB_STEPS: usize = u64::BITS.div_ceil(PERTURB_SHIFT) as usize;

/// Converts a signed native hash code into the unsigned 64-bit value used to
/// seed the probe sequence.
///
/// The result is `hash mod 2^64`. Hashes produced by [`core::hash::Hasher`]
/// are already `u64` and need no normalization.
///
/// # Examples
///
/// ```rust
/// use perturb_hash::probe::normalize;
///
/// assert_eq!(normalize(42), 42);
/// assert_eq!(normalize(-1), u64::MAX);
/// assert_eq!(normalize(i64::MIN), 1 << 63);
/// ```
#[inline(always)]
pub const fn normalize(hash: i64) -> u64 {
    hash as u64
}

/// Returns the number of indices a probe walk yields for a table of the given
/// capacity.
///
/// This is enough steps to drain `perturb` and then cycle through every slot
/// once, so a walk that has not found what it is looking for after this many
/// steps never will.
#[inline(always)]
pub const fn probe_limit(capacity: usize) -> usize {
    capacity.saturating_add(PERTURB_STEPS)
}

/// The probe sequence for one hash under one table mask.
///
/// A fresh `Probe` always restarts the walk from the beginning. The iterator
/// is finite and yields exactly [`probe_limit`]`(mask + 1)` indices, each in
/// `0..=mask`.
///
/// # Examples
///
/// ```rust
/// use perturb_hash::probe::Probe;
///
/// let walk: Vec<usize> = Probe::new(173, 7).take(6).collect();
/// assert_eq!(walk, [5, 7, 1, 6, 7, 4]);
/// ```
#[derive(Debug, Clone)]
pub struct Probe {
    index: u64,
    perturb: u64,
    mask: u64,
    remaining: usize,
    started: bool,
}

impl Probe {
    /// Starts the probe walk for `hash` in a table whose slot count is
    /// `mask + 1`.
    ///
    /// `mask + 1` must be a power of two.
    #[inline]
    pub fn new(hash: u64, mask: usize) -> Self {
        debug_assert!(mask.wrapping_add(1).is_power_of_two());
        let mask = mask as u64;
        Self {
            index: hash & mask,
            perturb: hash,
            mask,
            remaining: probe_limit(mask as usize + 1),
            started: false,
        }
    }
}

impl Iterator for Probe {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        if self.started {
            self.index = MULTIPLIER
                .wrapping_mul(self.index)
                .wrapping_add(self.perturb)
                .wrapping_add(1)
                & self.mask;
            self.perturb >>= PERTURB_SHIFT;
        } else {
            self.started = true;
        }

        Some(self.index as usize)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Probe {}

impl FusedIterator for Probe {}
