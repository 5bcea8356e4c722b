/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Per-group sequence counters.
//!
//! The [`CounterBank`] holds one atomic counter per sequencing group. The
//! only mutation is [`CounterBank::fetch_and_increment`], a single
//! `fetch_add` on that group's slot, so groups never contend with each
//! other and concurrent callers within a group always observe distinct,
//! consecutive values.
//!
//! Each slot stores a 64-bit running total. The issued sequence number is
//! the total masked to the configured counter width, which makes wraparound
//! and the number of completed laps observable without extra state.

use crate::config::{SequencerConfig, max_for_bits};
use crossbeam::utils::CachePadded;
use std::sync::atomic::{AtomicU64, Ordering};

/// A sequence number handed out by [`CounterBank::fetch_and_increment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Issued {
    /// The sequence number.
    pub value: u32,

    /// `true` when this issuance is the first after the counter wrapped
    /// past its maximum back to zero.
    pub wrapped: bool,
}

/// Fixed-size bank of per-group counters.
#[derive(Debug)]
pub struct CounterBank {
    slots: Box<[CachePadded<AtomicU64>]>,
    mask: u64,
    bits: u8,
}

impl CounterBank {
    /// Creates `num_groups` counters of `bits` width, all starting at `start`.
    ///
    /// `bits` is clamped to `1..=32` and `start` is masked to the width.
    #[must_use]
    pub fn new(num_groups: u32, bits: u8, start: u32) -> Self {
        let bits = bits.clamp(1, 32);
        let mask = u64::from(max_for_bits(bits));
        let slots = (0..num_groups)
            .map(|_| CachePadded::new(AtomicU64::new(u64::from(start) & mask)))
            .collect();
        Self { slots, mask, bits }
    }

    /// Creates a bank sized and initialised from `config`, honouring
    /// per-group start values.
    #[must_use]
    pub fn from_config(config: &SequencerConfig) -> Self {
        let bank = Self::new(config.num_groups, config.counter_bits, config.start_value);
        for group in &config.groups {
            if let Some(start) = group.start_value {
                bank.reset(group.id, start);
            }
        }
        bank
    }

    /// Atomically issues the next sequence number of `group_id`.
    ///
    /// Returns the pre-increment value: the first call after bring-up
    /// returns the start value.
    ///
    /// # Panics
    ///
    /// Panics if `group_id` is outside the bank. Callers validate group ids
    /// through the resolver before sequencing.
    #[inline]
    pub fn fetch_and_increment(&self, group_id: u32) -> Issued {
        let raw = self.slots[group_id as usize].fetch_add(1, Ordering::AcqRel);
        let value = (raw & self.mask) as u32;
        Issued {
            value,
            wrapped: value == 0 && raw > self.mask,
        }
    }

    /// Reads the next value `group_id` will issue, without mutating it.
    ///
    /// The read is eventually consistent with completed increments. Returns
    /// `None` for out-of-range groups.
    #[must_use]
    pub fn read(&self, group_id: u32) -> Option<u32> {
        self.slots
            .get(group_id as usize)
            .map(|slot| (slot.load(Ordering::Acquire) & self.mask) as u32)
    }

    /// Number of times `group_id` has wrapped since it was last reset.
    #[must_use]
    pub fn laps(&self, group_id: u32) -> Option<u64> {
        self.slots
            .get(group_id as usize)
            .map(|slot| slot.load(Ordering::Acquire) >> self.bits)
    }

    /// Resets `group_id` to `start` (masked to the counter width).
    ///
    /// Only valid while the group is quiesced; returns `false` for
    /// out-of-range groups.
    pub fn reset(&self, group_id: u32, start: u32) -> bool {
        match self.slots.get(group_id as usize) {
            Some(slot) => {
                slot.store(u64::from(start) & self.mask, Ordering::Release);
                true
            }
            None => false,
        }
    }

    /// Reads every counter, indexed by group id.
    #[must_use]
    pub fn snapshot(&self) -> Vec<u32> {
        self.slots
            .iter()
            .map(|slot| (slot.load(Ordering::Acquire) & self.mask) as u32)
            .collect()
    }

    /// Number of counters in the bank.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if the bank holds no counters.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Counter width in bits.
    #[inline]
    #[must_use]
    pub fn bits(&self) -> u8 {
        self.bits
    }

    /// Largest issuable sequence number.
    #[inline]
    #[must_use]
    pub fn max_value(&self) -> u32 {
        self.mask as u32
    }
}
