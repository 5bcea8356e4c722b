/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Aggregate diagnostic counters.
//!
//! Drops and emission failures are never reported per request on the fast
//! path; they are only visible here.
//!
//! Stamping counters live in a [`GroupStatsBank`], one cache-padded slot per
//! group, owned by the provisioning they were recorded under. Lanes stamping
//! different groups never write to the same line. When a provisioning is
//! swapped out its totals are folded into [`SequencerStats`].

use super::result::DropReason;
use crossbeam::utils::CachePadded;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Stamping counters of one group.
#[derive(Debug, Default)]
pub(crate) struct GroupStats {
    stamped: AtomicU64,
    wrapped: AtomicU64,
    emit_failures: AtomicU64,
}

impl GroupStats {
    #[inline]
    pub(crate) fn record(&self, wrapped: bool, emit_failures: usize) {
        self.stamped.fetch_add(1, Ordering::Relaxed);
        if wrapped {
            self.wrapped.fetch_add(1, Ordering::Relaxed);
        }
        if emit_failures > 0 {
            self.emit_failures
                .fetch_add(emit_failures as u64, Ordering::Relaxed);
        }
    }
}

/// Per-group stamping counters of one provisioning.
#[derive(Debug)]
pub(crate) struct GroupStatsBank {
    slots: Box<[CachePadded<GroupStats>]>,
}

impl GroupStatsBank {
    pub(crate) fn new(num_groups: u32) -> Self {
        let slots = (0..num_groups)
            .map(|_| CachePadded::new(GroupStats::default()))
            .collect();
        Self { slots }
    }

    /// Stats slot of `group_id`. Group ids come from the resolver of the
    /// same provisioning, so they are always in range.
    #[inline]
    pub(crate) fn group(&self, group_id: u32) -> &GroupStats {
        &self.slots[group_id as usize]
    }

    fn add_to(&self, snapshot: &mut StatsSnapshot) {
        for slot in self.slots.iter() {
            snapshot.stamped += slot.stamped.load(Ordering::Relaxed);
            snapshot.wrapped += slot.wrapped.load(Ordering::Relaxed);
            snapshot.emit_failures += slot.emit_failures.load(Ordering::Relaxed);
        }
    }
}

/// Drop counters and totals of retired provisionings.
#[derive(Debug, Default)]
pub(crate) struct SequencerStats {
    retired_stamped: AtomicU64,
    retired_wrapped: AtomicU64,
    retired_emit_failures: AtomicU64,
    dropped_not_provisioned: AtomicU64,
    dropped_unresolved: AtomicU64,
    dropped_unsequenced: AtomicU64,
    dropped_malformed: AtomicU64,
}

/// Point-in-time copy of a sequencer's diagnostic counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Requests stamped and emitted.
    pub stamped: u64,
    /// Stamped requests that carried the first number after a wraparound.
    pub wrapped: u64,
    /// Requests dropped before provisioning.
    pub dropped_not_provisioned: u64,
    /// Requests dropped for an unprovisioned destination.
    pub dropped_unresolved: u64,
    /// Datagrams without a stamp region.
    pub dropped_unsequenced: u64,
    /// Datagrams with a broken stamp region.
    pub dropped_malformed: u64,
    /// Per-endpoint emission failures.
    pub emit_failures: u64,
}

impl StatsSnapshot {
    /// Total number of dropped requests, across all reasons.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped_not_provisioned
            + self.dropped_unresolved
            + self.dropped_unsequenced
            + self.dropped_malformed
    }
}

impl SequencerStats {
    #[inline]
    pub(crate) fn record_drop(&self, reason: DropReason) {
        let counter = match reason {
            DropReason::NotProvisioned => &self.dropped_not_provisioned,
            DropReason::Unresolved => &self.dropped_unresolved,
            DropReason::Unsequenced => &self.dropped_unsequenced,
            DropReason::Malformed => &self.dropped_malformed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Folds the totals of a provisioning that has been swapped out.
    ///
    /// Requests still in flight on it when it is retired may go uncounted.
    pub(crate) fn retire(&self, bank: &GroupStatsBank) {
        let mut totals = StatsSnapshot::default();
        bank.add_to(&mut totals);
        self.retired_stamped
            .fetch_add(totals.stamped, Ordering::Relaxed);
        self.retired_wrapped
            .fetch_add(totals.wrapped, Ordering::Relaxed);
        self.retired_emit_failures
            .fetch_add(totals.emit_failures, Ordering::Relaxed);
    }

    /// Takes a snapshot of every counter, adding the live totals of
    /// `current`.
    pub(crate) fn snapshot(&self, current: Option<&GroupStatsBank>) -> StatsSnapshot {
        let mut snapshot = StatsSnapshot {
            stamped: self.retired_stamped.load(Ordering::Relaxed),
            wrapped: self.retired_wrapped.load(Ordering::Relaxed),
            dropped_not_provisioned: self.dropped_not_provisioned.load(Ordering::Relaxed),
            dropped_unresolved: self.dropped_unresolved.load(Ordering::Relaxed),
            dropped_unsequenced: self.dropped_unsequenced.load(Ordering::Relaxed),
            dropped_malformed: self.dropped_malformed.load(Ordering::Relaxed),
            emit_failures: self.retired_emit_failures.load(Ordering::Relaxed),
        };
        if let Some(bank) = current {
            bank.add_to(&mut snapshot);
        }
        snapshot
    }
}
