/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Sequencer receipt types.
//!
//! This module defines the receipt returned after a request has been
//! stamped and emitted.

use crate::wire::StampHeader;

/// Receipt returned after stamping a request.
///
/// Contains the stamp written into the datagram and how emission to the
/// fan-out set went. The sequence number is consumed regardless of
/// emission failures.
///
/// # Examples
///
/// ```
/// use oum_sequencer::sequencer::SequencerReceipt;
/// use oum_sequencer::wire::StampHeader;
///
/// let receipt = SequencerReceipt::new(StampHeader::new(0, 0, 42), false, 3, 0);
/// assert_eq!(receipt.sequence_num(), 42);
/// assert!(receipt.is_fully_delivered());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencerReceipt {
    /// The stamp written into the request.
    pub stamp: StampHeader,

    /// `true` if this sequence number is the first after a wraparound.
    pub wrapped: bool,

    /// Size of the fan-out set the request was emitted to.
    pub fan_out: usize,

    /// Endpoints the emitter failed to hand the request to.
    pub emit_failures: usize,
}

impl SequencerReceipt {
    /// Creates a new receipt.
    #[must_use]
    pub fn new(stamp: StampHeader, wrapped: bool, fan_out: usize, emit_failures: usize) -> Self {
        Self {
            stamp,
            wrapped,
            fan_out,
            emit_failures,
        }
    }

    /// The sequence number assigned to the request.
    #[inline]
    #[must_use]
    pub fn sequence_num(&self) -> u32 {
        self.stamp.sequence
    }

    /// The group the request was sequenced in.
    #[inline]
    #[must_use]
    pub fn group_id(&self) -> u32 {
        self.stamp.group_id
    }

    /// Returns `true` if every endpoint accepted the request.
    #[inline]
    #[must_use]
    pub fn is_fully_delivered(&self) -> bool {
        self.emit_failures == 0
    }
}
