/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Sequencer event types.
//!
//! This module defines the events passed to listeners after each request
//! is stamped.

use crate::wire::StampHeader;
use bytes::Bytes;
use std::net::SocketAddr;

/// Event emitted after stamping a request.
///
/// Listeners run on the lane that processed the request, so events of
/// different requests may be observed concurrently and out of sequence
/// order. Within a group, ordering is defined by `stamp.sequence`.
#[derive(Debug, Clone)]
pub struct SequencerEvent {
    /// The stamp written into the request.
    pub stamp: StampHeader,

    /// `true` if this sequence number is the first after a wraparound.
    pub wrapped: bool,

    /// Destination the request was addressed to.
    pub destination: SocketAddr,

    /// Nanosecond timestamp taken when the request was stamped.
    pub timestamp_ns: u64,

    /// The stamped datagram as emitted.
    pub packet: Bytes,
}

impl SequencerEvent {
    /// Creates a new sequencer event.
    #[must_use]
    pub fn new(
        stamp: StampHeader,
        wrapped: bool,
        destination: SocketAddr,
        timestamp_ns: u64,
        packet: Bytes,
    ) -> Self {
        Self {
            stamp,
            wrapped,
            destination,
            timestamp_ns,
            packet,
        }
    }

    /// The sequence number assigned to the request.
    #[inline]
    #[must_use]
    pub fn sequence_num(&self) -> u32 {
        self.stamp.sequence
    }
}
