/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Sequencer request types.
//!
//! This module defines the requests handed to the Sequencer for stamping.

use crate::wire;
use bytes::BytesMut;
use std::net::SocketAddr;

/// A datagram awaiting a sequence number.
///
/// `destination` is the identity the client addressed (the address the
/// datagram arrived on); `packet` is the full datagram, including the
/// reserved stamp region, and is stamped in place.
///
/// # Examples
///
/// ```
/// use oum_sequencer::sequencer::SequencerRequest;
///
/// let request = SequencerRequest::framed("10.0.0.1:7000".parse().unwrap(), b"op");
/// assert_eq!(request.payload(), b"op");
/// ```
#[derive(Debug, Clone)]
pub struct SequencerRequest {
    /// Destination identity the request was addressed to.
    pub destination: SocketAddr,

    /// Raw datagram including the stamp region.
    pub packet: BytesMut,
}

impl SequencerRequest {
    /// Wraps an already framed datagram.
    #[must_use]
    pub fn new(destination: SocketAddr, packet: BytesMut) -> Self {
        Self {
            destination,
            packet,
        }
    }

    /// Frames `payload` with a reserved stamp region.
    #[must_use]
    pub fn framed(destination: SocketAddr, payload: &[u8]) -> Self {
        Self::new(destination, wire::frame_request(payload))
    }

    /// Returns the payload following the stamp region, or the whole packet
    /// if it is not a well-formed sequencing request.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        match wire::check_stamp_region(&self.packet) {
            Ok(()) => &self.packet[wire::PAYLOAD_OFFSET..],
            Err(_) => &self.packet,
        }
    }
}
