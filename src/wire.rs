/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Fixed-width stamp header carried by every sequenced datagram.
//!
//! ```text
//! +----------------+----------------+------------------+------------------+---------+
//! | header_size:16 | session:16     | group_id:32      | sequence:32      | payload |
//! +----------------+----------------+------------------+------------------+---------+
//! ```
//!
//! All fields are big-endian. Clients reserve the stamp region with
//! [`frame_request`] (fields zeroed); the sequencer fills it in place with
//! [`write_stamp`]; replicas read it back with [`parse_stamped`]. A
//! `header_size` of zero marks a datagram that carries no stamp region and
//! must not be sequenced.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Size of the leading `header_size` field.
pub const HEADER_SIZE_LEN: usize = 2;

/// Size of the stamp region that follows `header_size`.
pub const STAMP_LEN: usize = 2 + 4 + 4;

/// Offset of the payload in a framed datagram.
pub const PAYLOAD_OFFSET: usize = HEADER_SIZE_LEN + STAMP_LEN;

/// Errors raised while reading a stamp header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WireError {
    /// The datagram is shorter than the header it declares.
    #[error("datagram truncated: need {needed} bytes, got {available}")]
    Truncated {
        /// Bytes required.
        needed: usize,
        /// Bytes present.
        available: usize,
    },

    /// The declared stamp region has the wrong size.
    #[error("unexpected stamp size {found} (expected {expected})")]
    HeaderSizeMismatch {
        /// Size this codec understands.
        expected: usize,
        /// Size declared by the datagram.
        found: usize,
    },

    /// The datagram declares no stamp region.
    #[error("datagram carries no stamp region")]
    Unsequenced,
}

/// The `(session, group_id, sequence)` stamp of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StampHeader {
    /// Sequencer session number.
    pub session: u16,

    /// Sequencing group.
    pub group_id: u32,

    /// Sequence number within the group.
    pub sequence: u32,
}

impl StampHeader {
    /// Creates a new stamp.
    #[must_use]
    pub fn new(session: u16, group_id: u32, sequence: u32) -> Self {
        Self {
            session,
            group_id,
            sequence,
        }
    }

    fn put(&self, mut dst: &mut [u8]) {
        dst.put_u16(self.session);
        dst.put_u32(self.group_id);
        dst.put_u32(self.sequence);
    }
}

/// Frames `payload` as a sequencing request with a zeroed stamp region.
#[must_use]
pub fn frame_request(payload: &[u8]) -> BytesMut {
    let mut buf = BytesMut::with_capacity(PAYLOAD_OFFSET + payload.len());
    buf.put_u16(STAMP_LEN as u16);
    buf.put_bytes(0, STAMP_LEN);
    buf.put_slice(payload);
    buf
}

/// Frames `payload` as a datagram that must pass through unsequenced.
#[must_use]
pub fn frame_unsequenced(payload: &[u8]) -> BytesMut {
    let mut buf = BytesMut::with_capacity(HEADER_SIZE_LEN + payload.len());
    buf.put_u16(0);
    buf.put_slice(payload);
    buf
}

/// Checks that `packet` carries a well-formed stamp region.
///
/// # Errors
///
/// - [`WireError::Truncated`] if the packet is shorter than its header
/// - [`WireError::Unsequenced`] if `header_size` is zero
/// - [`WireError::HeaderSizeMismatch`] if `header_size` is not [`STAMP_LEN`]
#[inline]
pub fn check_stamp_region(packet: &[u8]) -> Result<(), WireError> {
    if packet.len() < HEADER_SIZE_LEN {
        return Err(WireError::Truncated {
            needed: HEADER_SIZE_LEN,
            available: packet.len(),
        });
    }
    let declared = usize::from((&packet[..HEADER_SIZE_LEN]).get_u16());
    if declared == 0 {
        return Err(WireError::Unsequenced);
    }
    if declared != STAMP_LEN {
        return Err(WireError::HeaderSizeMismatch {
            expected: STAMP_LEN,
            found: declared,
        });
    }
    if packet.len() < PAYLOAD_OFFSET {
        return Err(WireError::Truncated {
            needed: PAYLOAD_OFFSET,
            available: packet.len(),
        });
    }
    Ok(())
}

/// Writes `stamp` into the reserved region of `packet`.
///
/// # Errors
///
/// Same as [`check_stamp_region`]; the packet is left untouched on error.
#[inline]
pub fn write_stamp(packet: &mut [u8], stamp: &StampHeader) -> Result<(), WireError> {
    check_stamp_region(packet)?;
    put_stamp(packet, stamp);
    Ok(())
}

/// Writes `stamp` into a packet already accepted by [`check_stamp_region`].
#[inline]
pub(crate) fn put_stamp(packet: &mut [u8], stamp: &StampHeader) {
    stamp.put(&mut packet[HEADER_SIZE_LEN..PAYLOAD_OFFSET]);
}

/// Parses a stamped datagram into its stamp and payload.
///
/// # Errors
///
/// Same as [`check_stamp_region`].
pub fn parse_stamped(packet: &[u8]) -> Result<(StampHeader, &[u8]), WireError> {
    check_stamp_region(packet)?;
    let mut cursor = &packet[HEADER_SIZE_LEN..];
    let stamp = StampHeader {
        session: cursor.get_u16(),
        group_id: cursor.get_u32(),
        sequence: cursor.get_u32(),
    };
    Ok((stamp, &packet[PAYLOAD_OFFSET..]))
}

/// Parses a stamped [`Bytes`] buffer, returning the payload without copying.
///
/// # Errors
///
/// Same as [`check_stamp_region`].
pub fn parse_stamped_bytes(packet: &Bytes) -> Result<(StampHeader, Bytes), WireError> {
    let (stamp, _) = parse_stamped(packet)?;
    Ok((stamp, packet.slice(PAYLOAD_OFFSET..)))
}
