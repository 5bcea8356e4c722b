/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Sequencer outcome types.
//!
//! This module defines what happened to a request handed to the Sequencer:
//! it was either stamped and emitted, or dropped before a sequence number
//! was consumed.

use super::receipt::SequencerReceipt;
use std::fmt;

/// Why a request was dropped without being sequenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropReason {
    /// The sequencer has not been provisioned (or was decommissioned).
    NotProvisioned,

    /// The destination has no provisioned group.
    Unresolved,

    /// The datagram carries no stamp region.
    Unsequenced,

    /// The datagram's stamp region is truncated or mis-sized.
    Malformed,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotProvisioned => write!(f, "not provisioned"),
            Self::Unresolved => write!(f, "unresolved destination"),
            Self::Unsequenced => write!(f, "unsequenced datagram"),
            Self::Malformed => write!(f, "malformed stamp region"),
        }
    }
}

/// Result of handing a request to the Sequencer.
#[derive(Debug)]
pub enum SequencerOutcome {
    /// The request was stamped and emitted to its fan-out set.
    Stamped(SequencerReceipt),

    /// The request was dropped; no sequence number was consumed.
    Dropped(DropReason),
}

impl SequencerOutcome {
    /// Returns `true` if the request was stamped.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Stamped(_))
    }

    /// Returns `true` if the request was dropped.
    #[inline]
    #[must_use]
    pub fn is_dropped(&self) -> bool {
        matches!(self, Self::Dropped(_))
    }

    /// Returns the receipt of a stamped request.
    #[must_use]
    pub fn receipt(&self) -> Option<&SequencerReceipt> {
        match self {
            Self::Stamped(receipt) => Some(receipt),
            Self::Dropped(_) => None,
        }
    }

    /// Returns the drop reason of a dropped request.
    #[must_use]
    pub fn drop_reason(&self) -> Option<DropReason> {
        match self {
            Self::Stamped(_) => None,
            Self::Dropped(reason) => Some(*reason),
        }
    }
}
