/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! # OUM Sequencer
//!
//! A software sequencer for Ordered Unreliable Multicast (OUM), the
//! ordering primitive underneath NOPaxos-style replication.
//!
//! Every request addressed to a replica group is stamped with
//! `(session, group_id, sequence)` and multicast to all replicas of that
//! group. Sequence numbers are strictly increasing by one per group, so
//! replicas detect loss and reordering from the stream alone; the sequencer
//! keeps no retransmission state and runs no agreement protocol.
//!
//! ## Components
//!
//! - [`config`]: the validated bring-up description of groups, fan-out sets
//!   and destinations
//! - [`resolver`]: immutable destination → group lookup
//! - [`counter`]: one cache-padded atomic counter per group
//! - [`wire`]: the fixed-width stamp header
//! - [`emitter`]: non-blocking transport seam (UDP and in-process channels)
//! - [`sequencer`]: the stamping fast path, diagnostics and processing lanes
//! - [`server`]: async UDP ingress
//!
//! ## Guarantees
//!
//! - **Monotonicity and uniqueness**: within a group, each issued number is
//!   one greater than the previous (modulo the counter width)
//! - **Group isolation**: groups share no mutable state
//! - **No re-issue**: a number is consumed once stamped, whether or not
//!   emission succeeds
//! - **Wraparound**: counters wrap to zero past their maximum; the wrapping
//!   issuance is flagged and counted, and every re-provisioning bumps the
//!   session number
//!
//! ## Example
//!
//! ```
//! use std::net::SocketAddr;
//! use oum_sequencer::config::SequencerConfig;
//! use oum_sequencer::emitter::ChannelEmitter;
//! use oum_sequencer::sequencer::{Sequencer, SequencerRequest};
//! use oum_sequencer::wire::parse_stamped;
//!
//! let replicas: [SocketAddr; 2] = ["10.0.0.2:7000".parse().unwrap(), "10.0.0.3:7000".parse().unwrap()];
//! let service: SocketAddr = "10.0.0.1:7000".parse().unwrap();
//! let config = SequencerConfig::new(1)
//!     .with_group(0, replicas)
//!     .with_destination(service, 0);
//!
//! let emitter = ChannelEmitter::new(64);
//! let inboxes: Vec<_> = replicas.iter().map(|r| emitter.attach(*r)).collect();
//! let sequencer = Sequencer::new(emitter, &config).unwrap();
//!
//! for _ in 0..3 {
//!     sequencer.process(SequencerRequest::framed(service, b"put x 1"));
//! }
//!
//! for inbox in &inboxes {
//!     let seqs: Vec<u32> = inbox
//!         .try_iter()
//!         .map(|packet| parse_stamped(&packet).unwrap().0.sequence)
//!         .collect();
//!     assert_eq!(seqs, vec![0, 1, 2]);
//! }
//! ```

pub mod config;
pub mod counter;
pub mod emitter;
pub mod logging;
pub mod resolver;
pub mod sequencer;
pub mod server;
pub mod wire;

pub use config::{ConfigError, SequencerConfig};
pub use counter::{CounterBank, Issued};
pub use emitter::{ChannelEmitter, EmitError, Emitter, UdpEmitter};
pub use resolver::{FanOut, GroupResolver, Resolution, ResolveError};
pub use sequencer::{
    DropReason, Sequencer, SequencerError, SequencerEvent, SequencerOutcome, SequencerReceipt,
    SequencerRequest, StatsSnapshot, WorkerPool,
};
pub use server::{FrontendHandle, UdpFrontend};
pub use wire::{StampHeader, WireError};
