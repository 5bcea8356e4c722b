/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Sequencer module for per-group total ordering of multicast requests.
//!
//! This module provides the Sequencer of an Ordered Unreliable Multicast
//! pipeline. Every request bound for a replica group is stamped with the
//! next sequence number of that group and emitted to all of the group's
//! replicas, which detect loss and reordering from the sequence stream.
//!
//! # Architecture
//!
//! - Requests are resolved to a sequencing group by an immutable resolver
//! - Each group owns one atomic counter; fetch-and-increment is the only
//!   shared mutation on the fast path
//! - The stamp is written in place and the same bytes go to every replica
//! - Drops and emission failures are counted, never retried
//! - Lanes of a [`WorkerPool`] process requests in parallel
//!
//! # Examples
//!
//! ```no_run
//! use std::net::SocketAddr;
//! use std::sync::Arc;
//! use oum_sequencer::config::SequencerConfig;
//! use oum_sequencer::emitter::UdpEmitter;
//! use oum_sequencer::sequencer::{Sequencer, SequencerRequest, WorkerPool};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SequencerConfig::from_file("config/sequencer.example.json")?;
//! let emitter = UdpEmitter::bind("0.0.0.0:0").await?;
//! let mut sequencer = Sequencer::new(emitter, &config)?;
//!
//! // Register an event listener
//! sequencer.add_listener(|event| {
//!     println!("group {} seq {}", event.stamp.group_id, event.sequence_num());
//! });
//!
//! // Run four lanes over the shared sequencer
//! let pool = WorkerPool::spawn(Arc::new(sequencer), 4, 4096)?;
//! pool.submit(SequencerRequest::framed("10.0.0.1:7000".parse::<SocketAddr>()?, b"op"))?;
//! pool.shutdown()?;
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod event;
pub mod pool;
pub mod receipt;
pub mod request;
pub mod result;
pub mod stats;

#[cfg(test)]
mod tests;

// Re-export main types
pub use self::core::{Sequencer, SequencerError};
pub use event::SequencerEvent;
pub use pool::WorkerPool;
pub use receipt::SequencerReceipt;
pub use request::SequencerRequest;
pub use result::{DropReason, SequencerOutcome};
pub use stats::StatsSnapshot;
