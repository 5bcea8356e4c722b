/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Core Sequencer implementation.
//!
//! This module provides the main Sequencer struct that resolves every
//! request to its sequencing group, stamps it with the next per-group
//! sequence number and emits it to the group's fan-out set.

use super::event::SequencerEvent;
use super::receipt::SequencerReceipt;
use super::request::SequencerRequest;
use super::result::{DropReason, SequencerOutcome};
use super::stats::{GroupStatsBank, SequencerStats, StatsSnapshot};
use crate::config::{ConfigError, SequencerConfig};
use crate::counter::CounterBank;
use crate::emitter::Emitter;
use crate::resolver::{GroupResolver, Resolution};
use crate::wire::{self, StampHeader, WireError};
use arc_swap::ArcSwapOption;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

/// Type alias for event listener functions.
type EventListener = Arc<dyn Fn(&SequencerEvent) + Send + Sync>;

/// Resolver, counters and stamping stats derived from one provisioning.
#[derive(Debug)]
struct Provisioning {
    session: u16,
    resolver: GroupResolver,
    counters: CounterBank,
    stats: GroupStatsBank,
}

/// A lock-free, per-group sequencer.
///
/// The Sequencer is shared by reference across any number of processing
/// lanes. The only shared mutable state touched per request is the
/// group's counter, advanced by a single atomic fetch-and-increment;
/// resolution, stamping and emission run fully in parallel. The current
/// provisioning is loaded without taking a lock.
///
/// Provisioning is rebuild-and-swap: [`provision`](Self::provision) builds a
/// fresh resolver and counter bank from a [`SequencerConfig`] and replaces
/// the current one. Each provisioning after the first bumps the session
/// number stamped into every request.
///
/// # Examples
///
/// ```
/// use std::net::SocketAddr;
/// use oum_sequencer::config::SequencerConfig;
/// use oum_sequencer::emitter::ChannelEmitter;
/// use oum_sequencer::sequencer::{Sequencer, SequencerRequest};
///
/// let replica: SocketAddr = "10.0.0.2:7000".parse().unwrap();
/// let destination: SocketAddr = "10.0.0.1:7000".parse().unwrap();
/// let config = SequencerConfig::new(1)
///     .with_group(0, [replica])
///     .with_destination(destination, 0);
///
/// let emitter = ChannelEmitter::new(16);
/// let inbox = emitter.attach(replica);
/// let sequencer = Sequencer::new(emitter, &config).unwrap();
///
/// let outcome = sequencer.process(SequencerRequest::framed(destination, b"op"));
/// assert_eq!(outcome.receipt().unwrap().sequence_num(), 0);
/// assert_eq!(inbox.len(), 1);
/// ```
pub struct Sequencer<E: Emitter> {
    /// Transport the stamped requests are handed to.
    emitter: E,

    /// Current provisioning, swapped atomically on re-provisioning.
    provisioning: ArcSwapOption<Provisioning>,

    /// Session of the most recent provisioning. Serializes provisioning
    /// and decommissioning; never touched per request.
    last_session: Mutex<Option<u16>>,

    /// Drop counters and totals of retired provisionings.
    stats: SequencerStats,

    /// Event listeners called for each stamped request.
    event_listeners: Vec<EventListener>,
}

impl<E: Emitter> Sequencer<E> {
    /// Creates a Sequencer that drops all traffic until provisioned.
    #[must_use]
    pub fn unprovisioned(emitter: E) -> Self {
        Self {
            emitter,
            provisioning: ArcSwapOption::empty(),
            last_session: Mutex::new(None),
            stats: SequencerStats::default(),
            event_listeners: Vec::new(),
        }
    }

    /// Creates a Sequencer and provisions it from `config`.
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigError`] raised by validation.
    pub fn new(emitter: E, config: &SequencerConfig) -> Result<Self, ConfigError> {
        let sequencer = Self::unprovisioned(emitter);
        sequencer.provision(config)?;
        Ok(sequencer)
    }

    /// Registers an event listener.
    ///
    /// Listeners are called synchronously, on the processing lane, for
    /// every stamped request.
    ///
    /// # Arguments
    ///
    /// * `listener` - Function to call for each event
    pub fn add_listener<F>(&mut self, listener: F)
    where
        F: Fn(&SequencerEvent) + Send + Sync + 'static,
    {
        self.event_listeners.push(Arc::new(listener));
    }

    /// Builds a fresh resolver and counter bank from `config` and swaps it in.
    ///
    /// Returns the session number of the new provisioning. Requests already
    /// in flight finish against the provisioning they started with; the
    /// caller is responsible for quiescing groups whose membership changes.
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigError`] raised by validation; the current
    /// provisioning is left in place.
    pub fn provision(&self, config: &SequencerConfig) -> Result<u16, ConfigError> {
        config.validate()?;

        let resolver = GroupResolver::from_config(config);
        let counters = CounterBank::from_config(config);
        let stats = GroupStatsBank::new(config.num_groups);

        let mut last_session = self
            .last_session
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let session = match *last_session {
            Some(previous) => previous.wrapping_add(1),
            None => config.session,
        };
        let previous = self.provisioning.swap(Some(Arc::new(Provisioning {
            session,
            resolver,
            counters,
            stats,
        })));
        *last_session = Some(session);
        drop(last_session);

        if let Some(previous) = previous {
            self.stats.retire(&previous.stats);
        }

        info!(
            session,
            num_groups = config.num_groups,
            groups = config.groups.len(),
            destinations = config.destinations.len(),
            counter_bits = config.counter_bits,
            "sequencer provisioned"
        );
        Ok(session)
    }

    /// Tears down the current provisioning. All traffic is dropped until the
    /// sequencer is provisioned again.
    ///
    /// Returns `true` if a provisioning was removed.
    pub fn decommission(&self) -> bool {
        let last_session = self
            .last_session
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let removed = self.provisioning.swap(None);
        drop(last_session);

        if let Some(previous) = &removed {
            self.stats.retire(&previous.stats);
            info!(session = previous.session, "sequencer decommissioned");
        }
        removed.is_some()
    }

    /// Stamps `request` and emits it to its group's fan-out set.
    ///
    /// Drops the request, without consuming a sequence number, when the
    /// sequencer is not provisioned, the datagram has no valid stamp region,
    /// or its destination does not resolve. Emission failures are counted
    /// and never cause the sequence number to be re-issued.
    pub fn process(&self, request: SequencerRequest) -> SequencerOutcome {
        let current = self.provisioning.load();
        let Some(provisioning) = current.as_deref() else {
            return self.drop_request(DropReason::NotProvisioned, &request.destination);
        };

        let SequencerRequest {
            destination,
            mut packet,
        } = request;

        if let Err(error) = wire::check_stamp_region(&packet) {
            let reason = match error {
                WireError::Unsequenced => DropReason::Unsequenced,
                WireError::Truncated { .. } | WireError::HeaderSizeMismatch { .. } => {
                    DropReason::Malformed
                }
            };
            return self.drop_request(reason, &destination);
        }

        let Resolution { group_id, fan_out } = match provisioning.resolver.resolve(&destination) {
            Ok(resolution) => resolution,
            Err(_) => return self.drop_request(DropReason::Unresolved, &destination),
        };

        let issued = provisioning.counters.fetch_and_increment(group_id);
        let stamp = StampHeader::new(provisioning.session, group_id, issued.value);
        wire::put_stamp(&mut packet, &stamp);
        let packet = packet.freeze();

        let mut emit_failures = 0;
        for endpoint in fan_out.iter() {
            if let Err(error) = self.emitter.emit(*endpoint, &packet) {
                emit_failures += 1;
                debug!(group_id, sequence = issued.value, %endpoint, %error, "emission failed");
            }
        }

        provisioning
            .stats
            .group(group_id)
            .record(issued.wrapped, emit_failures);

        if issued.wrapped {
            warn!(
                group_id,
                session = provisioning.session,
                "sequence counter wrapped to zero"
            );
        }

        if !self.event_listeners.is_empty() {
            let event = SequencerEvent::new(
                stamp,
                issued.wrapped,
                destination,
                nanos_since_epoch(),
                packet,
            );
            for listener in &self.event_listeners {
                listener(&event);
            }
        }

        SequencerOutcome::Stamped(SequencerReceipt::new(
            stamp,
            issued.wrapped,
            fan_out.len(),
            emit_failures,
        ))
    }

    fn drop_request(&self, reason: DropReason, destination: &SocketAddr) -> SequencerOutcome {
        self.stats.record_drop(reason);
        trace!(%destination, %reason, "request dropped");
        SequencerOutcome::Dropped(reason)
    }

    fn current(&self) -> Option<Arc<Provisioning>> {
        self.provisioning.load_full()
    }

    /// Returns `true` if the sequencer is currently provisioned.
    #[must_use]
    pub fn is_provisioned(&self) -> bool {
        self.current().is_some()
    }

    /// Session number of the current provisioning.
    #[must_use]
    pub fn session(&self) -> Option<u16> {
        self.current().map(|p| p.session)
    }

    /// Reads the next sequence number `group_id` will issue.
    ///
    /// Non-mutating and eventually consistent with completed increments.
    /// Returns `None` when not provisioned or for out-of-range groups.
    #[must_use]
    pub fn counter(&self, group_id: u32) -> Option<u32> {
        self.current()?.counters.read(group_id)
    }

    /// Number of wraparounds `group_id` has completed since provisioning.
    #[must_use]
    pub fn laps(&self, group_id: u32) -> Option<u64> {
        self.current()?.counters.laps(group_id)
    }

    /// Reads every counter, indexed by group id.
    #[must_use]
    pub fn counters(&self) -> Vec<u32> {
        self.current()
            .map(|p| p.counters.snapshot())
            .unwrap_or_default()
    }

    /// Every provisioned destination address.
    #[must_use]
    pub fn destinations(&self) -> Vec<SocketAddr> {
        self.current()
            .map(|p| p.resolver.destinations().copied().collect())
            .unwrap_or_default()
    }

    /// Snapshot of the diagnostic counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        let current = self.provisioning.load();
        self.stats.snapshot(current.as_deref().map(|p| &p.stats))
    }

    /// The emitter stamped requests are handed to.
    #[must_use]
    pub fn emitter(&self) -> &E {
        &self.emitter
    }
}

impl<E: Emitter> std::fmt::Debug for Sequencer<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequencer")
            .field("session", &self.session())
            .field("stats", &self.stats())
            .field("listeners", &self.event_listeners.len())
            .finish()
    }
}

/// Errors that can occur when running a Sequencer.
#[derive(Debug, Error)]
pub enum SequencerError {
    /// The sequencer has been shut down.
    #[error("sequencer has been shut down")]
    Shutdown,

    /// The ingress queue is full.
    #[error("sequencer ingress queue is full")]
    QueueFull,

    /// A lane panicked.
    #[error("sequencer lane {0} panicked")]
    LanePanicked(usize),

    /// Provisioning failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A socket or thread could not be set up.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Returns the current time in nanoseconds since the Unix epoch.
#[inline]
fn nanos_since_epoch() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
