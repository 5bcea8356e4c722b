/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Parallel processing lanes.
//!
//! A [`WorkerPool`] runs a fixed number of OS threads ("lanes") that pull
//! requests from a shared bounded queue and hand them to one shared
//! [`Sequencer`]. Lanes never coordinate with each other; the only shared
//! state they touch is the sequencer's counter bank.

use super::core::{Sequencer, SequencerError};
use super::request::SequencerRequest;
use crate::emitter::Emitter;
use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info};

/// A pool of lanes feeding one [`Sequencer`].
///
/// # Examples
///
/// ```
/// use std::net::SocketAddr;
/// use std::sync::Arc;
/// use oum_sequencer::config::SequencerConfig;
/// use oum_sequencer::emitter::ChannelEmitter;
/// use oum_sequencer::sequencer::{Sequencer, SequencerRequest, WorkerPool};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let replica: SocketAddr = "10.0.0.2:7000".parse()?;
/// let destination: SocketAddr = "10.0.0.1:7000".parse()?;
/// let config = SequencerConfig::new(1)
///     .with_group(0, [replica])
///     .with_destination(destination, 0);
///
/// let emitter = ChannelEmitter::new(1024);
/// let inbox = emitter.attach(replica);
/// let sequencer = Arc::new(Sequencer::new(emitter, &config)?);
///
/// let pool = WorkerPool::spawn(Arc::clone(&sequencer), 4, 256)?;
/// for _ in 0..100 {
///     pool.submit(SequencerRequest::framed(destination, b"op"))?;
/// }
/// assert_eq!(pool.shutdown()?, 100);
/// assert_eq!(inbox.len(), 100);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct WorkerPool {
    sender: Option<Sender<SequencerRequest>>,
    lanes: Vec<JoinHandle<u64>>,
}

impl WorkerPool {
    /// Spawns `lanes` worker threads sharing a queue of `capacity` requests.
    ///
    /// `lanes` and `capacity` are raised to at least one.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::Io`] if a thread cannot be spawned.
    pub fn spawn<E>(
        sequencer: Arc<Sequencer<E>>,
        lanes: usize,
        capacity: usize,
    ) -> Result<Self, SequencerError>
    where
        E: Emitter + 'static,
    {
        let (sender, receiver) = channel::bounded(capacity.max(1));
        let lane_count = lanes.max(1);

        let mut handles = Vec::with_capacity(lane_count);
        for lane in 0..lane_count {
            let sequencer = Arc::clone(&sequencer);
            let receiver = receiver.clone();
            let handle = thread::Builder::new()
                .name(format!("oum-lane-{lane}"))
                .spawn(move || run_lane(lane, &sequencer, &receiver))?;
            handles.push(handle);
        }

        info!(lanes = lane_count, capacity, "sequencer lanes started");
        Ok(Self {
            sender: Some(sender),
            lanes: handles,
        })
    }

    /// Enqueues `request`, blocking while the queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::Shutdown`] once the pool is stopped.
    pub fn submit(&self, request: SequencerRequest) -> Result<(), SequencerError> {
        self.sender
            .as_ref()
            .ok_or(SequencerError::Shutdown)?
            .send(request)
            .map_err(|_| SequencerError::Shutdown)
    }

    /// Enqueues `request` without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::QueueFull`] when the queue is full and
    /// [`SequencerError::Shutdown`] once the pool is stopped.
    pub fn try_submit(&self, request: SequencerRequest) -> Result<(), SequencerError> {
        self.sender
            .as_ref()
            .ok_or(SequencerError::Shutdown)?
            .try_send(request)
            .map_err(|e| match e {
                TrySendError::Full(_) => SequencerError::QueueFull,
                TrySendError::Disconnected(_) => SequencerError::Shutdown,
            })
    }

    /// Returns a cloneable submission handle for other threads.
    ///
    /// Lanes only exit once every handle is dropped.
    #[must_use]
    pub fn sender(&self) -> Option<Sender<SequencerRequest>> {
        self.sender.clone()
    }

    /// Number of running lanes.
    #[must_use]
    pub fn lanes(&self) -> usize {
        self.lanes.len()
    }

    /// Closes the queue, drains it and joins every lane.
    ///
    /// Returns the number of requests processed across all lanes.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::LanePanicked`] if a lane panicked.
    pub fn shutdown(mut self) -> Result<u64, SequencerError> {
        self.join_lanes()
    }

    fn join_lanes(&mut self) -> Result<u64, SequencerError> {
        self.sender.take();
        let mut processed = 0u64;
        let mut panicked = None;
        for (lane, handle) in self.lanes.drain(..).enumerate() {
            match handle.join() {
                Ok(count) => processed += count,
                Err(_) => panicked = panicked.or(Some(lane)),
            }
        }
        info!(processed, "sequencer lanes stopped");
        match panicked {
            Some(lane) => Err(SequencerError::LanePanicked(lane)),
            None => Ok(processed),
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if !self.lanes.is_empty() {
            let _ = self.join_lanes();
        }
    }
}

fn run_lane<E: Emitter>(
    lane: usize,
    sequencer: &Sequencer<E>,
    receiver: &Receiver<SequencerRequest>,
) -> u64 {
    let mut processed = 0u64;
    while let Ok(request) = receiver.recv() {
        sequencer.process(request);
        processed += 1;
    }
    debug!(lane, processed, "lane drained");
    processed
}
