/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! UDP ingress for the sequencer.
//!
//! The frontend listens on every provisioned destination address, one tokio
//! task per socket. Each received datagram is handed to the shared
//! [`Sequencer`] with the destination it arrived on; emission goes through
//! the sequencer's own non-blocking [`Emitter`], so receive tasks never
//! await anything but the next datagram.

use crate::emitter::Emitter;
use crate::sequencer::{Sequencer, SequencerError, SequencerRequest};
use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Largest datagram the frontend accepts.
pub const MAX_DATAGRAM: usize = 64 * 1024;

/// A bound, not yet running, UDP frontend.
#[derive(Debug)]
pub struct UdpFrontend<E: Emitter + 'static> {
    sequencer: Arc<Sequencer<E>>,
    listeners: Vec<(SocketAddr, UdpSocket)>,
}

impl<E: Emitter + 'static> UdpFrontend<E> {
    /// Binds one socket per destination the sequencer is provisioned for.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::Io`] if any bind fails.
    pub async fn bind(sequencer: Arc<Sequencer<E>>) -> Result<Self, SequencerError> {
        let mut listeners = Vec::new();
        for destination in sequencer.destinations() {
            let socket = UdpSocket::bind(destination).await?;
            debug!(%destination, "listening for requests");
            listeners.push((destination, socket));
        }
        Ok(Self {
            sequencer,
            listeners,
        })
    }

    /// Uses pre-bound sockets, each paired with the destination identity
    /// its datagrams resolve under.
    #[must_use]
    pub fn with_sockets(
        sequencer: Arc<Sequencer<E>>,
        listeners: Vec<(SocketAddr, UdpSocket)>,
    ) -> Self {
        Self {
            sequencer,
            listeners,
        }
    }

    /// Local addresses of every listening socket.
    #[must_use]
    pub fn local_addrs(&self) -> Vec<SocketAddr> {
        self.listeners
            .iter()
            .filter_map(|(_, socket)| socket.local_addr().ok())
            .collect()
    }

    /// Spawns one receive task per socket on the current runtime.
    #[must_use]
    pub fn spawn(self) -> FrontendHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let listener_count = self.listeners.len();

        let tasks = self
            .listeners
            .into_iter()
            .map(|(destination, socket)| {
                let sequencer = Arc::clone(&self.sequencer);
                let shutdown = shutdown_rx.clone();
                tokio::spawn(receive_loop(sequencer, destination, socket, shutdown))
            })
            .collect();

        info!(listeners = listener_count, "udp frontend started");
        FrontendHandle {
            shutdown: shutdown_tx,
            tasks,
        }
    }
}

/// Handle to a running [`UdpFrontend`].
#[derive(Debug)]
pub struct FrontendHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<u64>>,
}

impl FrontendHandle {
    /// Stops every receive task and waits for them to exit.
    ///
    /// Returns the number of datagrams received across all sockets.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::LanePanicked`] if a receive task panicked.
    pub async fn shutdown(self) -> Result<u64, SequencerError> {
        let _ = self.shutdown.send(true);
        let mut received = 0u64;
        for (lane, task) in self.tasks.into_iter().enumerate() {
            received += task.await.map_err(|_| SequencerError::LanePanicked(lane))?;
        }
        info!(received, "udp frontend stopped");
        Ok(received)
    }
}

async fn receive_loop<E: Emitter>(
    sequencer: Arc<Sequencer<E>>,
    destination: SocketAddr,
    socket: UdpSocket,
    mut shutdown: watch::Receiver<bool>,
) -> u64 {
    let mut buf = BytesMut::with_capacity(MAX_DATAGRAM);
    let mut received = 0u64;

    loop {
        buf.reserve(MAX_DATAGRAM);
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            result = socket.recv_buf_from(&mut buf) => {
                match result {
                    Ok((_, peer)) => {
                        let packet = buf.split();
                        received += 1;
                        let outcome = sequencer.process(SequencerRequest::new(destination, packet));
                        if let Some(reason) = outcome.drop_reason() {
                            debug!(%destination, %peer, %reason, "datagram dropped");
                        }
                    }
                    Err(error) => {
                        warn!(%destination, %error, "receive failed");
                        buf.clear();
                    }
                }
            }
        }
    }

    debug!(%destination, received, "receive loop stopped");
    received
}
