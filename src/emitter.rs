/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Transport seam for stamped requests.
//!
//! The sequencer hands every stamped datagram to an [`Emitter`] once per
//! endpoint of the group's fan-out set. Emitters must not block: a send that
//! cannot complete immediately is reported as an [`EmitError`] and counted,
//! never retried.
//!
//! Two emitters ship with the crate:
//!
//! - [`UdpEmitter`] sends datagrams through a non-blocking tokio UDP socket.
//! - [`ChannelEmitter`] delivers to in-process replicas over `crossbeam`
//!   channels; replicas can attach and detach while traffic flows.

use bytes::Bytes;
use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use dashmap::DashMap;
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::{ToSocketAddrs, UdpSocket};

/// Errors reported by an [`Emitter`].
#[derive(Debug, Error)]
pub enum EmitError {
    /// The underlying socket failed or would have blocked.
    #[error("failed to send to {endpoint}: {source}")]
    Io {
        /// Target endpoint.
        endpoint: SocketAddr,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The datagram was only partially written.
    #[error("short send to {endpoint}: wrote {written} of {len} bytes")]
    ShortSend {
        /// Target endpoint.
        endpoint: SocketAddr,
        /// Bytes written.
        written: usize,
        /// Datagram length.
        len: usize,
    },

    /// No receiver is attached for the endpoint.
    #[error("no receiver attached for {0}")]
    NoEndpoint(SocketAddr),

    /// The endpoint's queue is full.
    #[error("receiver queue for {0} is full")]
    Full(SocketAddr),

    /// The endpoint's receiver was dropped.
    #[error("receiver for {0} disconnected")]
    Disconnected(SocketAddr),
}

/// Delivers stamped datagrams to replica endpoints.
pub trait Emitter: Send + Sync {
    /// Sends `packet` to `endpoint` without blocking.
    ///
    /// # Errors
    ///
    /// Returns an [`EmitError`] if the datagram could not be handed to the
    /// transport.
    fn emit(&self, endpoint: SocketAddr, packet: &Bytes) -> Result<(), EmitError>;
}

/// Non-blocking UDP emitter.
#[derive(Debug)]
pub struct UdpEmitter {
    socket: UdpSocket,
}

impl UdpEmitter {
    /// Binds the sending socket to `addr` and waits until it is writable.
    ///
    /// # Errors
    ///
    /// Returns the I/O error raised by the bind.
    pub async fn bind(addr: impl ToSocketAddrs) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        socket.writable().await?;
        Ok(Self { socket })
    }

    /// Wraps an already bound tokio socket.
    #[must_use]
    pub fn from_socket(socket: UdpSocket) -> Self {
        Self { socket }
    }

    /// Local address of the sending socket.
    ///
    /// # Errors
    ///
    /// Returns the I/O error raised by the socket.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

impl Emitter for UdpEmitter {
    fn emit(&self, endpoint: SocketAddr, packet: &Bytes) -> Result<(), EmitError> {
        let written = self
            .socket
            .try_send_to(packet, endpoint)
            .map_err(|source| EmitError::Io { endpoint, source })?;
        if written != packet.len() {
            return Err(EmitError::ShortSend {
                endpoint,
                written,
                len: packet.len(),
            });
        }
        Ok(())
    }
}

/// In-process emitter delivering to per-endpoint channels.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use oum_sequencer::emitter::{ChannelEmitter, Emitter};
///
/// let emitter = ChannelEmitter::new(16);
/// let replica: std::net::SocketAddr = "10.0.0.2:7000".parse().unwrap();
/// let rx = emitter.attach(replica);
///
/// emitter.emit(replica, &Bytes::from_static(b"hello")).unwrap();
/// assert_eq!(rx.try_recv().unwrap(), Bytes::from_static(b"hello"));
/// ```
#[derive(Debug)]
pub struct ChannelEmitter {
    endpoints: DashMap<SocketAddr, Sender<Bytes>>,
    capacity: usize,
}

impl ChannelEmitter {
    /// Creates an emitter whose endpoint queues hold `capacity` datagrams.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            endpoints: DashMap::new(),
            capacity,
        }
    }

    /// Attaches a receiver for `endpoint`, replacing any previous one.
    pub fn attach(&self, endpoint: SocketAddr) -> Receiver<Bytes> {
        let (tx, rx) = channel::bounded(self.capacity);
        self.endpoints.insert(endpoint, tx);
        rx
    }

    /// Detaches `endpoint`. Subsequent emissions to it fail.
    pub fn detach(&self, endpoint: &SocketAddr) -> bool {
        self.endpoints.remove(endpoint).is_some()
    }

    /// Number of attached endpoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Returns `true` if no endpoint is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

impl Emitter for ChannelEmitter {
    fn emit(&self, endpoint: SocketAddr, packet: &Bytes) -> Result<(), EmitError> {
        let sender = self
            .endpoints
            .get(&endpoint)
            .ok_or(EmitError::NoEndpoint(endpoint))?;
        sender.try_send(packet.clone()).map_err(|e| match e {
            TrySendError::Full(_) => EmitError::Full(endpoint),
            TrySendError::Disconnected(_) => EmitError::Disconnected(endpoint),
        })
    }
}

impl<E: Emitter + ?Sized> Emitter for std::sync::Arc<E> {
    fn emit(&self, endpoint: SocketAddr, packet: &Bytes) -> Result<(), EmitError> {
        (**self).emit(endpoint, packet)
    }
}
