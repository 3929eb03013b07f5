//! Transport abstraction layer for Quizrace.
//!
//! The server talks to clients through three traits: a [`Transport`] hands
//! out [`PendingConnection`]s, each of which finishes its own handshake and
//! becomes a [`Connection`], and a connection moves opaque byte frames in
//! both directions. What those bytes mean is the protocol crate's business; the
//! room engine never sees this layer at all.
//!
//! # Feature Flags
//!
//! - `websocket` (default) — [`WebSocketTransport`] via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{
    DEFAULT_HANDSHAKE_TIMEOUT, WebSocketConnection, WebSocketTransport, WebSocketUpgrade,
};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide counter behind [`ConnectionId::next`].
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one client connection for the life of the process.
///
/// A player records the id of the connection that created it, and log
/// lines carry it as `conn_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wraps a raw id. Mostly useful in tests; transports use [`next`](Self::next).
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocates a fresh id, never handed out before in this process.
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw number.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Source of incoming connections, e.g. a listening socket.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;
    type Pending: PendingConnection<Connection = Self::Connection, Error = Self::Error>;

    /// Waits for the next client socket.
    ///
    /// No handshake happens here, so a slow or silent peer never holds up
    /// the accept loop. Call [`PendingConnection::establish`] on the result,
    /// usually from the task that will serve the connection.
    async fn accept(&mut self) -> Result<Self::Pending, Self::Error>;

    /// Stops accepting. Later `accept` calls fail; open connections stay up.
    async fn shutdown(&self) -> Result<(), Self::Error>;
}

/// An accepted socket whose protocol handshake hasn't run yet.
pub trait PendingConnection: Send + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Runs the handshake and yields the usable connection.
    async fn establish(self) -> Result<Self::Connection, Self::Error>;
}

/// A bidirectional stream of byte frames to one client.
///
/// Methods take `&self` so the server can push snapshots while another
/// task is parked in [`recv`](Self::recv).
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    /// Sends one frame.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Waits for the next frame. `Ok(None)` means the peer hung up.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Starts a clean close.
    async fn close(&self) -> Result<(), Self::Error>;

    fn id(&self) -> ConnectionId;
}
