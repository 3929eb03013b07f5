//! WebSocket transport implementation using `tokio-tungstenite`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use crate::{Connection, ConnectionId, PendingConnection, Transport, TransportError};

type WsStream = WebSocketStream<TcpStream>;

/// How long a client gets to finish the upgrade request.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// A WebSocket-based [`Transport`] that listens for incoming connections.
pub struct WebSocketTransport {
    listener: TcpListener,
    closed: AtomicBool,
    handshake_timeout: Duration,
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport to the given address.
    ///
    /// Bind to port 0 to let the OS pick one, then ask
    /// [`local_addr`](Self::local_addr) which it chose.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        tracing::info!(addr, "WebSocket transport listening");
        Ok(Self {
            listener,
            closed: AtomicBool::new(false),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        })
    }

    /// Sets how long [`WebSocketUpgrade::establish`] waits for the client's
    /// upgrade request before giving up.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Returns the address the listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Error = TransportError;
    type Pending = WebSocketUpgrade;

    async fn accept(&mut self) -> Result<Self::Pending, Self::Error> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Shutdown);
        }
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::trace!(%addr, "accepted TCP connection");

        Ok(WebSocketUpgrade {
            stream,
            addr,
            timeout: self.handshake_timeout,
        })
    }

    /// Stops handing out connections. Connections already accepted are
    /// unaffected.
    async fn shutdown(&self) -> Result<(), Self::Error> {
        self.closed.store(true, Ordering::Release);
        tracing::info!("WebSocket transport shut down");
        Ok(())
    }
}

/// A TCP socket waiting for its WebSocket upgrade.
pub struct WebSocketUpgrade {
    stream: TcpStream,
    addr: SocketAddr,
    timeout: Duration,
}

impl WebSocketUpgrade {
    /// The peer's address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.addr
    }
}

impl PendingConnection for WebSocketUpgrade {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    /// Runs the upgrade. Peers that send garbage, or nothing at all within
    /// the handshake timeout, get a [`TransportError::Handshake`].
    async fn establish(self) -> Result<Self::Connection, Self::Error> {
        let addr = self.addr;
        let ws = tokio::time::timeout(self.timeout, tokio_tungstenite::accept_async(self.stream))
            .await
            .map_err(|_| TransportError::Handshake(format!("{addr}: handshake timed out")))?
            .map_err(|e| TransportError::Handshake(format!("{addr}: {e}")))?;

        let id = ConnectionId::next();
        tracing::debug!(%id, %addr, "accepted WebSocket connection");

        let (sink, stream) = ws.split();
        Ok(WebSocketConnection {
            id,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        })
    }
}

/// A single WebSocket connection.
///
/// The socket is split into halves behind separate locks, so one task can
/// wait in [`recv`](Connection::recv) while another pushes snapshots out
/// through [`send`](Connection::send).
pub struct WebSocketConnection {
    id: ConnectionId,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl WebSocketConnection {
    fn send_error(&self, e: WsError) -> TransportError {
        match e {
            WsError::ConnectionClosed | WsError::AlreadyClosed => {
                TransportError::ConnectionClosed(self.id.to_string())
            }
            other => TransportError::SendFailed(other.to_string()),
        }
    }
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    /// Sends UTF-8 payloads as text frames (what browsers expect for JSON)
    /// and anything else as binary.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        let msg = match std::str::from_utf8(data) {
            Ok(text) => Message::text(text),
            Err(_) => Message::binary(data.to_vec()),
        };
        self.sink
            .lock()
            .await
            .send(msg)
            .await
            .map_err(|e| self.send_error(e))
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut stream = self.stream.lock().await;
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => return Ok(Some(data.into())),
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_bytes().to_vec()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // ping/pong/raw frame
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => {
                    return Ok(None);
                }
                Some(Err(e)) => return Err(TransportError::ReceiveFailed(e.to_string())),
            }
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.sink
            .lock()
            .await
            .close()
            .await
            .map_err(|e| self.send_error(e))
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
