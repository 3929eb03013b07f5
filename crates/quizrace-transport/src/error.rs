/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The listener could not bind its address.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Accepting a TCP connection failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The peer connected but the WebSocket upgrade failed.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// The transport was shut down.
    #[error("transport shut down")]
    Shutdown,
}
