//! `QuizraceServer` builder and server loop.
//!
//! This is the entry point for running a Quizrace server. It ties
//! together all the layers: transport → protocol → room registry, with
//! [`RoomChannels`] carrying snapshots back out.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use quizrace_protocol::{Codec, JsonCodec, RoomId};
use quizrace_room::{QuestionBank, RoomConfig, RoomRegistry};
use quizrace_transport::{
    DEFAULT_HANDSHAKE_TIMEOUT, PendingConnection, Transport, TransportError, WebSocketTransport,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::QuizraceError;
use crate::channels::{DEFAULT_CHANNEL_CAPACITY, RoomChannels};
use crate::handler::handle_connection;

/// Server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,

    /// Room used by requests that don't name one.
    pub default_room: RoomId,

    /// Close a connection after this long without an incoming frame.
    /// `None` keeps silent spectators connected forever.
    pub idle_timeout: Option<Duration>,

    /// Drop sockets that haven't finished the WebSocket upgrade by then.
    pub handshake_timeout: Duration,

    /// Snapshots buffered per room for slow connections.
    pub channel_capacity: usize,

    /// Settings for every room.
    pub room: RoomConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            default_room: RoomId::default(),
            idle_timeout: None,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            room: RoomConfig::default(),
        }
    }
}

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) rooms: Mutex<RoomRegistry<RoomChannels>>,
    pub(crate) channels: Arc<RoomChannels>,
    pub(crate) codec: C,
    pub(crate) default_room: RoomId,
    pub(crate) idle_timeout: Option<Duration>,
}

/// Builder for configuring and starting a Quizrace server.
///
/// # Example
///
/// ```rust,no_run
/// use quizrace::prelude::*;
///
/// # async fn run() -> Result<(), QuizraceError> {
/// let server = QuizraceServer::builder()
///     .bind("0.0.0.0:8080")
///     .room_config(RoomConfig {
///         question_seconds: 15,
///         ..RoomConfig::default()
///     })
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct QuizraceServerBuilder {
    config: ServerConfig,
    questions: Option<QuestionBank>,
}

impl QuizraceServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            questions: None,
        }
    }

    /// Replaces every setting at once.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the room used when a request has no `roomId`.
    pub fn default_room(mut self, room_id: impl Into<String>) -> Self {
        self.config.default_room = RoomId::new(room_id);
        self
    }

    /// Closes connections that stay silent for `timeout`.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = Some(timeout);
        self
    }

    /// Sets how long a new socket may take to complete its upgrade.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout = timeout;
        self
    }

    /// Sets how many snapshots each room buffers for slow connections.
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self
    }

    /// Sets the room configuration.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.config.room = config;
        self
    }

    /// Sets the question bank. Defaults to [`QuestionBank::builtin`].
    pub fn questions(mut self, questions: QuestionBank) -> Self {
        self.questions = Some(questions);
        self
    }

    /// Binds the listener and builds the server.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<QuizraceServer<JsonCodec>, QuizraceError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr)
            .await?
            .with_handshake_timeout(self.config.handshake_timeout);
        let questions = Arc::new(self.questions.unwrap_or_default());
        tracing::info!(
            questions = questions.len(),
            default_room = %self.config.default_room,
            "question bank loaded"
        );

        let channels = Arc::new(RoomChannels::new(self.config.channel_capacity));
        let registry = RoomRegistry::new(
            self.config.room.clone(),
            questions,
            Arc::clone(&channels),
        );

        let state = Arc::new(ServerState {
            rooms: Mutex::new(registry),
            channels,
            codec: JsonCodec,
            default_room: self.config.default_room.clone(),
            idle_timeout: self.config.idle_timeout,
        });

        Ok(QuizraceServer { transport, state })
    }
}

impl Default for QuizraceServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Quizrace server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct QuizraceServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl QuizraceServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> QuizraceServerBuilder {
        QuizraceServerBuilder::new()
    }
}

impl<C: Codec> QuizraceServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), QuizraceError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` completes.
    ///
    /// Each accepted socket gets its own task, which runs the WebSocket
    /// handshake and then the connection handler. Connections
    /// that are already open keep running after shutdown until their
    /// peers disconnect.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), QuizraceError> {
        tracing::info!("Quizrace server running");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = self.transport.accept() => match accepted {
                    Ok(pending) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            let conn = match pending.establish().await {
                                Ok(conn) => conn,
                                Err(e) => {
                                    tracing::debug!(error = %e, "WebSocket handshake failed");
                                    return;
                                }
                            };
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(
                                    error = %e,
                                    "connection ended with error"
                                );
                            }
                        });
                    }
                    Err(e @ TransportError::Shutdown) => {
                        tracing::debug!(error = %e, "transport closed");
                        break;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
                _ = &mut shutdown => break,
            }
        }

        self.transport.shutdown().await?;
        let rooms = self.state.rooms.lock().await.room_count();
        tracing::info!(rooms, "Quizrace server stopped");
        Ok(())
    }
}
