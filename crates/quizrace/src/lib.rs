//! # Quizrace
//!
//! Real-time multiplayer trivia racing over WebSockets.
//!
//! Players join a room, a shared countdown runs for each question, and
//! every correct answer pushes a racer down the track. The server is
//! authoritative: rooms run as actors in `quizrace-room`, and this crate
//! wires them to the network, routes client requests, and fans snapshots
//! out to every connection watching a room.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quizrace::prelude::*;
//!
//! # async fn run() -> Result<(), QuizraceError> {
//! let server = QuizraceServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod channels;
mod error;
mod handler;
mod server;

pub use channels::{DEFAULT_CHANNEL_CAPACITY, RoomChannels};
pub use error::QuizraceError;
pub use server::{QuizraceServer, QuizraceServerBuilder, ServerConfig};

/// Everything needed to configure and run a server.
pub mod prelude {
    pub use crate::{QuizraceError, QuizraceServer, QuizraceServerBuilder, ServerConfig};
    pub use quizrace_protocol::{
        ClientMessage, Player, PlayerId, Question, RoomId, ServerMessage, Snapshot,
    };
    pub use quizrace_room::{QuestionBank, Rejection, RoomConfig};
    pub use quizrace_tick::{TickConfig, TickPolicy};
}
