//! Error types for the room layer.

use quizrace_protocol::RoomId;

/// Why a room ignored a request.
///
/// A rejected request changes nothing and triggers no broadcast. The
/// reason goes back to the requester only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    /// The room is idle; there is no round to answer or advance.
    #[error("round has not started")]
    NotStarted,

    /// `start` while a round is already running.
    #[error("round already running")]
    AlreadyStarted,

    /// The room is running but there is no question at the current index.
    #[error("no current question")]
    NoQuestion,

    /// The player id is not a member of this room.
    #[error("unknown player")]
    UnknownPlayer,

    /// The player already answered the current question.
    #[error("already answered this question")]
    AlreadyAnswered,
}

/// Errors that can occur when talking to a room.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room received the request and declined it.
    #[error("request rejected: {0}")]
    Rejected(#[from] Rejection),

    /// The room's actor has stopped and its command channel is closed.
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),
}
