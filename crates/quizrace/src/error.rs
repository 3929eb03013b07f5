//! Unified error type for the Quizrace server.

use quizrace_protocol::ProtocolError;
use quizrace_room::{QuestionError, RoomError};
use quizrace_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum QuizraceError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, empty frame).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room could not be reached.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The question bank failed to load.
    #[error(transparent)]
    Questions(#[from] QuestionError),

    /// Reading configuration or question files failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizrace_protocol::RoomId;
    use quizrace_room::Rejection;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let quizrace_err: QuizraceError = err.into();
        assert!(matches!(quizrace_err, QuizraceError::Transport(_)));
        assert!(quizrace_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::EmptyFrame;
        let quizrace_err: QuizraceError = err.into();
        assert!(matches!(quizrace_err, QuizraceError::Protocol(_)));
    }

    #[test]
    fn test_from_room_error() {
        let err = RoomError::Unavailable(RoomId::new("lobby"));
        let quizrace_err: QuizraceError = err.into();
        assert!(matches!(quizrace_err, QuizraceError::Room(_)));
        assert!(quizrace_err.to_string().contains("lobby"));
    }

    #[test]
    fn test_rejection_converts_through_room_error() {
        let err: RoomError = Rejection::AlreadyAnswered.into();
        let quizrace_err: QuizraceError = err.into();
        assert!(matches!(
            quizrace_err,
            QuizraceError::Room(RoomError::Rejected(Rejection::AlreadyAnswered))
        ));
    }

    #[test]
    fn test_from_question_error() {
        let err = QuestionError::DuplicateId(4);
        let quizrace_err: QuizraceError = err.into();
        assert!(matches!(quizrace_err, QuizraceError::Questions(_)));
        assert!(quizrace_err.to_string().contains('4'));
    }
}
