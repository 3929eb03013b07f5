//! Core protocol types for Quizrace's wire format.
//!
//! Everything here is what clients actually see: the records of the game
//! (questions, players, room snapshots) and the request/response messages
//! that carry them. JSON field names are camelCase to match what browser
//! clients expect (`timeLeft`, `choiceIndex`, ...).

use std::fmt;

use quizrace_transport::ConnectionId;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Identifier of a room, supplied by the caller.
///
/// Rooms are created on first reference, so any string is a valid room id.
/// Requests that omit the id land in [`RoomId::DEFAULT`].
///
/// `#[serde(transparent)]` serializes this as the bare string, so
/// `RoomId("main")` is just `"main"` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    /// The shared room used when a request carries no room id.
    pub const DEFAULT: &'static str = "main";

    /// Creates a room id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RoomId {
    fn default() -> Self {
        Self::new(Self::DEFAULT)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Identifier of a player, generated by the room on join.
///
/// Opaque to clients: they receive it in the `joined` reply and echo it
/// back with every answer. Unique within its room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    /// Creates a player id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

// ---------------------------------------------------------------------------
// Game records
// ---------------------------------------------------------------------------

/// One multiple-choice question.
///
/// Immutable once loaded. `answer` is the index into `choices` of the
/// correct choice; it is sent to clients as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: u32,
    pub prompt: String,
    pub choices: Vec<String>,
    pub answer: usize,
}

/// A racer in one room.
///
/// `progress` is the position on the track, always within `0.0..=100.0`.
/// `score` only grows until the room is reset. `streak` counts consecutive
/// correct answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub color: String,
    pub avatar: String,
    pub progress: f64,
    pub score: u64,
    pub streak: u32,
    /// Connection that created this player. Bookkeeping for the transport
    /// layer only, never part of a snapshot.
    #[serde(skip)]
    pub session: Option<ConnectionId>,
}

/// The externally visible state of a room at one instant.
///
/// Pushed to every member after each change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub started: bool,
    /// Seconds left on the current question.
    pub time_left: u32,
    /// The current question, or `None` past the end of the bank.
    pub question: Option<Question>,
    pub players: Vec<Player>,
    /// First (up to three) players to cross the line, in arrival order.
    pub finished: Vec<PlayerId>,
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Requests a client can send.
///
/// Internally tagged, so a start request looks like
/// `{ "type": "start", "roomId": "lobby-2" }`. Every `room_id` is optional;
/// the server fills in its default room when it is missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Add a new racer to the room. Empty fields get generated defaults.
    Join {
        #[serde(default)]
        room_id: Option<RoomId>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        color: Option<String>,
    },

    /// Begin the round.
    Start {
        #[serde(default)]
        room_id: Option<RoomId>,
    },

    /// Skip to the next question.
    Next {
        #[serde(default)]
        room_id: Option<RoomId>,
    },

    /// Return the room and every racer to the starting line.
    Reset {
        #[serde(default)]
        room_id: Option<RoomId>,
    },

    /// Submit an answer to the current question.
    Answer {
        #[serde(default)]
        room_id: Option<RoomId>,
        player_id: PlayerId,
        /// Signed so that out-of-range picks like `-1` decode and score as
        /// wrong instead of failing as malformed.
        choice_index: i64,
    },
}

impl ClientMessage {
    /// The room this request targets, if the client named one.
    pub fn room_id(&self) -> Option<&RoomId> {
        match self {
            Self::Join { room_id, .. }
            | Self::Start { room_id }
            | Self::Next { room_id }
            | Self::Reset { room_id }
            | Self::Answer { room_id, .. } => room_id.as_ref(),
        }
    }
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Messages the server sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Reply to a join: "this racer is you".
    Joined { room_id: RoomId, player: Player },

    /// A room's state after a change. Sent to every member.
    State { room_id: RoomId, snapshot: Snapshot },

    /// The request was well-formed but had no effect, e.g. a second
    /// answer to the same question. Sent only to the requester.
    Rejected { room_id: RoomId, reason: String },

    /// The request could not be understood.
    Error { code: u16, message: String },
}
