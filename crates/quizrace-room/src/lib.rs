//! Room engine for Quizrace.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns its
//! game state, its countdown ticker and its auto-advance delay. After
//! every change the room hands a [`Snapshot`](quizrace_protocol::Snapshot)
//! to the [`Broadcaster`].
//!
//! # Key types
//!
//! - [`Room`] — the synchronous state machine: join, start, tick, next,
//!   reset, answer, snapshot
//! - [`QuestionBank`] — immutable question content shared by all rooms
//! - [`RoomRegistry`] — get-or-create rooms by id
//! - [`RoomHandle`] — send commands to a running room actor
//! - [`RoomConfig`] — countdown length, delays, finish slots, defaults
//! - [`Rejection`] — why a request had no effect

mod actor;
mod broadcast;
mod config;
mod error;
mod questions;
mod registry;
mod room;
pub mod scoring;

pub use actor::RoomHandle;
pub use broadcast::Broadcaster;
pub use config::{RoomConfig, RoomPhase};
pub use error::{Rejection, RoomError};
pub use questions::{QuestionBank, QuestionError};
pub use registry::RoomRegistry;
pub use room::{AnswerOutcome, NextOutcome, Room, TickOutcome};
