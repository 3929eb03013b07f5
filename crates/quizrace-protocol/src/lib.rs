//! Wire protocol for Quizrace.
//!
//! - **Types** ([`Question`], [`Player`], [`Snapshot`], [`ClientMessage`],
//!   [`ServerMessage`]) — the records and messages that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how they become bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! The protocol layer knows nothing about rooms running or timers ticking;
//! it only describes what the room engine's state looks like from outside.
//!
//! ```text
//! Transport (bytes) → Protocol (ClientMessage) → Room engine
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ClientMessage, Player, PlayerId, Question, RoomId, ServerMessage, Snapshot,
};
