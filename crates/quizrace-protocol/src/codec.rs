//! Codec trait and implementations for serializing messages.
//!
//! The server only needs *something* that turns messages into bytes and
//! back, so the handler is generic over [`Codec`]. [`JsonCodec`] is the
//! only implementation today; browser clients speak JSON natively.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// Encodes values to bytes and decodes bytes back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if the value cannot be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or
    /// don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`.
///
/// ```rust
/// use quizrace_protocol::{ClientMessage, Codec, JsonCodec};
///
/// let codec = JsonCodec;
/// let msg: ClientMessage = codec
///     .decode(br#"{"type":"start","roomId":"lobby"}"#)
///     .unwrap();
/// assert!(matches!(msg, ClientMessage::Start { room_id: Some(_) }));
///
/// let bytes = codec.encode(&msg).unwrap();
/// let again: ClientMessage = codec.decode(&bytes).unwrap();
/// assert_eq!(msg, again);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        if data.trim_ascii().is_empty() {
            return Err(ProtocolError::EmptyFrame);
        }
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
