//! Codec trait, the JSON codec, and the frame-level encode/decode entry
//! points used by the session manager.
//!
//! A "codec" (coder/decoder) converts between Rust types and raw bytes. The
//! [`Codec`] trait keeps the byte format swappable; [`JsonCodec`] is the one
//! the party-game server speaks.
//!
//! [`encode`] and [`decode`] sit on top of it and fix the frame contract:
//! decoding is *total*. Every byte slice yields either an [`InboundEvent`]
//! or a [`ProtocolError`], never a panic, and an unrecognised `type`
//! yields [`InboundEvent::Unknown`] rather than an error.

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{ControlMessage, InboundEvent, ProtocolError};

/// A codec that can encode Rust types to bytes and decode bytes back.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use partyline_protocol::{Codec, ControlMessage, JsonCodec};
///
/// let codec = JsonCodec;
/// let bytes = codec.encode(&ControlMessage::Ping { client_time: 5 }).unwrap();
/// assert_eq!(bytes, br#"{"type":"ping","client_time":5}"#);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

// ---------------------------------------------------------------------------
// Frame entry points
// ---------------------------------------------------------------------------

/// Encodes an outbound control message into a wire frame.
pub fn encode(msg: &ControlMessage) -> Result<Vec<u8>, ProtocolError> {
    JsonCodec.encode(msg)
}

/// Decodes one inbound wire frame.
///
/// # Errors
/// - [`ProtocolError::Decode`]: not JSON, or a known `type` whose payload
///   has the wrong shape (e.g. `"room": "not-an-object"`).
/// - [`ProtocolError::InvalidMessage`]: JSON, but not an object with a
///   string `type`.
pub fn decode(frame: &[u8]) -> Result<InboundEvent, ProtocolError> {
    let value: Value = JsonCodec.decode(frame)?;

    let Value::Object(fields) = &value else {
        return Err(ProtocolError::InvalidMessage(
            "frame is not a JSON object".into(),
        ));
    };
    let kind = match fields.get("type") {
        Some(Value::String(kind)) => kind.as_str(),
        Some(_) => {
            return Err(ProtocolError::InvalidMessage(
                "`type` must be a string".into(),
            ));
        }
        None => {
            return Err(ProtocolError::InvalidMessage(
                "frame has no `type`".into(),
            ));
        }
    };

    if !InboundEvent::KNOWN_KINDS.contains(&kind) {
        return Ok(InboundEvent::Unknown {
            kind: kind.to_owned(),
        });
    }

    serde_json::from_value(value).map_err(ProtocolError::Decode)
}
