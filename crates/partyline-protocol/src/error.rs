//! Error types for the protocol layer.
//!
//! A `ProtocolError` never takes a session down: the session manager logs it
//! and drops the offending frame.

/// Errors that can occur while encoding or decoding frames.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into a frame).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, missing required fields, or
    /// a known event type whose payload has the wrong shape.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame parsed as JSON but is not a valid event envelope, e.g. it
    /// is not an object or has no string `type` discriminant.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
