//! Unified error type for the session client.

use std::time::Duration;

use partyline_protocol::ProtocolError;
use partyline_reconnect::ReconnectError;
use partyline_session::SessionError;
use partyline_transport::TransportError;

/// Everything a [`SessionClient`](crate::SessionClient) call can fail with.
///
/// Sub-crate errors convert through `#[from]`, so `?` works across layers.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// No auth token was available when a connection was attempted.
    #[error("no auth token available")]
    Unauthenticated,

    /// The transport did not open within the handshake window.
    #[error("handshake did not complete within {0:?}")]
    HandshakeTimeout(Duration),

    /// A transport-level error (dial, send, receive).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An outbound message could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The connection target could not be turned into a URL.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Reconnecting was abandoned.
    #[error(transparent)]
    Reconnect(#[from] ReconnectError),

    /// A later `connect` or a `disconnect` replaced this attempt.
    #[error("connection attempt superseded")]
    Superseded,

    /// No transport is open.
    #[error("not connected")]
    NotConnected,

    /// The session has been disposed.
    #[error("session client has shut down")]
    Shutdown,
}
