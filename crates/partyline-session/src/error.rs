//! Error types for the session layer.

/// Errors raised while preparing a connection target.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The configured origin is not an `http(s)://` or `ws(s)://` URL with a
    /// host.
    #[error("invalid endpoint origin: {0}")]
    InvalidEndpoint(String),

    /// The room id cannot be placed in a transport URL.
    #[error("invalid room id: {0}")]
    InvalidRoom(String),
}
