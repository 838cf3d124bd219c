//! Session client configuration.

use std::time::Duration;

use partyline_reconnect::BackoffConfig;

/// Tuning knobs for a [`SessionClient`](crate::SessionClient).
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// How long a dial may take before it is abandoned with
    /// [`ClientError::HandshakeTimeout`](crate::ClientError::HandshakeTimeout).
    pub handshake_timeout: Duration,
    /// Reconnect back-off after an unplanned loss.
    pub backoff: BackoffConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(5),
            backoff: BackoffConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Lower bound for `handshake_timeout`.
    pub const MIN_HANDSHAKE_TIMEOUT: Duration = Duration::from_millis(100);

    /// Clamp and fix any out-of-range values so the config is safe to use.
    ///
    /// Rules:
    /// - `handshake_timeout` raised to at least [`Self::MIN_HANDSHAKE_TIMEOUT`].
    /// - `backoff` passed through [`BackoffConfig::validated`].
    pub fn validated(mut self) -> Self {
        if self.handshake_timeout < Self::MIN_HANDSHAKE_TIMEOUT {
            tracing::warn!(
                requested_ms = self.handshake_timeout.as_millis() as u64,
                "handshake_timeout too short, clamping"
            );
            self.handshake_timeout = Self::MIN_HANDSHAKE_TIMEOUT;
        }
        self.backoff = self.backoff.validated();
        self
    }
}
