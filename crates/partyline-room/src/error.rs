//! Reasons the reconciler leaves a snapshot untouched.

/// Why an event was accepted but not applied.
///
/// These are not failures of the session: the driver logs them and moves on
/// to the next frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Ignored {
    /// The event arrived in a state where it has no meaning, e.g. a
    /// `game_update` while no game is running.
    #[error("stale {event} ignored: {reason}")]
    StaleEvent {
        event: &'static str,
        reason: &'static str,
    },

    /// The server sent an event kind this client does not recognise.
    #[error("unrecognized event `{kind}` ignored")]
    Unrecognized { kind: String },
}
