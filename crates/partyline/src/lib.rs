//! # Partyline
//!
//! Real-time session client for multiplayer party-game servers.
//!
//! A [`SessionClient`] keeps one local session synchronized with a room on
//! the server: it dials the transport with the caller's bearer token,
//! reconnects with exponential back-off after unplanned losses, decodes
//! every frame into an [`InboundEvent`](partyline_protocol::InboundEvent),
//! reconciles it into a [`SessionSnapshot`](partyline_room::SessionSnapshot),
//! and publishes the result to subscribers.
//!
//! ## Layers
//!
//! ```text
//! partyline            SessionClient + driver task
//!   ├─ partyline-session    SessionStore, TokenProvider, UrlBuilder, Navigator
//!   ├─ partyline-reconnect  ReconnectPolicy (back-off, jitter, ceiling)
//!   ├─ partyline-room       apply(event, snapshot) → snapshot + effects
//!   ├─ partyline-protocol   InboundEvent / ControlMessage codec
//!   └─ partyline-transport  Dialer / Connection (WebSocket)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use partyline::prelude::*;
//!
//! # async fn run() -> Result<(), ClientError> {
//! let client = SessionClient::builder().build(
//!     WebSocketDialer::new(),
//!     Endpoint::from_origin("http://localhost:8000")?,
//!     StaticToken::new("jwt"),
//! );
//! let _sub = client.subscribe(|view| {
//!     println!("{} players", view.snapshot.players.len());
//! });
//! client.connect("AB12", ConnectionKind::Lobby).await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod driver;
mod error;

pub use client::{SessionClient, SessionClientBuilder};
pub use config::ClientConfig;
pub use driver::MessageHandler;
pub use error::ClientError;

/// Re-exports for typical use of the session client.
pub mod prelude {
    pub use crate::{ClientConfig, ClientError, SessionClient, SessionClientBuilder};

    pub use partyline_protocol::{
        ConnectionKind, ControlMessage, ErrorCode, InboundEvent, Player,
        PlayerId, RoomCode, RoomId, RoomPhase,
    };
    pub use partyline_reconnect::BackoffConfig;
    pub use partyline_room::{Route, SessionSnapshot};
    pub use partyline_session::{
        ConnectionPhase, Endpoint, Navigator, SessionView, SharedToken,
        StaticToken, Subscription, Target, TokenProvider, UrlBuilder,
    };
    pub use partyline_transport::{Dialer, WebSocketDialer};
}
