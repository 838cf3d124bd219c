//! Observable session state and injected collaborators for Partyline.
//!
//! This crate holds everything the session driver reads from or publishes
//! to, without owning any connection itself:
//!
//! 1. **Observable state**: [`SessionStore`] keeps the latest
//!    [`SessionView`] and notifies subscribers on every change.
//! 2. **Credentials**: [`TokenProvider`] supplies the bearer token
//!    ([`StaticToken`], [`SharedToken`], or any closure).
//! 3. **Addressing**: [`UrlBuilder`] turns a room and connection kind into a
//!    transport URL ([`Endpoint`] mirrors `http`/`https` to `ws`/`wss`).
//! 4. **Routing**: [`Navigator`] receives navigation effects raised by
//!    phase transitions.
//!
//! # How it fits in the stack
//!
//! ```text
//! partyline (driver)  ← publishes views, calls collaborators
//!     ↕
//! Session Layer (this crate)  ← state surface + collaborator traits
//!     ↕
//! Room / Protocol Layers (below)  ← SessionSnapshot, Route, RoomId
//! ```

mod auth;
mod endpoint;
mod error;
mod navigate;
mod store;

pub use auth::{SharedToken, StaticToken, TokenProvider};
pub use endpoint::{Endpoint, UrlBuilder, with_token};
pub use error::SessionError;
pub use navigate::{Navigator, NoopNavigator};
pub use store::{
    ConnectionPhase, SessionStore, SessionView, Subscription, Target,
};
