//! Wire protocol for Partyline.
//!
//! This crate defines what the client and the party-game server say to each
//! other:
//!
//! - **Types** ([`InboundEvent`], [`ControlMessage`], [`RoomPatch`],
//!   [`Player`], identity newtypes): the structures that travel on the
//!   wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`], [`encode`]/[`decode`]): how
//!   those structures become frames and back.
//! - **Errors** ([`ProtocolError`]): what can go wrong doing so.
//!
//! # Architecture
//!
//! ```text
//! Transport (frames) → Protocol (InboundEvent) → Room (SessionSnapshot)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec, decode, encode};
pub use error::ProtocolError;
pub use types::{
    ConnectionKind, ControlMessage, ErrorCode, InboundEvent, Player, PlayerId,
    RoomCode, RoomId, RoomPatch, RoomPhase,
};
