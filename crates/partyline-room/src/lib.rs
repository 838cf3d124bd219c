//! Room state reconciliation for Partyline.
//!
//! Holds the client's copy of server-authoritative room state
//! ([`SessionSnapshot`]) and the pure merge function ([`apply`]) that folds
//! each decoded server event into it.
//!
//! # How it fits in the stack
//!
//! ```text
//! Session layer (above)  ← commits snapshots, runs effects, notifies UI
//!     ↕
//! Room layer (this crate)  ← event + snapshot → snapshot + effects
//!     ↕
//! Protocol layer (below)  ← provides InboundEvent, Player, RoomPatch
//! ```

mod error;
mod reconcile;
mod route;
mod snapshot;

pub use error::Ignored;
pub use reconcile::{Effect, Reconciled, apply};
pub use route::Route;
pub use snapshot::{GameSlot, RoomMeta, SessionSnapshot};
