//! The client's reconciled copy of one room.

use partyline_protocol::{Player, PlayerId, RoomCode, RoomPatch, RoomPhase};
use serde::Serialize;
use serde_json::{Map, Value};

/// Room metadata as last reported by the server.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RoomMeta {
    pub code: Option<RoomCode>,
    pub phase: RoomPhase,
    pub game_type: Option<String>,
    pub host: Option<PlayerId>,
    pub capacity: Option<u32>,
    pub can_start: Option<bool>,
    /// Server fields this client does not model.
    pub extra: Map<String, Value>,
}

impl RoomMeta {
    /// Overwrites every field the patch carries; absent fields keep their
    /// current value.
    pub fn apply_patch(&mut self, patch: &RoomPatch) {
        if let Some(code) = &patch.code {
            self.code = Some(code.clone());
        }
        if let Some(phase) = patch.phase {
            self.phase = phase;
        }
        if let Some(game_type) = &patch.game_type {
            self.game_type = Some(game_type.clone());
        }
        if let Some(host) = &patch.host {
            self.host = Some(host.clone());
        }
        if let Some(capacity) = patch.capacity {
            self.capacity = Some(capacity);
        }
        if let Some(can_start) = patch.can_start {
            self.can_start = Some(can_start);
        }
        for (key, value) in &patch.extra {
            self.extra.insert(key.clone(), value.clone());
        }
    }
}

/// The running game's state blob, keyed by the game type that produced it.
///
/// The blob is opaque here; only the presentation layer for that game type
/// knows how to read it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameSlot {
    pub game_type: String,
    pub state: Value,
}

impl GameSlot {
    /// Shallow-merges `patch` into the state.
    ///
    /// Top-level keys of an object patch replace the same keys of an object
    /// state (nested objects are replaced, not merged). If either side is
    /// not an object the patch replaces the state wholesale.
    pub fn merge(&mut self, patch: &Value) {
        match (&mut self.state, patch) {
            (Value::Object(state), Value::Object(patch)) => {
                for (key, value) in patch {
                    state.insert(key.clone(), value.clone());
                }
            }
            (state, patch) => *state = patch.clone(),
        }
    }
}

/// Reconciled view of one room: metadata, ordered members, and the game
/// state if a game is running.
///
/// Snapshots are replaced, never edited in place, so a subscriber holding
/// an older one always sees a consistent room.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SessionSnapshot {
    pub room: RoomMeta,
    pub players: Vec<Player>,
    pub game: Option<GameSlot>,
    /// Unix milliseconds of the last frame applied to this room.
    pub last_update: Option<u64>,
}

impl SessionSnapshot {
    /// An empty snapshot: lobby phase, no players, no game.
    pub fn empty() -> Self {
        Self::default()
    }

    /// `true` if nothing has been received for this room yet.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Returns a copy stamped with the given receive time.
    pub fn stamped(mut self, at_ms: u64) -> Self {
        self.last_update = Some(at_ms);
        self
    }

    /// The room's current phase.
    pub fn phase(&self) -> RoomPhase {
        self.room.phase
    }

    /// The running game's state blob, if any.
    pub fn game_state(&self) -> Option<&Value> {
        self.game.as_ref().map(|g| &g.state)
    }
}
