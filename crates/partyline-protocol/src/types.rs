//! Core protocol types for Partyline's wire format.
//!
//! Every type here either travels on the wire (inbound events, outbound
//! control messages) or names something the wire refers to (rooms,
//! players, connection kinds).

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Identifier of the room a connection targets (the `/ws/<room>` segment).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for RoomId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// The short, human-shareable code of a room (e.g. `AB12`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(pub String);

impl RoomCode {
    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomCode {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// A player's identifier as assigned by the server.
///
/// Servers emit either numeric ids (`1`) or opaque string ids
/// (`"65f0c2..."`). Both are accepted and normalised to a string; the id is
/// always serialized back as a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl<'de> Deserialize<'de> for PlayerId {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(i64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => PlayerId(s),
            Raw::Number(n) => PlayerId(n.to_string()),
        })
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// The code attached to a server `error` frame.
///
/// Servers send HTTP-style numbers (`403`) or symbolic names
/// (`"ROOM_FULL"`); both are kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ErrorCode(pub String);

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(i64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => ErrorCode(s),
            Raw::Number(n) => ErrorCode(n.to_string()),
        })
    }
}

impl ErrorCode {
    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ErrorCode {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

// ---------------------------------------------------------------------------
// ConnectionKind
// ---------------------------------------------------------------------------

/// Which server endpoint a connection is for.
///
/// The same room is reachable through a lobby socket (membership and ready
/// state) and a game socket (in-game state); the kind may be folded into the
/// transport URL path.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionKind {
    #[default]
    Lobby,
    Game,
}

impl ConnectionKind {
    /// The lowercase wire/path name of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lobby => "lobby",
            Self::Game => "game",
        }
    }
}

impl fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Room and player data
// ---------------------------------------------------------------------------

/// Lifecycle phase of a room.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum RoomPhase {
    /// Players are gathering and toggling ready.
    #[default]
    Lobby,
    /// A game is running.
    InGame,
    /// The room is closed for good.
    Ended,
}

impl fmt::Display for RoomPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Lobby => "lobby",
            Self::InGame => "in_game",
            Self::Ended => "ended",
        })
    }
}

/// One member of a room, in server order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    #[serde(alias = "user_id")]
    pub id: PlayerId,
    #[serde(alias = "nickname", default)]
    pub name: String,
    /// Accepts a boolean `ready` or the room service's
    /// `"state": "ready" | "not_ready"`.
    #[serde(alias = "state", default, deserialize_with = "ready_flag")]
    pub ready: bool,
}

fn ready_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Flag(bool),
        State(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Flag(flag) => Ok(flag),
        Raw::State(state) => match state.as_str() {
            "ready" => Ok(true),
            "not_ready" => Ok(false),
            other => Err(serde::de::Error::unknown_variant(
                other,
                &["ready", "not_ready"],
            )),
        },
    }
}

/// Room metadata carried by a `room_update`.
///
/// Every field is optional: only the fields present in the frame replace
/// the corresponding fields of the local snapshot. Fields this client does
/// not model are kept verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RoomPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<RoomCode>,
    #[serde(
        default,
        alias = "room_state",
        skip_serializing_if = "Option::is_none"
    )]
    pub phase: Option<RoomPhase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<PlayerId>,
    /// Seats in the room.
    #[serde(
        default,
        alias = "num_players",
        skip_serializing_if = "Option::is_none"
    )]
    pub capacity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_start: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// InboundEvent: server → client
// ---------------------------------------------------------------------------

/// A decoded server frame.
///
/// `#[serde(tag = "type", rename_all = "snake_case")]` maps the frame's
/// `type` field onto the variant:
///   `{ "type": "game_ended", "room_code": "AB12" }` → `GameEnded { .. }`
///
/// `Unknown` is never produced by serde itself; the frame decoder builds it
/// for discriminants this client does not recognise so newer servers can
/// add event kinds without breaking older clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    /// The server accepted the connection's credentials.
    HandshakeAck {
        #[serde(default)]
        player_id: Option<PlayerId>,
    },

    /// Room metadata changed. `players` is always the full member list.
    RoomUpdate { room: RoomPatch, players: Vec<Player> },

    /// A game began in the room; `game_state` is its initial state.
    GameStarted {
        game_type: String,
        room_code: RoomCode,
        game_state: Value,
    },

    /// Partial game-state patch, shallow-merged into the current state.
    GameUpdate { game_state: Value },

    /// The running game finished; the room returns to its lobby.
    GameEnded { room_code: RoomCode },

    /// The server reported a problem.
    Error {
        #[serde(default)]
        code: Option<ErrorCode>,
        message: String,
    },

    /// An event kind this client does not know about.
    #[serde(skip)]
    Unknown { kind: String },
}

impl InboundEvent {
    /// Discriminants the decoder maps onto a typed variant.
    pub const KNOWN_KINDS: [&'static str; 6] = [
        "handshake_ack",
        "room_update",
        "game_started",
        "game_update",
        "game_ended",
        "error",
    ];

    /// The wire discriminant of this event.
    pub fn kind(&self) -> &str {
        match self {
            Self::HandshakeAck { .. } => "handshake_ack",
            Self::RoomUpdate { .. } => "room_update",
            Self::GameStarted { .. } => "game_started",
            Self::GameUpdate { .. } => "game_update",
            Self::GameEnded { .. } => "game_ended",
            Self::Error { .. } => "error",
            Self::Unknown { kind } => kind,
        }
    }
}

// ---------------------------------------------------------------------------
// ControlMessage: client → server
// ---------------------------------------------------------------------------

/// Outbound control frames. The handshake itself needs none of these (the
/// bearer token travels in the URL); they cover keep-alive and polite
/// teardown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    /// Keep-alive. `client_time` is echoed back by servers that answer.
    Ping { client_time: u64 },

    /// The client is leaving on purpose.
    Disconnect { reason: String },
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_player_id_accepts_number_and_string() {
        let from_number: PlayerId = serde_json::from_value(json!(1)).unwrap();
        let from_text: PlayerId =
            serde_json::from_value(json!("65f0c2")).unwrap();
        assert_eq!(from_number, PlayerId::from("1"));
        assert_eq!(from_text, PlayerId::from("65f0c2"));
    }

    #[test]
    fn test_player_id_serializes_as_string() {
        let json = serde_json::to_value(PlayerId::from("7")).unwrap();
        assert_eq!(json, json!("7"));
    }

    #[test]
    fn test_room_phase_wire_names() {
        assert_eq!(serde_json::to_value(RoomPhase::InGame).unwrap(), "in_game");
        let phase: RoomPhase = serde_json::from_value(json!("ended")).unwrap();
        assert_eq!(phase, RoomPhase::Ended);
        assert_eq!(RoomPhase::InGame.to_string(), "in_game");
    }

    #[test]
    fn test_connection_kind_as_str() {
        assert_eq!(ConnectionKind::Lobby.as_str(), "lobby");
        assert_eq!(ConnectionKind::Game.to_string(), "game");
        assert_eq!(ConnectionKind::default(), ConnectionKind::Lobby);
    }

    #[test]
    fn test_player_accepts_backend_aliases() {
        // The room service stores members as `user_id` + `nickname`.
        let player: Player = serde_json::from_value(json!({
            "user_id": "u-1",
            "nickname": "Ann"
        }))
        .unwrap();
        assert_eq!(player.id, PlayerId::from("u-1"));
        assert_eq!(player.name, "Ann");
        assert!(!player.ready, "ready defaults to false");
    }

    #[test]
    fn test_player_ready_from_backend_state() {
        let ready: Player = serde_json::from_value(json!({
            "user_id": "u1",
            "nickname": "Ann",
            "state": "ready"
        }))
        .unwrap();
        assert!(ready.ready);

        let waiting: Player = serde_json::from_value(json!({
            "user_id": "u2",
            "state": "not_ready"
        }))
        .unwrap();
        assert!(!waiting.ready);

        let flagged: Player =
            serde_json::from_value(json!({"id": 3, "ready": true})).unwrap();
        assert!(flagged.ready);
    }

    #[test]
    fn test_player_rejects_unknown_state() {
        let result: Result<Player, _> =
            serde_json::from_value(json!({"user_id": "u1", "state": "asleep"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_room_patch_keeps_unmodelled_fields() {
        let patch: RoomPatch = serde_json::from_value(json!({
            "code": "AB12",
            "room_state": "lobby",
            "num_players": 6,
            "chat_history": []
        }))
        .unwrap();
        assert_eq!(patch.code, Some(RoomCode::from("AB12")));
        assert_eq!(patch.phase, Some(RoomPhase::Lobby));
        assert_eq!(patch.capacity, Some(6));
        assert_eq!(patch.game_type, None);
        assert_eq!(patch.extra.get("chat_history"), Some(&json!([])));
    }

    #[test]
    fn test_inbound_event_internally_tagged() {
        let event: InboundEvent = serde_json::from_value(json!({
            "type": "game_started",
            "game_type": "mafia",
            "room_code": "AB12",
            "game_state": {"day": 1}
        }))
        .unwrap();
        assert_eq!(
            event,
            InboundEvent::GameStarted {
                game_type: "mafia".into(),
                room_code: RoomCode::from("AB12"),
                game_state: json!({"day": 1}),
            }
        );
    }

    #[test]
    fn test_error_event_code_is_optional() {
        let event: InboundEvent = serde_json::from_value(json!({
            "type": "error",
            "message": "room is full"
        }))
        .unwrap();
        assert_eq!(
            event,
            InboundEvent::Error {
                code: None,
                message: "room is full".into()
            }
        );
    }

    #[test]
    fn test_error_event_code_accepts_number_or_name() {
        let numeric: InboundEvent = serde_json::from_value(json!({
            "type": "error",
            "code": 403,
            "message": "not your turn"
        }))
        .unwrap();
        let named: InboundEvent = serde_json::from_value(json!({
            "type": "error",
            "code": "ROOM_FULL",
            "message": "room is full"
        }))
        .unwrap();

        assert!(matches!(
            numeric,
            InboundEvent::Error { code: Some(ref c), .. } if c.as_str() == "403"
        ));
        assert!(matches!(
            named,
            InboundEvent::Error { code: Some(ref c), .. } if c.as_str() == "ROOM_FULL"
        ));
    }

    #[test]
    fn test_known_kinds_match_variant_kinds() {
        // Every listed discriminant must deserialize into a variant that
        // reports the same kind, or the decoder would misroute frames.
        let samples = [
            json!({"type": "handshake_ack"}),
            json!({"type": "room_update", "room": {}, "players": []}),
            json!({"type": "game_started", "game_type": "spyfall",
                   "room_code": "X", "game_state": {}}),
            json!({"type": "game_update", "game_state": {}}),
            json!({"type": "game_ended", "room_code": "X"}),
            json!({"type": "error", "message": "m"}),
        ];
        for (kind, sample) in InboundEvent::KNOWN_KINDS.iter().zip(samples) {
            let event: InboundEvent = serde_json::from_value(sample).unwrap();
            assert_eq!(event.kind(), *kind);
        }
    }

    #[test]
    fn test_control_message_json_format() {
        let json =
            serde_json::to_value(ControlMessage::Ping { client_time: 5 })
                .unwrap();
        assert_eq!(json, json!({"type": "ping", "client_time": 5}));

        let json = serde_json::to_value(ControlMessage::Disconnect {
            reason: "leaving".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "disconnect");
        assert_eq!(json["reason"], "leaving");
    }
}
