//! Merging server events into a [`SessionSnapshot`].
//!
//! [`apply`] is a pure function of `(event, current)`: it never reads a
//! clock, touches I/O, or calls back into the UI. Side effects the event
//! implies (navigation, error display) are returned as [`Effect`] values for
//! the caller to run *after* it has committed the new snapshot.
//!
//! | event          | snapshot                                   | effects            |
//! |----------------|--------------------------------------------|--------------------|
//! | `room_update`  | patch room fields, replace player list     | none               |
//! | `game_started` | set game slot, phase → `in_game`           | navigate to game   |
//! | `game_update`  | shallow-merge into game slot (if any)      | none               |
//! | `game_ended`   | clear game slot, phase → `lobby`           | navigate to room   |
//! | `error`        | unchanged                                  | report error       |

use partyline_protocol::{ErrorCode, InboundEvent, RoomPhase};

use crate::{GameSlot, Ignored, Route, SessionSnapshot};

/// A side effect requested by an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send the presentation layer to `Route`.
    Navigate(Route),
    /// Surface a server-reported problem on the observable error channel.
    ReportError {
        code: Option<ErrorCode>,
        message: String,
    },
}

/// The outcome of applying one event.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    /// The next snapshot. Equal to the input when the event was ignored.
    pub snapshot: SessionSnapshot,
    /// Effects to run after committing `snapshot`, in order.
    pub effects: Vec<Effect>,
    /// Set when the event was dropped without changing anything.
    pub ignored: Option<Ignored>,
}

impl Reconciled {
    fn changed(snapshot: SessionSnapshot, effects: Vec<Effect>) -> Self {
        Self {
            snapshot,
            effects,
            ignored: None,
        }
    }

    fn unchanged(current: &SessionSnapshot, effects: Vec<Effect>) -> Self {
        Self {
            snapshot: current.clone(),
            effects,
            ignored: None,
        }
    }

    fn ignored(current: &SessionSnapshot, reason: Ignored) -> Self {
        Self {
            snapshot: current.clone(),
            effects: Vec::new(),
            ignored: Some(reason),
        }
    }
}

/// Applies `event` to `current`, producing the next snapshot and any
/// effects.
pub fn apply(event: &InboundEvent, current: &SessionSnapshot) -> Reconciled {
    match event {
        InboundEvent::HandshakeAck { .. } => {
            Reconciled::unchanged(current, Vec::new())
        }

        InboundEvent::RoomUpdate { room, players } => {
            let mut next = current.clone();
            next.room.apply_patch(room);
            // Membership and ready state come only from the server: the
            // list is replaced, never merged.
            next.players = players.clone();
            Reconciled::changed(next, Vec::new())
        }

        InboundEvent::GameStarted {
            game_type,
            room_code,
            game_state,
        } => {
            let mut next = current.clone();
            next.game = Some(GameSlot {
                game_type: game_type.clone(),
                state: game_state.clone(),
            });
            next.room.phase = RoomPhase::InGame;
            next.room.game_type = Some(game_type.clone());
            if next.room.code.is_none() {
                next.room.code = Some(room_code.clone());
            }
            let route = Route::Game {
                game_type: game_type.clone(),
                room_code: room_code.clone(),
            };
            Reconciled::changed(next, vec![Effect::Navigate(route)])
        }

        InboundEvent::GameUpdate { game_state } => {
            if current.game.is_none() {
                return Reconciled::ignored(
                    current,
                    Ignored::StaleEvent {
                        event: "game_update",
                        reason: "no game has started",
                    },
                );
            }
            let mut next = current.clone();
            if let Some(game) = next.game.as_mut() {
                game.merge(game_state);
            }
            Reconciled::changed(next, Vec::new())
        }

        InboundEvent::GameEnded { room_code } => {
            let mut next = current.clone();
            next.game = None;
            next.room.phase = RoomPhase::Lobby;
            let route = Route::Room {
                room_code: room_code.clone(),
            };
            Reconciled::changed(next, vec![Effect::Navigate(route)])
        }

        InboundEvent::Error { code, message } => Reconciled::unchanged(
            current,
            vec![Effect::ReportError {
                code: code.clone(),
                message: message.clone(),
            }],
        ),

        InboundEvent::Unknown { kind } => Reconciled::ignored(
            current,
            Ignored::Unrecognized { kind: kind.clone() },
        ),
    }
}

#[cfg(test)]
mod tests {
    use partyline_protocol::{Player, PlayerId, RoomCode, RoomPatch};
    use serde_json::{Value, json};

    use super::*;

    fn player(id: &str, name: &str, ready: bool) -> Player {
        Player {
            id: PlayerId::from(id),
            name: name.into(),
            ready,
        }
    }

    fn room_update(code: &str, players: Vec<Player>) -> InboundEvent {
        InboundEvent::RoomUpdate {
            room: RoomPatch {
                code: Some(RoomCode::from(code)),
                phase: Some(RoomPhase::Lobby),
                ..RoomPatch::default()
            },
            players,
        }
    }

    fn in_game(state: Value) -> SessionSnapshot {
        let started = InboundEvent::GameStarted {
            game_type: "mafia".into(),
            room_code: RoomCode::from("AB12"),
            game_state: state,
        };
        apply(&started, &SessionSnapshot::empty()).snapshot
    }

    #[test]
    fn test_room_update_replaces_player_list() {
        let first = apply(
            &room_update("AB12", vec![player("1", "Ann", false)]),
            &SessionSnapshot::empty(),
        );
        let second = apply(
            &room_update("AB12", vec![player("2", "Bo", true)]),
            &first.snapshot,
        );

        assert_eq!(second.snapshot.players, vec![player("2", "Bo", true)]);
        assert!(second.effects.is_empty());
        assert!(second.ignored.is_none());
    }

    #[test]
    fn test_room_update_keeps_game_slot() {
        let current = in_game(json!({"day": 1}));
        let next = apply(&room_update("AB12", vec![]), &current);
        assert_eq!(next.snapshot.game_state(), Some(&json!({"day": 1})));
    }

    #[test]
    fn test_game_update_without_game_is_ignored() {
        let current = apply(
            &room_update("AB12", vec![player("1", "Ann", false)]),
            &SessionSnapshot::empty(),
        )
        .snapshot;

        let result = apply(
            &InboundEvent::GameUpdate {
                game_state: json!({"day": 2}),
            },
            &current,
        );

        assert_eq!(result.snapshot, current);
        assert!(matches!(
            result.ignored,
            Some(Ignored::StaleEvent { event: "game_update", .. })
        ));
    }

    #[test]
    fn test_game_update_shallow_merges() {
        let current = in_game(json!({"day": 1, "phase": "night"}));

        let result = apply(
            &InboundEvent::GameUpdate {
                game_state: json!({"phase": "day"}),
            },
            &current,
        );

        assert_eq!(
            result.snapshot.game_state(),
            Some(&json!({"day": 1, "phase": "day"}))
        );
    }

    #[test]
    fn test_game_started_navigates_to_game_route() {
        let result = apply(
            &InboundEvent::GameStarted {
                game_type: "spyfall".into(),
                room_code: RoomCode::from("ZZ99"),
                game_state: json!({}),
            },
            &SessionSnapshot::empty(),
        );

        assert_eq!(result.snapshot.phase(), RoomPhase::InGame);
        assert_eq!(result.snapshot.room.code, Some(RoomCode::from("ZZ99")));
        assert_eq!(
            result.effects,
            vec![Effect::Navigate(Route::Game {
                game_type: "spyfall".into(),
                room_code: RoomCode::from("ZZ99"),
            })]
        );
    }

    #[test]
    fn test_game_ended_clears_game_and_returns_to_lobby() {
        let current = in_game(json!({"day": 3}));

        let result = apply(
            &InboundEvent::GameEnded {
                room_code: RoomCode::from("AB12"),
            },
            &current,
        );

        assert!(result.snapshot.game.is_none());
        assert_eq!(result.snapshot.phase(), RoomPhase::Lobby);
        assert_eq!(
            result.effects,
            vec![Effect::Navigate(Route::Room {
                room_code: RoomCode::from("AB12")
            })]
        );
    }

    #[test]
    fn test_error_reports_without_touching_state() {
        let current = in_game(json!({"day": 1}));

        let result = apply(
            &InboundEvent::Error {
                code: Some(ErrorCode::from("403")),
                message: "not your turn".into(),
            },
            &current,
        );

        assert_eq!(result.snapshot, current);
        assert_eq!(
            result.effects,
            vec![Effect::ReportError {
                code: Some(ErrorCode::from("403")),
                message: "not your turn".into()
            }]
        );
    }

    #[test]
    fn test_unknown_event_is_noop() {
        let current = in_game(json!({"day": 1}));
        let result = apply(
            &InboundEvent::Unknown {
                kind: "chat_message".into(),
            },
            &current,
        );
        assert_eq!(result.snapshot, current);
        assert!(result.effects.is_empty());
        assert_eq!(
            result.ignored,
            Some(Ignored::Unrecognized {
                kind: "chat_message".into()
            })
        );
    }

    #[test]
    fn test_handshake_ack_is_noop() {
        let current = in_game(json!({"day": 1}));
        let result = apply(
            &InboundEvent::HandshakeAck { player_id: None },
            &current,
        );
        assert_eq!(result.snapshot, current);
        assert!(result.ignored.is_none());
    }
}
