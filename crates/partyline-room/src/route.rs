//! Navigation targets raised by phase transitions.

use std::fmt;

use partyline_protocol::RoomCode;

/// Where the presentation layer should go after a phase transition.
///
/// The reconciler only names the destination; the navigator collaborator
/// decides how to reach it. [`Route::path`] gives the conventional URL
/// scheme for routers that want one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    /// The game screen for a room: `/games/<game_type>/<room_code>`.
    Game {
        game_type: String,
        room_code: RoomCode,
    },
    /// The room's lobby screen: `/rooms/<room_code>`.
    Room { room_code: RoomCode },
}

impl Route {
    /// The default path for this route.
    pub fn path(&self) -> String {
        match self {
            Self::Game {
                game_type,
                room_code,
            } => format!("/games/{game_type}/{room_code}"),
            Self::Room { room_code } => format!("/rooms/{room_code}"),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_route_path() {
        let route = Route::Game {
            game_type: "mafia".into(),
            room_code: RoomCode::from("AB12"),
        };
        assert_eq!(route.path(), "/games/mafia/AB12");
        assert_eq!(route.to_string(), "/games/mafia/AB12");
    }

    #[test]
    fn test_room_route_path() {
        let route = Route::Room {
            room_code: RoomCode::from("AB12"),
        };
        assert_eq!(route.path(), "/rooms/AB12");
    }
}
