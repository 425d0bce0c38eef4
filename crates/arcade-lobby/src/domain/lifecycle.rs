//! Lobby lifecycle state machine.
//!
//! ```text
//! Waiting --PlayerJoined [>= 2 seated]--> Ready --PlayerJoined [all seats taken]--> Full
//! Waiting <--PlayerLeft [< 2 seated]-- Ready <--PlayerLeft [a seat is free]-- Full
//! Ready | Full --StartGame--> InGame
//! Waiting | Ready | Full --Close--> Closed
//! ```

use std::fmt;
use std::sync::Arc;

use arcade_state_machine::{StateMachineConfig, StateMachineError, TransitionDefinition};
use serde::{Deserialize, Serialize};

/// Where a lobby is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LobbyStatus {
    /// Fewer than two players seated.
    Waiting,
    /// Enough players to start, seats still free.
    Ready,
    /// Every seat taken.
    Full,
    /// Handed over to a game. Final.
    InGame,
    /// Closed without a game. Final.
    Closed,
}

impl fmt::Display for LobbyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Waiting => "waiting",
            Self::Ready => "ready",
            Self::Full => "full",
            Self::InGame => "in_game",
            Self::Closed => "closed",
        })
    }
}

/// Lifecycle triggers, one per roster-changing event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LobbyTrigger {
    /// A player was seated.
    PlayerJoined,
    /// A player left.
    PlayerLeft,
    /// The host started the game.
    StartGame,
    /// The lobby was closed.
    Close,
}

/// The state the lifecycle guards read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyRoster {
    /// Display name.
    pub name: String,
    /// Current host; passes to the longest-seated player when the host leaves.
    pub host_id: String,
    /// Seat count.
    pub max_players: u32,
    /// Seated players in join order.
    pub players: Vec<String>,
    /// Set once the game starts.
    pub game_id: Option<uuid::Uuid>,
    /// Set once the lobby is closed.
    pub close_reason: Option<String>,
}

impl LobbyRoster {
    /// Number of seated players.
    #[must_use]
    pub fn player_count(&self) -> u32 {
        u32::try_from(self.players.len()).unwrap_or(u32::MAX)
    }

    /// Returns `true` if `player_id` is seated.
    #[must_use]
    pub fn is_seated(&self, player_id: &str) -> bool {
        self.players.iter().any(|p| p == player_id)
    }
}

/// Minimum seated players before a game can start.
pub const MIN_PLAYERS: u32 = 2;

/// The lobby lifecycle configuration type.
pub type LobbyLifecycle = StateMachineConfig<LobbyStatus, LobbyTrigger, LobbyRoster>;

/// Builds the lobby lifecycle. Build once and share the `Arc`.
///
/// # Errors
///
/// Returns `StateMachineError` if the definition is inconsistent.
pub fn lobby_lifecycle() -> Result<Arc<LobbyLifecycle>, StateMachineError> {
    use LobbyStatus::{Closed, Full, InGame, Ready, Waiting};
    use LobbyTrigger::{Close, PlayerJoined, PlayerLeft, StartGame};

    LobbyLifecycle::builder(Waiting)
        .state(Waiting)
        .state(Ready)
        .state(Full)
        .state(InGame)
        .state(Closed)
        .transition(
            TransitionDefinition::new(Waiting, PlayerJoined, Ready)
                .guard(|roster: &LobbyRoster, &()| roster.player_count() >= MIN_PLAYERS),
        )
        .transition(
            TransitionDefinition::new(Ready, PlayerJoined, Full)
                .guard(|roster: &LobbyRoster, &()| roster.player_count() >= roster.max_players),
        )
        .transition(
            TransitionDefinition::new(Full, PlayerLeft, Ready)
                .guard(|roster: &LobbyRoster, &()| roster.player_count() < roster.max_players),
        )
        .transition(
            TransitionDefinition::new(Ready, PlayerLeft, Waiting)
                .guard(|roster: &LobbyRoster, &()| roster.player_count() < MIN_PLAYERS),
        )
        .transition(TransitionDefinition::new(Ready, StartGame, InGame))
        .transition(TransitionDefinition::new(Full, StartGame, InGame))
        .transition(TransitionDefinition::new(Waiting, Close, Closed))
        .transition(TransitionDefinition::new(Ready, Close, Closed))
        .transition(TransitionDefinition::new(Full, Close, Closed))
        .final_state(InGame)
        .final_state(Closed)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcade_state_machine::StateMachine;

    fn roster(players: &[&str], max_players: u32) -> LobbyRoster {
        LobbyRoster {
            max_players,
            players: players.iter().map(|p| (*p).to_owned()).collect(),
            ..LobbyRoster::default()
        }
    }

    #[test]
    fn test_lifecycle_builds_with_final_states() {
        let lifecycle = lobby_lifecycle().unwrap();

        assert_eq!(*lifecycle.initial_state(), LobbyStatus::Waiting);
        assert!(lifecycle.is_final(&LobbyStatus::InGame));
        assert!(lifecycle.is_final(&LobbyStatus::Closed));
        assert!(!lifecycle.is_final(&LobbyStatus::Full));
    }

    #[test]
    fn test_waiting_lobby_cannot_start() {
        let machine = StateMachine::new(lobby_lifecycle().unwrap(), roster(&["ana"], 4));

        assert!(!machine.can_transition(&LobbyTrigger::StartGame, &()));
        assert_eq!(
            machine.available_events(),
            vec![LobbyTrigger::PlayerJoined, LobbyTrigger::Close]
        );
    }

    #[test]
    fn test_second_player_makes_lobby_ready() {
        // Arrange
        let mut machine = StateMachine::new(lobby_lifecycle().unwrap(), roster(&["ana"], 4));

        // Act
        machine.context_mut().players.push("bo".to_owned());
        let fired = machine.send(LobbyTrigger::PlayerJoined, &()).unwrap();

        // Assert
        assert!(fired);
        assert_eq!(*machine.current_state(), LobbyStatus::Ready);
        assert!(machine.can_transition(&LobbyTrigger::StartGame, &()));
    }

    #[test]
    fn test_full_lobby_frees_a_seat_on_leave() {
        let mut machine = StateMachine::restore(
            lobby_lifecycle().unwrap(),
            roster(&["ana", "bo"], 3),
            LobbyStatus::Full,
        )
        .unwrap();

        assert!(machine.send(LobbyTrigger::PlayerLeft, &()).unwrap());

        assert_eq!(*machine.current_state(), LobbyStatus::Ready);
    }

    #[test]
    fn test_status_display_is_snake_case() {
        assert_eq!(LobbyStatus::InGame.to_string(), "in_game");
        assert_eq!(
            serde_json::to_value(LobbyStatus::InGame).unwrap(),
            serde_json::json!("in_game")
        );
    }
}
