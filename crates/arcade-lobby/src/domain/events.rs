//! Domain events for the Lobby context.

use arcade_core::event::EventPayload;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Emitted when a lobby is opened. The host takes the first seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyCreated {
    /// The lobby identifier.
    pub lobby_id: String,
    /// Display name.
    pub name: String,
    /// The player who opened the lobby.
    pub host_id: String,
    /// Seat count.
    pub max_players: u32,
}

/// Emitted when a player takes a seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerJoined {
    /// The lobby identifier.
    pub lobby_id: String,
    /// The seated player.
    pub player_id: String,
}

/// Emitted when a player gives up a seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerLeft {
    /// The lobby identifier.
    pub lobby_id: String,
    /// The departing player.
    pub player_id: String,
}

/// Emitted when the host starts the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStarted {
    /// The lobby identifier.
    pub lobby_id: String,
    /// The game the seated players were handed to.
    pub game_id: Uuid,
}

/// Emitted when the lobby is closed without a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyClosed {
    /// The lobby identifier.
    pub lobby_id: String,
    /// Why it was closed.
    pub reason: String,
}

/// Event type identifier for [`LobbyCreated`].
pub const LOBBY_CREATED_EVENT_TYPE: &str = "lobby.created";

/// Event type identifier for [`PlayerJoined`].
pub const PLAYER_JOINED_EVENT_TYPE: &str = "lobby.player_joined";

/// Event type identifier for [`PlayerLeft`].
pub const PLAYER_LEFT_EVENT_TYPE: &str = "lobby.player_left";

/// Event type identifier for [`GameStarted`].
pub const GAME_STARTED_EVENT_TYPE: &str = "lobby.game_started";

/// Event type identifier for [`LobbyClosed`].
pub const LOBBY_CLOSED_EVENT_TYPE: &str = "lobby.closed";

/// Every event type this context emits.
pub const LOBBY_EVENT_TYPES: [&str; 5] = [
    LOBBY_CREATED_EVENT_TYPE,
    PLAYER_JOINED_EVENT_TYPE,
    PLAYER_LEFT_EVENT_TYPE,
    GAME_STARTED_EVENT_TYPE,
    LOBBY_CLOSED_EVENT_TYPE,
];

/// Event payload variants for the Lobby context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LobbyEvent {
    /// A lobby was opened.
    Created(LobbyCreated),
    /// A player joined.
    PlayerJoined(PlayerJoined),
    /// A player left.
    PlayerLeft(PlayerLeft),
    /// The game started.
    GameStarted(GameStarted),
    /// The lobby was closed.
    Closed(LobbyClosed),
}

impl LobbyEvent {
    /// Returns the lobby the event belongs to.
    #[must_use]
    pub fn lobby_id(&self) -> &str {
        match self {
            Self::Created(e) => &e.lobby_id,
            Self::PlayerJoined(e) => &e.lobby_id,
            Self::PlayerLeft(e) => &e.lobby_id,
            Self::GameStarted(e) => &e.lobby_id,
            Self::Closed(e) => &e.lobby_id,
        }
    }
}

impl EventPayload for LobbyEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::Created(_) => LOBBY_CREATED_EVENT_TYPE,
            Self::PlayerJoined(_) => PLAYER_JOINED_EVENT_TYPE,
            Self::PlayerLeft(_) => PLAYER_LEFT_EVENT_TYPE,
            Self::GameStarted(_) => GAME_STARTED_EVENT_TYPE,
            Self::Closed(_) => LOBBY_CLOSED_EVENT_TYPE,
        }
    }
}
