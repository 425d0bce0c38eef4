//! Commands for the Lobby context.

use arcade_core::command::Command;
use uuid::Uuid;

/// Command to open a new lobby.
#[derive(Debug, Clone)]
pub struct CreateLobby {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Requested identifier; a time-ordered UUID is generated when `None`.
    pub lobby_id: Option<String>,
    /// Display name.
    pub name: String,
    /// The player opening the lobby.
    pub host_id: String,
    /// Seat count; the configured default applies when `None`.
    pub max_players: Option<u32>,
}

impl Command for CreateLobby {
    fn command_type(&self) -> &'static str {
        "lobby.create"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn actor_id(&self) -> Option<&str> {
        Some(&self.host_id)
    }
}

/// Command to seat a player.
#[derive(Debug, Clone)]
pub struct JoinLobby {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The lobby identifier.
    pub lobby_id: String,
    /// The joining player.
    pub player_id: String,
}

impl Command for JoinLobby {
    fn command_type(&self) -> &'static str {
        "lobby.join"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn actor_id(&self) -> Option<&str> {
        Some(&self.player_id)
    }
}

/// Command to remove a seated player.
#[derive(Debug, Clone)]
pub struct LeaveLobby {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The lobby identifier.
    pub lobby_id: String,
    /// The departing player.
    pub player_id: String,
}

impl Command for LeaveLobby {
    fn command_type(&self) -> &'static str {
        "lobby.leave"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn actor_id(&self) -> Option<&str> {
        Some(&self.player_id)
    }
}

/// Command to start the game.
#[derive(Debug, Clone)]
pub struct StartGame {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The lobby identifier.
    pub lobby_id: String,
    /// Must be the current host.
    pub requested_by: String,
}

impl Command for StartGame {
    fn command_type(&self) -> &'static str {
        "lobby.start_game"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn actor_id(&self) -> Option<&str> {
        Some(&self.requested_by)
    }
}

/// Command to close a lobby without starting a game.
#[derive(Debug, Clone)]
pub struct CloseLobby {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The lobby identifier.
    pub lobby_id: String,
    /// Why it is being closed.
    pub reason: String,
}

impl Command for CloseLobby {
    fn command_type(&self) -> &'static str {
        "lobby.close"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
