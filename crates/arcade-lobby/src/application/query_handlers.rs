//! Query handlers for the Lobby context.

use arcade_core::aggregate::AggregateRoot;
use arcade_core::error::DomainError;
use serde::Serialize;
use uuid::Uuid;

use super::ports::LobbyPorts;
use super::repository::load_lobby;
use crate::domain::aggregates::Lobby;
use crate::domain::lifecycle::LobbyStatus;

/// Read model for a single lobby.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LobbyView {
    /// Lobby identifier.
    pub lobby_id: String,
    /// Display name.
    pub name: String,
    /// Current host.
    pub host_id: String,
    /// Lifecycle state.
    pub status: LobbyStatus,
    /// Seated players in join order.
    pub players: Vec<String>,
    /// Seat count.
    pub max_players: u32,
    /// Present once the game has started.
    pub game_id: Option<Uuid>,
    /// Stream version the view was built from.
    pub version: u64,
}

impl From<&Lobby> for LobbyView {
    fn from(lobby: &Lobby) -> Self {
        let roster = lobby.roster();
        Self {
            lobby_id: lobby.aggregate_id().to_owned(),
            name: roster.name.clone(),
            host_id: roster.host_id.clone(),
            status: lobby.status(),
            players: roster.players.clone(),
            max_players: roster.max_players,
            game_id: roster.game_id,
            version: lobby.version(),
        }
    }
}

/// Retrieves a lobby by replaying its stream.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if no lobby has that id, and
/// other `DomainError`s if the stores fail.
pub async fn get_lobby(lobby_id: &str, ports: &LobbyPorts) -> Result<LobbyView, DomainError> {
    let lobby = load_lobby(lobby_id, ports)
        .await?
        .ok_or_else(|| DomainError::AggregateNotFound {
            aggregate_type: Lobby::AGGREGATE_TYPE.to_owned(),
            aggregate_id: lobby_id.to_owned(),
        })?;
    Ok(LobbyView::from(&lobby))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arcade_event_bus::EventBus;
    use arcade_event_store::{InMemoryEventStore, InMemorySnapshotStore, SnapshotPolicy};
    use arcade_test_support::{FailingEventStore, FixedClock};
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    use super::*;
    use crate::application::command_handlers::{handle_create_lobby, handle_join_lobby};
    use crate::domain::commands::{CreateLobby, JoinLobby};
    use crate::domain::lifecycle::lobby_lifecycle;

    fn ports() -> LobbyPorts {
        LobbyPorts {
            store: Arc::new(InMemoryEventStore::new()),
            snapshots: Arc::new(InMemorySnapshotStore::new()),
            bus: EventBus::new(),
            clock: Arc::new(FixedClock(
                Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
            )),
            lifecycle: lobby_lifecycle().unwrap(),
            snapshot_policy: SnapshotPolicy::Never,
            default_max_players: 4,
        }
    }

    #[tokio::test]
    async fn test_get_lobby_reflects_the_stream() {
        // Arrange
        let ports = ports();
        handle_create_lobby(
            &CreateLobby {
                correlation_id: Uuid::new_v4(),
                lobby_id: Some("lobby-1".to_owned()),
                name: "Friday night".to_owned(),
                host_id: "ana".to_owned(),
                max_players: Some(3),
            },
            &ports,
        )
        .await
        .unwrap();
        handle_join_lobby(
            &JoinLobby {
                correlation_id: Uuid::new_v4(),
                lobby_id: "lobby-1".to_owned(),
                player_id: "bo".to_owned(),
            },
            &ports,
        )
        .await
        .unwrap();

        // Act
        let view = get_lobby("lobby-1", &ports).await.unwrap();

        // Assert
        assert_eq!(
            view,
            LobbyView {
                lobby_id: "lobby-1".to_owned(),
                name: "Friday night".to_owned(),
                host_id: "ana".to_owned(),
                status: LobbyStatus::Ready,
                players: vec!["ana".to_owned(), "bo".to_owned()],
                max_players: 3,
                game_id: None,
                version: 2,
            }
        );
    }

    #[tokio::test]
    async fn test_get_lobby_returns_not_found_for_unknown_id() {
        let ports = ports();

        let err = get_lobby("ghost", &ports).await.unwrap_err();

        assert!(matches!(err, DomainError::AggregateNotFound { .. }));
    }

    #[tokio::test]
    async fn test_get_lobby_propagates_store_failure() {
        let ports = LobbyPorts {
            store: Arc::new(FailingEventStore),
            ..ports()
        };

        let err = get_lobby("lobby-1", &ports).await.unwrap_err();

        assert!(matches!(err, DomainError::Infrastructure(_)));
    }

    #[test]
    fn test_view_serializes_status_in_snake_case() {
        let view = LobbyView {
            lobby_id: "lobby-1".to_owned(),
            name: "Friday night".to_owned(),
            host_id: "ana".to_owned(),
            status: LobbyStatus::InGame,
            players: vec!["ana".to_owned()],
            max_players: 2,
            game_id: None,
            version: 3,
        };

        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["status"], "in_game");
        assert_eq!(json["version"], 3);
    }
}
