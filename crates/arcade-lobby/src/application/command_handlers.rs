//! Command handlers for the Lobby context.
//!
//! Each handler loads the lobby, executes the command on the aggregate,
//! appends the resulting events and publishes them to the bus.

use std::sync::Arc;

use arcade_core::aggregate::AggregateRoot;
use arcade_core::command::Command;
use arcade_core::error::DomainError;
use arcade_core::event::StoredEvent;
use uuid::Uuid;

use super::ports::LobbyPorts;
use super::repository::{load_lobby, save_lobby};
use crate::domain::aggregates::Lobby;
use crate::domain::commands::{CloseLobby, CreateLobby, JoinLobby, LeaveLobby, StartGame};
use crate::domain::lifecycle::LobbyStatus;

/// Result of a successfully handled command.
#[derive(Debug)]
pub struct LobbyCommandResult {
    /// The lobby affected or created by the command.
    pub lobby_id: String,
    /// Stream version after the command.
    pub version: u64,
    /// Lifecycle state after the command.
    pub status: LobbyStatus,
    /// The stored events produced and persisted.
    pub stored_events: Vec<StoredEvent>,
}

async fn load_existing(lobby_id: &str, ports: &LobbyPorts) -> Result<Lobby, DomainError> {
    load_lobby(lobby_id, ports)
        .await?
        .ok_or_else(|| DomainError::AggregateNotFound {
            aggregate_type: Lobby::AGGREGATE_TYPE.to_owned(),
            aggregate_id: lobby_id.to_owned(),
        })
}

async fn commit(
    command: &impl Command,
    mut lobby: Lobby,
    ports: &LobbyPorts,
) -> Result<LobbyCommandResult, DomainError> {
    let stored_events = save_lobby(&mut lobby, ports).await.inspect_err(|err| {
        if err.is_concurrency_conflict() {
            tracing::info!(
                command = command.command_type(),
                lobby_id = lobby.aggregate_id(),
                "lobby changed concurrently; caller should retry"
            );
        }
    })?;

    for stored in &stored_events {
        ports.bus.publish(&stored.event).await;
    }

    tracing::debug!(
        command = command.command_type(),
        correlation_id = %command.correlation_id(),
        lobby_id = lobby.aggregate_id(),
        version = lobby.version(),
        status = %lobby.status(),
        "lobby command handled"
    );

    Ok(LobbyCommandResult {
        lobby_id: lobby.aggregate_id().to_owned(),
        version: lobby.version(),
        status: lobby.status(),
        stored_events,
    })
}

/// Handles the `CreateLobby` command: opens a new lobby with the host seated.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the lobby exists or the settings are
/// invalid, and other `DomainError`s if persistence fails.
pub async fn handle_create_lobby(
    command: &CreateLobby,
    ports: &LobbyPorts,
) -> Result<LobbyCommandResult, DomainError> {
    let lobby_id = command
        .lobby_id
        .clone()
        .unwrap_or_else(|| Uuid::now_v7().to_string());
    if ports
        .store
        .stream_exists(&lobby_id, Lobby::AGGREGATE_TYPE)
        .await?
    {
        return Err(DomainError::Validation(format!(
            "lobby {lobby_id} already exists"
        )));
    }

    let mut lobby = Lobby::new(lobby_id, Arc::clone(&ports.lifecycle));
    lobby.create(
        &command.name,
        &command.host_id,
        command.max_players.unwrap_or(ports.default_max_players),
        command.event_metadata(),
        ports.clock.as_ref(),
    )?;
    commit(command, lobby, ports).await
}

/// Handles the `JoinLobby` command.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` for unknown lobbies,
/// `DomainError::Validation` if the player cannot join, and
/// `DomainError::ConcurrencyConflict` if the lobby changed meanwhile.
pub async fn handle_join_lobby(
    command: &JoinLobby,
    ports: &LobbyPorts,
) -> Result<LobbyCommandResult, DomainError> {
    let mut lobby = load_existing(&command.lobby_id, ports).await?;
    lobby.join(
        &command.player_id,
        command.event_metadata(),
        ports.clock.as_ref(),
    )?;
    commit(command, lobby, ports).await
}

/// Handles the `LeaveLobby` command.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` for unknown lobbies,
/// `DomainError::Validation` if the player is not seated, and
/// `DomainError::ConcurrencyConflict` if the lobby changed meanwhile.
pub async fn handle_leave_lobby(
    command: &LeaveLobby,
    ports: &LobbyPorts,
) -> Result<LobbyCommandResult, DomainError> {
    let mut lobby = load_existing(&command.lobby_id, ports).await?;
    lobby.leave(
        &command.player_id,
        command.event_metadata(),
        ports.clock.as_ref(),
    )?;
    commit(command, lobby, ports).await
}

/// Handles the `StartGame` command: assigns a new game id.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` for unknown lobbies,
/// `DomainError::Validation` if the requester is not the host or the lobby is
/// not ready, and `DomainError::ConcurrencyConflict` if it changed meanwhile.
pub async fn handle_start_game(
    command: &StartGame,
    ports: &LobbyPorts,
) -> Result<LobbyCommandResult, DomainError> {
    let mut lobby = load_existing(&command.lobby_id, ports).await?;
    lobby.start_game(
        &command.requested_by,
        Uuid::now_v7(),
        command.event_metadata(),
        ports.clock.as_ref(),
    )?;
    commit(command, lobby, ports).await
}

/// Handles the `CloseLobby` command.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` for unknown lobbies,
/// `DomainError::Validation` if the lobby is already settled, and
/// `DomainError::ConcurrencyConflict` if it changed meanwhile.
pub async fn handle_close_lobby(
    command: &CloseLobby,
    ports: &LobbyPorts,
) -> Result<LobbyCommandResult, DomainError> {
    let mut lobby = load_existing(&command.lobby_id, ports).await?;
    lobby.close(
        &command.reason,
        command.event_metadata(),
        ports.clock.as_ref(),
    )?;
    commit(command, lobby, ports).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use arcade_core::error::DomainError;
    use arcade_core::event::{DomainEvent, StoredEvent};
    use arcade_core::repository::{
        AppendResult, EventCallback, EventStore, EventStream, ReadOptions,
    };
    use arcade_core::snapshot::{Snapshot, SnapshotStore};
    use arcade_core::subscription::Subscription;
    use arcade_event_bus::{EventBus, SubscribeOptions};
    use arcade_event_store::{InMemoryEventStore, InMemorySnapshotStore, SnapshotPolicy};
    use arcade_test_support::{
        FailingEventStore, FailingSnapshotStore, FixedClock, recording_callback, test_event,
    };
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    use super::*;
    use crate::domain::aggregates::LobbyState;
    use crate::domain::events::{LOBBY_EVENT_TYPES, LobbyEvent};
    use crate::domain::lifecycle::lobby_lifecycle;

    fn ports_with(
        store: Arc<dyn EventStore>,
        snapshots: Arc<dyn SnapshotStore>,
        policy: SnapshotPolicy,
    ) -> LobbyPorts {
        LobbyPorts {
            store,
            snapshots,
            bus: EventBus::new(),
            clock: Arc::new(FixedClock(
                Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
            )),
            lifecycle: lobby_lifecycle().unwrap(),
            snapshot_policy: policy,
            default_max_players: 4,
        }
    }

    fn ports() -> LobbyPorts {
        ports_with(
            Arc::new(InMemoryEventStore::new()),
            Arc::new(InMemorySnapshotStore::new()),
            SnapshotPolicy::Never,
        )
    }

    fn create(lobby_id: &str) -> CreateLobby {
        CreateLobby {
            correlation_id: Uuid::new_v4(),
            lobby_id: Some(lobby_id.to_owned()),
            name: "Friday night".to_owned(),
            host_id: "ana".to_owned(),
            max_players: None,
        }
    }

    fn join(lobby_id: &str, player_id: &str) -> JoinLobby {
        JoinLobby {
            correlation_id: Uuid::new_v4(),
            lobby_id: lobby_id.to_owned(),
            player_id: player_id.to_owned(),
        }
    }

    #[tokio::test]
    async fn test_handle_create_lobby_persists_created_event_and_publishes_it() {
        // Arrange
        let ports = ports();
        let (callback, published) = recording_callback::<DomainEvent>();
        let _sub = ports
            .bus
            .subscribe("lobby.created", callback, SubscribeOptions::new());
        let command = create("lobby-1");

        // Act
        let result = handle_create_lobby(&command, &ports).await.unwrap();

        // Assert
        assert_eq!(result.lobby_id, "lobby-1");
        assert_eq!(result.version, 1);
        assert_eq!(result.status, LobbyStatus::Waiting);
        assert_eq!(result.stored_events.len(), 1);

        let stored = &result.stored_events[0];
        assert_eq!(stored.event_type(), "lobby.created");
        assert_eq!(stored.aggregate_type, "Lobby");
        assert_eq!(stored.aggregate_version, 1);
        assert_eq!(stored.event.metadata.correlation_id, Some(command.correlation_id));
        assert_eq!(stored.event.metadata.actor_id.as_deref(), Some("ana"));
        match stored.decode::<LobbyEvent>().unwrap() {
            LobbyEvent::Created(payload) => assert_eq!(payload.max_players, 4),
            other => panic!("expected Created, got {other:?}"),
        }

        assert_eq!(published.len(), 1);
        assert_eq!(published.items()[0].event_id, stored.event.event_id);
    }

    #[tokio::test]
    async fn test_handle_create_lobby_generates_id_when_absent() {
        let ports = ports();
        let command = CreateLobby {
            lobby_id: None,
            ..create("unused")
        };

        let result = handle_create_lobby(&command, &ports).await.unwrap();

        assert!(Uuid::parse_str(&result.lobby_id).is_ok());
    }

    #[tokio::test]
    async fn test_handle_create_lobby_rejects_existing_lobby() {
        let ports = ports();
        handle_create_lobby(&create("lobby-1"), &ports).await.unwrap();

        let err = handle_create_lobby(&create("lobby-1"), &ports)
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn test_join_and_start_flow_reaches_in_game() {
        // Arrange
        let ports = ports();
        handle_create_lobby(&create("lobby-1"), &ports).await.unwrap();

        // Act
        let joined = handle_join_lobby(&join("lobby-1", "bo"), &ports)
            .await
            .unwrap();
        let started = handle_start_game(
            &StartGame {
                correlation_id: Uuid::new_v4(),
                lobby_id: "lobby-1".to_owned(),
                requested_by: "ana".to_owned(),
            },
            &ports,
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(joined.status, LobbyStatus::Ready);
        assert_eq!(joined.version, 2);
        assert_eq!(started.status, LobbyStatus::InGame);
        assert_eq!(started.stored_events[0].event_type(), "lobby.game_started");
        assert_eq!(
            ports.store.stream_version("lobby-1", "Lobby").await.unwrap(),
            3
        );
    }

    #[tokio::test]
    async fn test_leave_and_close_flow() {
        let ports = ports();
        handle_create_lobby(&create("lobby-1"), &ports).await.unwrap();
        handle_join_lobby(&join("lobby-1", "bo"), &ports).await.unwrap();

        let left = handle_leave_lobby(
            &LeaveLobby {
                correlation_id: Uuid::new_v4(),
                lobby_id: "lobby-1".to_owned(),
                player_id: "bo".to_owned(),
            },
            &ports,
        )
        .await
        .unwrap();
        let closed = handle_close_lobby(
            &CloseLobby {
                correlation_id: Uuid::new_v4(),
                lobby_id: "lobby-1".to_owned(),
                reason: "host went home".to_owned(),
            },
            &ports,
        )
        .await
        .unwrap();

        assert_eq!(left.status, LobbyStatus::Waiting);
        assert_eq!(closed.status, LobbyStatus::Closed);
        assert_eq!(closed.version, 4);
    }

    #[tokio::test]
    async fn test_join_unknown_lobby_returns_not_found() {
        let ports = ports();

        let err = handle_join_lobby(&join("ghost", "bo"), &ports)
            .await
            .unwrap_err();

        match err {
            DomainError::AggregateNotFound {
                aggregate_type,
                aggregate_id,
            } => {
                assert_eq!(aggregate_type, "Lobby");
                assert_eq!(aggregate_id, "ghost");
            }
            other => panic!("expected AggregateNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rejected_command_persists_and_publishes_nothing() {
        // Arrange
        let ports = ports();
        handle_create_lobby(&create("lobby-1"), &ports).await.unwrap();
        let (callback, published) = recording_callback::<DomainEvent>();
        let _sub = ports.bus.subscribe_many(
            &LOBBY_EVENT_TYPES,
            callback,
            SubscribeOptions::new(),
        );

        // Act
        let err = handle_join_lobby(&join("lobby-1", "ana"), &ports)
            .await
            .unwrap_err();

        // Assert
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(published.is_empty());
        assert_eq!(
            ports.store.stream_version("lobby-1", "Lobby").await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_store_failure_propagates_as_infrastructure_error() {
        let ports = ports_with(
            Arc::new(FailingEventStore),
            Arc::new(InMemorySnapshotStore::new()),
            SnapshotPolicy::Never,
        );

        let err = handle_create_lobby(&create("lobby-1"), &ports)
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Infrastructure(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_snapshot_policy_snapshots_and_reload_uses_it() {
        // Arrange
        let snapshots = Arc::new(InMemorySnapshotStore::new());
        let ports = ports_with(
            Arc::new(InMemoryEventStore::new()),
            snapshots.clone(),
            SnapshotPolicy::every(2),
        );
        handle_create_lobby(&create("lobby-1"), &ports).await.unwrap();
        handle_join_lobby(&join("lobby-1", "bo"), &ports).await.unwrap();

        // Act
        let after_three = handle_join_lobby(&join("lobby-1", "cy"), &ports)
            .await
            .unwrap();
        let after_four = handle_join_lobby(&join("lobby-1", "di"), &ports)
            .await
            .unwrap();

        // Assert
        assert_eq!(after_three.status, LobbyStatus::Ready);
        assert_eq!(after_four.status, LobbyStatus::Full);
        let latest = snapshots.load("lobby-1", "Lobby").await.unwrap().unwrap();
        assert_eq!(latest.version, 4);
        assert_eq!(snapshots.count("lobby-1", "Lobby"), 1);
        let reloaded = load_lobby("lobby-1", &ports).await.unwrap().unwrap();
        assert_eq!(reloaded.version(), 4);
        assert_eq!(reloaded.status(), LobbyStatus::Full);
    }

    #[tokio::test]
    async fn test_snapshot_ahead_of_stream_is_ignored_and_history_replayed() {
        // Arrange
        let snapshots = Arc::new(InMemorySnapshotStore::new());
        let ports = ports_with(
            Arc::new(InMemoryEventStore::new()),
            snapshots.clone(),
            SnapshotPolicy::Never,
        );
        handle_create_lobby(&create("lobby-1"), &ports).await.unwrap();
        handle_join_lobby(&join("lobby-1", "bo"), &ports).await.unwrap();
        let replayed = load_lobby("lobby-1", &ports).await.unwrap().unwrap();
        let stale = LobbyState {
            status: LobbyStatus::Closed,
            ..replayed.state()
        };
        snapshots
            .save(
                Snapshot::capture("lobby-1", "Lobby", 9, &stale, ports.clock.as_ref()).unwrap(),
            )
            .await
            .unwrap();

        // Act
        let loaded = load_lobby("lobby-1", &ports).await.unwrap().unwrap();

        // Assert
        assert_eq!(loaded.version(), 2);
        assert_eq!(loaded.status(), LobbyStatus::Ready);
        assert_eq!(loaded.state(), replayed.state());
        let joined = handle_join_lobby(&join("lobby-1", "cy"), &ports)
            .await
            .unwrap();
        assert_eq!(joined.version, 3);
    }

    #[tokio::test]
    async fn test_snapshot_failure_does_not_fail_the_command() {
        // Arrange
        let store = Arc::new(InMemoryEventStore::new());
        let ports = ports_with(
            store.clone(),
            Arc::new(FailingSnapshotStore),
            SnapshotPolicy::every(1),
        );

        // Act
        let result = handle_create_lobby(&create("lobby-1"), &ports).await.unwrap();

        // Assert
        assert_eq!(result.version, 1);
        assert_eq!(store.stream_version("lobby-1", "Lobby").await.unwrap(), 1);
    }

    /// Appends a foreign event to the stream right before the first append it
    /// forwards, emulating a writer that got there first.
    struct RacingStore {
        inner: InMemoryEventStore,
        raced: AtomicBool,
    }

    #[async_trait]
    impl EventStore for RacingStore {
        async fn append(
            &self,
            aggregate_id: &str,
            aggregate_type: &str,
            events: Vec<DomainEvent>,
            expected_version: Option<u64>,
        ) -> Result<AppendResult, DomainError> {
            if !self.raced.swap(true, Ordering::SeqCst) {
                self.inner
                    .append(
                        aggregate_id,
                        aggregate_type,
                        vec![test_event("lobby.player_joined")],
                        None,
                    )
                    .await?;
            }
            self.inner
                .append(aggregate_id, aggregate_type, events, expected_version)
                .await
        }

        async fn read_stream(
            &self,
            aggregate_id: &str,
            aggregate_type: &str,
            options: ReadOptions,
        ) -> Result<EventStream, DomainError> {
            self.inner
                .read_stream(aggregate_id, aggregate_type, options)
                .await
        }

        async fn read_by_type(
            &self,
            event_type: &str,
            options: ReadOptions,
        ) -> Result<Vec<StoredEvent>, DomainError> {
            self.inner.read_by_type(event_type, options).await
        }

        async fn read_all(
            &self,
            from_position: Option<u64>,
            limit: Option<usize>,
        ) -> Result<Vec<StoredEvent>, DomainError> {
            self.inner.read_all(from_position, limit).await
        }

        async fn stream_exists(
            &self,
            aggregate_id: &str,
            aggregate_type: &str,
        ) -> Result<bool, DomainError> {
            self.inner.stream_exists(aggregate_id, aggregate_type).await
        }

        async fn stream_version(
            &self,
            aggregate_id: &str,
            aggregate_type: &str,
        ) -> Result<u64, DomainError> {
            self.inner.stream_version(aggregate_id, aggregate_type).await
        }

        async fn global_position(&self) -> Result<u64, DomainError> {
            self.inner.global_position().await
        }

        async fn subscribe(
            &self,
            callback: EventCallback,
            from_position: Option<u64>,
        ) -> Result<Subscription, DomainError> {
            self.inner.subscribe(callback, from_position).await
        }
    }

    #[tokio::test]
    async fn test_concurrent_change_surfaces_as_conflict_and_publishes_nothing() {
        // Arrange
        let ports = ports_with(
            Arc::new(RacingStore {
                inner: InMemoryEventStore::new(),
                raced: AtomicBool::new(false),
            }),
            Arc::new(InMemorySnapshotStore::new()),
            SnapshotPolicy::Never,
        );
        let (callback, published) = recording_callback::<DomainEvent>();
        let _sub = ports
            .bus
            .subscribe("lobby.created", callback, SubscribeOptions::new());

        // Act
        let err = handle_create_lobby(&create("lobby-1"), &ports)
            .await
            .unwrap_err();

        // Assert
        assert!(err.is_concurrency_conflict());
        assert!(published.is_empty());
    }
}
