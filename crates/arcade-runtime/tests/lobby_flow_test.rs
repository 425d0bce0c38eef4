//! End-to-end lobby flows through a fully wired runtime.

use std::sync::Arc;

use arcade_core::event::StoredEvent;
use arcade_core::repository::EventStore;
use arcade_core::snapshot::SnapshotStore;
use arcade_event_bus::SubscribeOptions;
use arcade_lobby::application::command_handlers::{
    handle_close_lobby, handle_create_lobby, handle_join_lobby, handle_leave_lobby,
    handle_start_game,
};
use arcade_lobby::application::projections::LobbyDirectory;
use arcade_lobby::application::query_handlers::get_lobby;
use arcade_lobby::domain::commands::{CloseLobby, CreateLobby, JoinLobby, LeaveLobby, StartGame};
use arcade_lobby::domain::lifecycle::LobbyStatus;
use arcade_runtime::{Runtime, RuntimeConfig};
use arcade_test_support::{StepClock, recording_callback};
use chrono::{TimeZone, Utc};
use uuid::Uuid;

fn runtime(snapshot_every: u64) -> Runtime {
    let clock = StepClock::starting_at(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap());
    Runtime::with_clock(
        RuntimeConfig {
            snapshot_every,
            ..RuntimeConfig::default()
        },
        Arc::new(clock),
    )
    .unwrap()
}

fn create(lobby_id: &str, host_id: &str, max_players: u32) -> CreateLobby {
    CreateLobby {
        correlation_id: Uuid::new_v4(),
        lobby_id: Some(lobby_id.to_owned()),
        name: format!("{lobby_id} room"),
        host_id: host_id.to_owned(),
        max_players: Some(max_players),
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
async fn test_full_lobby_starts_and_leaves_the_directory() {
    // Arrange
    let runtime = runtime(50);
    let ports = runtime.ports();
    let (callback, observed) = recording_callback::<StoredEvent>();
    let _sub = runtime.store().subscribe(callback, None).await.unwrap();

    // Act
    handle_create_lobby(&create("lobby-1", "ana", 3), ports)
        .await
        .unwrap();
    handle_join_lobby(&join("lobby-1", "bo"), ports).await.unwrap();
    let full = handle_join_lobby(&join("lobby-1", "cy"), ports)
        .await
        .unwrap();
    let listed_while_full = runtime.directory().get("lobby-1");
    let started = handle_start_game(
        &StartGame {
            correlation_id: Uuid::new_v4(),
            lobby_id: "lobby-1".to_owned(),
            requested_by: "ana".to_owned(),
        },
        ports,
    )
    .await
    .unwrap();

    // Assert
    assert_eq!(full.status, LobbyStatus::Full);
    assert_eq!(listed_while_full.unwrap().open_seats(), 0);
    assert_eq!(started.status, LobbyStatus::InGame);
    assert!(runtime.directory().get("lobby-1").is_none());

    let view = get_lobby("lobby-1", ports).await.unwrap();
    assert_eq!(view.status, LobbyStatus::InGame);
    assert!(view.game_id.is_some());
    assert_eq!(view.version, 4);

    let positions: Vec<u64> = observed.items().iter().map(|e| e.position).collect();
    assert_eq!(positions, vec![1, 2, 3, 4]);
    let stats = runtime.bus().stats();
    assert_eq!(stats.total_events_published, 4);
    assert_eq!(stats.failed_deliveries, 0);
}

#[tokio::test]
async fn test_bus_subscribers_see_only_their_event_type() {
    let runtime = runtime(50);
    let ports = runtime.ports();
    let (callback, joins) = recording_callback();
    let _sub = runtime
        .bus()
        .subscribe("lobby.player_joined", callback, SubscribeOptions::new());

    handle_create_lobby(&create("lobby-1", "ana", 4), ports)
        .await
        .unwrap();
    handle_join_lobby(&join("lobby-1", "bo"), ports).await.unwrap();
    handle_leave_lobby(
        &LeaveLobby {
            correlation_id: Uuid::new_v4(),
            lobby_id: "lobby-1".to_owned(),
            player_id: "bo".to_owned(),
        },
        ports,
    )
    .await
    .unwrap();

    let joins = joins.items();
    assert_eq!(joins.len(), 1);
    assert_eq!(joins[0].payload["PlayerJoined"]["player_id"], "bo");
}

#[tokio::test]
async fn test_snapshots_follow_configured_interval() {
    // Arrange
    let runtime = runtime(3);
    let ports = runtime.ports();
    handle_create_lobby(&create("lobby-1", "ana", 8), ports)
        .await
        .unwrap();

    // Act
    for player in ["bo", "cy", "di", "ed", "fy"] {
        handle_join_lobby(&join("lobby-1", player), ports)
            .await
            .unwrap();
    }

    // Assert
    let snapshot = runtime
        .snapshots()
        .load("lobby-1", "Lobby")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(snapshot.version, 6);
    assert_eq!(runtime.snapshots().count("lobby-1", "Lobby"), 1);
    let view = get_lobby("lobby-1", ports).await.unwrap();
    assert_eq!(view.players.len(), 6);
    assert_eq!(view.version, 6);
}

#[tokio::test]
async fn test_rebuilt_directory_matches_live_directory() {
    // Arrange
    let runtime = runtime(50);
    let ports = runtime.ports();
    for (lobby_id, host) in [("lobby-1", "ana"), ("lobby-2", "bo"), ("lobby-3", "cy")] {
        handle_create_lobby(&create(lobby_id, host, 4), ports)
            .await
            .unwrap();
    }
    handle_join_lobby(&join("lobby-2", "di"), ports).await.unwrap();
    handle_close_lobby(
        &CloseLobby {
            correlation_id: Uuid::new_v4(),
            lobby_id: "lobby-3".to_owned(),
            reason: "abandoned".to_owned(),
        },
        ports,
    )
    .await
    .unwrap();

    // Act
    let rebuilt = LobbyDirectory::new();
    let applied = rebuilt.catch_up(runtime.store()).await.unwrap();

    // Assert
    assert_eq!(applied, 5);
    assert_eq!(rebuilt.open_lobbies(), runtime.directory().open_lobbies());
    assert_eq!(rebuilt.len(), 2);
}

#[tokio::test]
async fn test_runtimes_are_isolated() {
    let first = runtime(50);
    let second = runtime(50);

    handle_create_lobby(&create("lobby-1", "ana", 4), first.ports())
        .await
        .unwrap();

    assert_eq!(first.store().global_position().await.unwrap(), 1);
    assert_eq!(second.store().global_position().await.unwrap(), 0);
    assert!(second.directory().is_empty());
    assert!(get_lobby("lobby-1", second.ports()).await.is_err());
}
