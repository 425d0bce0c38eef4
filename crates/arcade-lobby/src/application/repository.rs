//! Loading and saving `Lobby` aggregates.
//!
//! A lobby is rebuilt from its latest snapshot plus the events appended after
//! it, and saved by appending its uncommitted events with the loaded version
//! as `expected_version`.

use std::sync::Arc;

use arcade_core::aggregate::AggregateRoot;
use arcade_core::error::DomainError;
use arcade_core::event::StoredEvent;
use arcade_core::repository::ReadOptions;
use arcade_core::snapshot::Snapshot;

use super::ports::LobbyPorts;
use crate::domain::aggregates::{Lobby, LobbyState};

fn replay(lobby: &mut Lobby, events: &[StoredEvent]) -> Result<(), DomainError> {
    for stored in events {
        lobby.apply(&stored.decode()?)?;
    }
    Ok(())
}

/// Loads a lobby, or `None` if its stream is empty.
///
/// # Errors
///
/// Returns `DomainError` if the stores fail or the history cannot be decoded
/// or applied.
pub async fn load_lobby(lobby_id: &str, ports: &LobbyPorts) -> Result<Option<Lobby>, DomainError> {
    let aggregate_type = Lobby::AGGREGATE_TYPE;
    if let Some(snapshot) = ports.snapshots.load(lobby_id, aggregate_type).await? {
        let stream = ports
            .store
            .read_stream(
                lobby_id,
                aggregate_type,
                ReadOptions::new().from_version(snapshot.version + 1),
            )
            .await?;
        if snapshot.version <= stream.version {
            let state: LobbyState = snapshot.restore()?;
            let mut lobby = Lobby::from_state(
                lobby_id,
                snapshot.version,
                state,
                Arc::clone(&ports.lifecycle),
            )?;
            replay(&mut lobby, &stream.events)?;
            return Ok(lobby.exists().then_some(lobby));
        }
        tracing::warn!(
            lobby_id,
            snapshot_version = snapshot.version,
            stream_version = stream.version,
            "snapshot is ahead of its stream; replaying from the start"
        );
    }

    let stream = ports
        .store
        .read_stream(lobby_id, aggregate_type, ReadOptions::new())
        .await?;
    let mut lobby = Lobby::new(lobby_id, Arc::clone(&ports.lifecycle));
    replay(&mut lobby, &stream.events)?;
    Ok(lobby.exists().then_some(lobby))
}

/// Appends the lobby's uncommitted events and snapshots it when the policy
/// says so. Returns the stored events.
///
/// A failed snapshot is logged; the events are already persisted.
///
/// # Errors
///
/// Returns `DomainError::ConcurrencyConflict` if the stream moved since the
/// lobby was loaded, and other `DomainError`s if the store fails.
pub async fn save_lobby(lobby: &mut Lobby, ports: &LobbyPorts) -> Result<Vec<StoredEvent>, DomainError> {
    let events = lobby.uncommitted_events().to_vec();
    if events.is_empty() {
        return Ok(Vec::new());
    }
    let aggregate_type = Lobby::AGGREGATE_TYPE;
    let expected = lobby.persisted_version();

    let appended = ports
        .store
        .append(lobby.aggregate_id(), aggregate_type, events, Some(expected))
        .await?;
    lobby.clear_uncommitted_events();

    let stored = ports
        .store
        .read_stream(
            lobby.aggregate_id(),
            aggregate_type,
            ReadOptions::new()
                .from_version(expected + 1)
                .to_version(appended.version),
        )
        .await?
        .events;

    if ports.snapshot_policy.should_snapshot(expected, appended.version) {
        if let Err(err) = snapshot(lobby, appended.version, ports).await {
            tracing::warn!(
                lobby_id = lobby.aggregate_id(),
                version = appended.version,
                error = %err,
                "lobby snapshot failed"
            );
        }
    }

    Ok(stored)
}

async fn snapshot(lobby: &Lobby, version: u64, ports: &LobbyPorts) -> Result<(), DomainError> {
    let snapshot = Snapshot::capture(
        lobby.aggregate_id(),
        Lobby::AGGREGATE_TYPE,
        version,
        &lobby.state(),
        ports.clock.as_ref(),
    )?;
    ports.snapshots.save(snapshot).await?;
    let pruned = ports
        .snapshots
        .delete_older_than(lobby.aggregate_id(), Lobby::AGGREGATE_TYPE, version)
        .await?;
    tracing::debug!(
        lobby_id = lobby.aggregate_id(),
        version,
        pruned,
        "lobby snapshot taken"
    );
    Ok(())
}
