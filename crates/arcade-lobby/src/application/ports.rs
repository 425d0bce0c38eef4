//! Infrastructure the lobby handlers run against.

use std::sync::Arc;

use arcade_core::clock::Clock;
use arcade_core::repository::EventStore;
use arcade_core::snapshot::SnapshotStore;
use arcade_event_bus::EventBus;
use arcade_event_store::SnapshotPolicy;

use crate::domain::lifecycle::LobbyLifecycle;

/// Everything a lobby command or query handler needs, built once by the
/// composition root and shared.
#[derive(Clone)]
pub struct LobbyPorts {
    /// Source of truth for lobby streams.
    pub store: Arc<dyn EventStore>,
    /// Lobby snapshots.
    pub snapshots: Arc<dyn SnapshotStore>,
    /// Appended events are published here after every successful command.
    pub bus: EventBus,
    /// Stamps new events and snapshots.
    pub clock: Arc<dyn Clock>,
    /// Shared lifecycle definition.
    pub lifecycle: Arc<LobbyLifecycle>,
    /// When to snapshot after an append.
    pub snapshot_policy: SnapshotPolicy,
    /// Seat count for `CreateLobby` commands that omit one.
    pub default_max_players: u32,
}

impl std::fmt::Debug for LobbyPorts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LobbyPorts")
            .field("bus", &self.bus)
            .field("snapshot_policy", &self.snapshot_policy)
            .field("default_max_players", &self.default_max_players)
            .finish_non_exhaustive()
    }
}
