//! The composition root: one store, one snapshot store, one bus and a clock.

use std::sync::Arc;

use arcade_core::clock::{Clock, SystemClock};
use arcade_event_bus::EventBus;
use arcade_event_store::{InMemoryEventStore, InMemorySnapshotStore, SnapshotPolicy};
use arcade_lobby::application::ports::LobbyPorts;
use arcade_lobby::application::projections::LobbyDirectory;
use arcade_lobby::domain::lifecycle::lobby_lifecycle;

use crate::config::RuntimeConfig;
use crate::error::RuntimeError;

/// Owns the infrastructure for one isolated engine instance.
#[derive(Debug, Clone)]
pub struct Runtime {
    config: RuntimeConfig,
    store: InMemoryEventStore,
    snapshots: Arc<InMemorySnapshotStore>,
    directory: Arc<LobbyDirectory>,
    ports: LobbyPorts,
}

impl Runtime {
    /// Builds a runtime with the system clock.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeError::Lifecycle` if the lobby lifecycle fails
    /// validation.
    pub fn new(config: RuntimeConfig) -> Result<Self, RuntimeError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Builds a runtime stamping events and snapshots with `clock`.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeError::Lifecycle` if the lobby lifecycle fails
    /// validation.
    pub fn with_clock(config: RuntimeConfig, clock: Arc<dyn Clock>) -> Result<Self, RuntimeError> {
        let store = InMemoryEventStore::with_clock(Arc::clone(&clock));
        let snapshots = Arc::new(InMemorySnapshotStore::new());
        let bus = EventBus::new();
        let directory = Arc::new(LobbyDirectory::new());
        directory.register(&bus);

        let ports = LobbyPorts {
            store: Arc::new(store.clone()),
            snapshots: snapshots.clone(),
            bus,
            clock,
            lifecycle: lobby_lifecycle()?,
            snapshot_policy: SnapshotPolicy::every(config.snapshot_every),
            default_max_players: config.default_max_players,
        };

        tracing::info!(
            snapshot_every = config.snapshot_every,
            default_max_players = config.default_max_players,
            "arcade runtime ready"
        );

        Ok(Self {
            config,
            store,
            snapshots,
            directory,
            ports,
        })
    }

    /// The configuration the runtime was built with.
    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Ports for lobby command and query handlers.
    #[must_use]
    pub fn ports(&self) -> &LobbyPorts {
        &self.ports
    }

    /// The event store.
    #[must_use]
    pub fn store(&self) -> &InMemoryEventStore {
        &self.store
    }

    /// The snapshot store.
    #[must_use]
    pub fn snapshots(&self) -> &InMemorySnapshotStore {
        &self.snapshots
    }

    /// The event bus appended events are published on.
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.ports.bus
    }

    /// The open-lobby projection kept current by the bus.
    #[must_use]
    pub fn directory(&self) -> &LobbyDirectory {
        &self.directory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_runtime_registers_directory_for_lobby_events() {
        let runtime = Runtime::new(RuntimeConfig::default()).unwrap();

        assert!(runtime.bus().has_subscribers("lobby.created"));
        assert!(runtime.bus().has_subscribers("lobby.closed"));
        assert!(!runtime.bus().has_subscribers("scoreboard.updated"));
        assert!(runtime.directory().is_empty());
    }

    #[test]
    fn test_config_drives_ports() {
        let runtime = Runtime::new(RuntimeConfig {
            snapshot_every: 0,
            default_max_players: 6,
            ..RuntimeConfig::default()
        })
        .unwrap();

        assert_eq!(runtime.ports().snapshot_policy, SnapshotPolicy::Never);
        assert_eq!(runtime.ports().default_max_players, 6);
        assert_eq!(runtime.config().default_max_players, 6);
    }
}
