//! Snapshot abstraction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::error::DomainError;

/// Point-in-time capture of an aggregate's state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Aggregate identifier.
    pub aggregate_id: String,
    /// Aggregate type.
    pub aggregate_type: String,
    /// Stream version the state reflects.
    pub version: u64,
    /// Serialized aggregate state.
    pub state: serde_json::Value,
    /// When the snapshot was taken.
    pub created_at: DateTime<Utc>,
}

impl Snapshot {
    /// Serializes `state` as the snapshot of a stream at `version`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Serialization` if the state cannot be
    /// represented as JSON.
    pub fn capture<T: Serialize>(
        aggregate_id: impl Into<String>,
        aggregate_type: impl Into<String>,
        version: u64,
        state: &T,
        clock: &dyn Clock,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            aggregate_id: aggregate_id.into(),
            aggregate_type: aggregate_type.into(),
            version,
            state: serde_json::to_value(state)?,
            created_at: clock.now(),
        })
    }

    /// Deserializes the captured state.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Serialization` if the state does not match `T`.
    pub fn restore<T: DeserializeOwned>(&self) -> Result<T, DomainError> {
        serde_json::from_value(self.state.clone()).map_err(|e| {
            DomainError::Serialization(format!(
                "snapshot {}/{}@{} deserialization failed: {e}",
                self.aggregate_type, self.aggregate_id, self.version
            ))
        })
    }
}

/// Repository trait for aggregate snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Stores a snapshot. Earlier snapshots for the same key are kept.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the backend is unavailable.
    async fn save(&self, snapshot: Snapshot) -> Result<(), DomainError>;

    /// Returns the most recently saved snapshot for the key, if any.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the backend is unavailable.
    async fn load(
        &self,
        aggregate_id: &str,
        aggregate_type: &str,
    ) -> Result<Option<Snapshot>, DomainError>;

    /// Removes snapshots whose version is below `version` and returns how many
    /// were removed.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the backend is unavailable.
    async fn delete_older_than(
        &self,
        aggregate_id: &str,
        aggregate_type: &str,
        version: u64,
    ) -> Result<usize, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    struct Frozen;

    impl Clock for Frozen {
        fn now(&self) -> DateTime<Utc> {
            Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
        }
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Tally {
        players: Vec<String>,
    }

    #[test]
    fn test_capture_then_restore_typed_state() {
        // Arrange
        let tally = Tally {
            players: vec!["ana".to_owned(), "bo".to_owned()],
        };

        // Act
        let snapshot = Snapshot::capture("lobby-1", "Lobby", 4, &tally, &Frozen).unwrap();

        // Assert
        assert_eq!(snapshot.version, 4);
        assert_eq!(snapshot.created_at, Frozen.now());
        assert_eq!(snapshot.restore::<Tally>().unwrap(), tally);
    }

    #[test]
    fn test_restore_reports_shape_mismatch() {
        let snapshot = Snapshot::capture("lobby-1", "Lobby", 1, &42_u32, &Frozen).unwrap();

        let err = snapshot.restore::<Tally>().unwrap_err();

        assert!(err.to_string().contains("Lobby/lobby-1@1"));
    }
}
