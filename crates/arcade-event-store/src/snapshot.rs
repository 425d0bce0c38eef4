//! In-memory `SnapshotStore`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use arcade_core::error::DomainError;
use arcade_core::snapshot::{Snapshot, SnapshotStore};

/// Snapshot store backed by process memory.
///
/// Every saved snapshot is kept, in save order, until pruned with
/// `delete_older_than`. `load` returns the last one saved for the key.
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    snapshots: Mutex<HashMap<(String, String), Vec<Snapshot>>>,
}

impl InMemorySnapshotStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of snapshots held for the key.
    #[must_use]
    pub fn count(&self, aggregate_id: &str, aggregate_type: &str) -> usize {
        self.lock()
            .get(&key(aggregate_id, aggregate_type))
            .map_or(0, Vec::len)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<(String, String), Vec<Snapshot>>> {
        self.snapshots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn key(aggregate_id: &str, aggregate_type: &str) -> (String, String) {
    (aggregate_type.to_owned(), aggregate_id.to_owned())
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn save(&self, snapshot: Snapshot) -> Result<(), DomainError> {
        tracing::debug!(
            aggregate_type = %snapshot.aggregate_type,
            aggregate_id = %snapshot.aggregate_id,
            version = snapshot.version,
            "saved snapshot"
        );
        self.lock()
            .entry(key(&snapshot.aggregate_id, &snapshot.aggregate_type))
            .or_default()
            .push(snapshot);
        Ok(())
    }

    async fn load(
        &self,
        aggregate_id: &str,
        aggregate_type: &str,
    ) -> Result<Option<Snapshot>, DomainError> {
        Ok(self
            .lock()
            .get(&key(aggregate_id, aggregate_type))
            .and_then(|snapshots| snapshots.last().cloned()))
    }

    async fn delete_older_than(
        &self,
        aggregate_id: &str,
        aggregate_type: &str,
        version: u64,
    ) -> Result<usize, DomainError> {
        let mut snapshots = self.lock();
        let Some(kept) = snapshots.get_mut(&key(aggregate_id, aggregate_type)) else {
            return Ok(0);
        };
        let before = kept.len();
        kept.retain(|s| s.version >= version);
        Ok(before - kept.len())
    }
}
