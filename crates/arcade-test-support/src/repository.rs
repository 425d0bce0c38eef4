//! Test repositories — store implementations that always fail, for
//! exercising error-handling paths.

use arcade_core::error::DomainError;
use arcade_core::event::{DomainEvent, StoredEvent};
use arcade_core::repository::{AppendResult, EventCallback, EventStore, EventStream, ReadOptions};
use arcade_core::snapshot::{Snapshot, SnapshotStore};
use arcade_core::subscription::Subscription;
use async_trait::async_trait;

fn unavailable() -> DomainError {
    DomainError::Infrastructure("connection refused".into())
}

/// An event store that always returns an infrastructure error.
#[derive(Debug, Default)]
pub struct FailingEventStore;

#[async_trait]
impl EventStore for FailingEventStore {
    async fn append(
        &self,
        _aggregate_id: &str,
        _aggregate_type: &str,
        _events: Vec<DomainEvent>,
        _expected_version: Option<u64>,
    ) -> Result<AppendResult, DomainError> {
        Err(unavailable())
    }

    async fn read_stream(
        &self,
        _aggregate_id: &str,
        _aggregate_type: &str,
        _options: ReadOptions,
    ) -> Result<EventStream, DomainError> {
        Err(unavailable())
    }

    async fn read_by_type(
        &self,
        _event_type: &str,
        _options: ReadOptions,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Err(unavailable())
    }

    async fn read_all(
        &self,
        _from_position: Option<u64>,
        _limit: Option<usize>,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Err(unavailable())
    }

    async fn stream_exists(
        &self,
        _aggregate_id: &str,
        _aggregate_type: &str,
    ) -> Result<bool, DomainError> {
        Err(unavailable())
    }

    async fn stream_version(
        &self,
        _aggregate_id: &str,
        _aggregate_type: &str,
    ) -> Result<u64, DomainError> {
        Err(unavailable())
    }

    async fn global_position(&self) -> Result<u64, DomainError> {
        Err(unavailable())
    }

    async fn subscribe(
        &self,
        _callback: EventCallback,
        _from_position: Option<u64>,
    ) -> Result<Subscription, DomainError> {
        Err(unavailable())
    }
}

/// A snapshot store that always returns an infrastructure error.
#[derive(Debug, Default)]
pub struct FailingSnapshotStore;

#[async_trait]
impl SnapshotStore for FailingSnapshotStore {
    async fn save(&self, _snapshot: Snapshot) -> Result<(), DomainError> {
        Err(unavailable())
    }

    async fn load(
        &self,
        _aggregate_id: &str,
        _aggregate_type: &str,
    ) -> Result<Option<Snapshot>, DomainError> {
        Err(unavailable())
    }

    async fn delete_older_than(
        &self,
        _aggregate_id: &str,
        _aggregate_type: &str,
        _version: u64,
    ) -> Result<usize, DomainError> {
        Err(unavailable())
    }
}
