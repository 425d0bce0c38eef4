//! Event store abstraction.

use async_trait::async_trait;

use crate::callback::Callback;
use crate::error::DomainError;
use crate::event::{DomainEvent, StoredEvent};
use crate::subscription::Subscription;

/// Callback notified with every event appended to a store.
pub type EventCallback = Callback<StoredEvent>;

/// Outcome of a successful append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendResult {
    /// Stream version after the append.
    pub version: u64,
    /// Global position of the last appended event, or the current global
    /// head if nothing was appended.
    pub position: u64,
}

/// Filters for reading a stream or searching by type.
///
/// Applied in order: version range, then reverse, then limit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Lowest aggregate version to include.
    pub from_version: Option<u64>,
    /// Highest aggregate version to include.
    pub to_version: Option<u64>,
    /// Maximum number of events returned.
    pub limit: Option<usize>,
    /// Return newest first.
    pub reverse: bool,
}

impl ReadOptions {
    /// Reads everything, oldest first.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the inclusive lower version bound.
    #[must_use]
    pub fn from_version(mut self, version: u64) -> Self {
        self.from_version = Some(version);
        self
    }

    /// Sets the inclusive upper version bound.
    #[must_use]
    pub fn to_version(mut self, version: u64) -> Self {
        self.to_version = Some(version);
        self
    }

    /// Caps the number of returned events.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns newest first.
    #[must_use]
    pub fn reversed(mut self) -> Self {
        self.reverse = true;
        self
    }
}

/// A (possibly filtered) read of one aggregate stream.
#[derive(Debug, Clone, PartialEq)]
pub struct EventStream {
    /// Aggregate identifier.
    pub aggregate_id: String,
    /// Aggregate type.
    pub aggregate_type: String,
    /// Total number of events in the stream, independent of filters.
    pub version: u64,
    /// The selected events.
    pub events: Vec<StoredEvent>,
}

/// Repository trait for appending and reading domain events.
///
/// Implementations must copy events on every read; callers never observe
/// the store's internal storage.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends `events` to the stream with optimistic concurrency.
    ///
    /// `expected_version` is the stream length the caller last saw; `None`
    /// skips the check.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ConcurrencyConflict` if `expected_version` differs
    /// from the current stream length; nothing is appended in that case.
    async fn append(
        &self,
        aggregate_id: &str,
        aggregate_type: &str,
        events: Vec<DomainEvent>,
        expected_version: Option<u64>,
    ) -> Result<AppendResult, DomainError>;

    /// Reads one stream. Unknown streams yield an empty stream at version 0.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the backend is unavailable.
    async fn read_stream(
        &self,
        aggregate_id: &str,
        aggregate_type: &str,
        options: ReadOptions,
    ) -> Result<EventStream, DomainError>;

    /// Searches every stream for events of `event_type`, in global order.
    /// Version bounds in `options` are ignored.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the backend is unavailable.
    async fn read_by_type(
        &self,
        event_type: &str,
        options: ReadOptions,
    ) -> Result<Vec<StoredEvent>, DomainError>;

    /// Reads the global stream strictly after `from_position`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the backend is unavailable.
    async fn read_all(
        &self,
        from_position: Option<u64>,
        limit: Option<usize>,
    ) -> Result<Vec<StoredEvent>, DomainError>;

    /// Returns whether any event was appended for the stream.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the backend is unavailable.
    async fn stream_exists(
        &self,
        aggregate_id: &str,
        aggregate_type: &str,
    ) -> Result<bool, DomainError>;

    /// Returns the stream length, 0 for unknown streams.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the backend is unavailable.
    async fn stream_version(
        &self,
        aggregate_id: &str,
        aggregate_type: &str,
    ) -> Result<u64, DomainError>;

    /// Returns the position of the newest event in the global stream.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the backend is unavailable.
    async fn global_position(&self) -> Result<u64, DomainError>;

    /// Registers `callback` for every subsequently appended event.
    ///
    /// With `from_position`, every global event after that position is
    /// replayed to the callback first, before any live event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the backend is unavailable.
    /// Replay failures of the callback itself are logged, not returned.
    async fn subscribe(
        &self,
        callback: EventCallback,
        from_position: Option<u64>,
    ) -> Result<Subscription, DomainError>;
}
