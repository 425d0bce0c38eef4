//! Aggregate root abstraction.

use crate::error::DomainError;
use crate::event::{DomainEvent, EventPayload};

/// Trait for aggregate roots that reconstitute from event history.
///
/// Command methods validate, apply and record events in one step, so
/// [`version`](Self::version) counts uncommitted events too. The version the
/// store has seen is [`persisted_version`](Self::persisted_version), which is
/// what a handler passes as `expected_version` when appending.
pub trait AggregateRoot: Send + Sync {
    /// The typed event enum this aggregate produces and consumes.
    type Event: EventPayload;

    /// Aggregate type name, the second half of every stream key.
    const AGGREGATE_TYPE: &'static str;

    /// Returns the aggregate identifier.
    fn aggregate_id(&self) -> &str;

    /// Returns the current version (number of events applied).
    fn version(&self) -> u64;

    /// Apply an event to mutate internal state.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if the event cannot be applied to the current
    /// state (a corrupted or out-of-order history).
    fn apply(&mut self, event: &Self::Event) -> Result<(), DomainError>;

    /// Returns uncommitted events produced by command handling.
    fn uncommitted_events(&self) -> &[DomainEvent];

    /// Clears uncommitted events after persistence.
    fn clear_uncommitted_events(&mut self);

    /// Returns the version of the stream as last loaded from the store.
    fn persisted_version(&self) -> u64 {
        self.version()
            .saturating_sub(self.uncommitted_events().len() as u64)
    }
}
