//! Domain event abstractions.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::DomainError;

/// Tracing metadata attached to every domain event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Correlation ID for tracing a command through its effects.
    pub correlation_id: Option<Uuid>,
    /// Causation ID linking this event to the event/command that caused it.
    pub causation_id: Option<Uuid>,
    /// The user or system actor that triggered the change.
    pub actor_id: Option<String>,
}

impl EventMetadata {
    /// Metadata for an event caused directly by a command.
    #[must_use]
    pub fn for_command(correlation_id: Uuid) -> Self {
        Self {
            correlation_id: Some(correlation_id),
            causation_id: Some(correlation_id),
            actor_id: None,
        }
    }

    /// Sets the acting user.
    #[must_use]
    pub fn with_actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }
}

/// A closed, typed set of event kinds for one bounded context.
///
/// Each context defines an `enum` with one variant per event and a payload
/// struct per variant. The enum is serialized into the opaque JSON payload of
/// a [`DomainEvent`] and decoded back with [`DomainEvent::decode`].
pub trait EventPayload: Serialize + DeserializeOwned + Send + Sync + std::fmt::Debug {
    /// Returns the stable event type name (used for routing).
    fn event_type(&self) -> &'static str;
}

/// An immutable fact that occurred, as accepted by the store and the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Type name for routing and deserialization.
    pub event_type: String,
    /// Serialized event payload.
    pub payload: serde_json::Value,
    /// Correlation/causation metadata.
    pub metadata: EventMetadata,
    /// When the fact occurred.
    pub occurred_at: DateTime<Utc>,
}

impl DomainEvent {
    /// Creates an event from an already serialized payload.
    #[must_use]
    pub fn new(
        event_type: impl Into<String>,
        payload: serde_json::Value,
        metadata: EventMetadata,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type: event_type.into(),
            payload,
            metadata,
            occurred_at,
        }
    }

    /// Serializes a typed payload into a new event stamped with `clock`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Serialization` if the payload cannot be
    /// represented as JSON.
    pub fn from_payload<P: EventPayload>(
        payload: &P,
        metadata: EventMetadata,
        clock: &dyn Clock,
    ) -> Result<Self, DomainError> {
        Ok(Self::new(
            payload.event_type(),
            serde_json::to_value(payload)?,
            metadata,
            clock.now(),
        ))
    }

    /// Decodes the JSON payload into the context's typed event enum.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Serialization` if the payload does not match `P`.
    pub fn decode<P: EventPayload>(&self) -> Result<P, DomainError> {
        serde_json::from_value(self.payload.clone()).map_err(|e| {
            DomainError::Serialization(format!(
                "event {} ({}) deserialization failed: {e}",
                self.event_id, self.event_type
            ))
        })
    }
}

/// Stored representation of a domain event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    /// The recorded fact.
    pub event: DomainEvent,
    /// Aggregate this event belongs to.
    pub aggregate_id: String,
    /// Aggregate type (the second half of the stream key).
    pub aggregate_type: String,
    /// Version within the aggregate stream, starting at 1.
    pub aggregate_version: u64,
    /// Position in the global stream, starting at 1.
    pub position: u64,
    /// Timestamp of persistence.
    pub stored_at: DateTime<Utc>,
}

impl StoredEvent {
    /// Returns the event type name.
    #[must_use]
    pub fn event_type(&self) -> &str {
        &self.event.event_type
    }

    /// Returns when the fact occurred (as opposed to when it was stored).
    #[must_use]
    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.event.occurred_at
    }

    /// Decodes the payload into the context's typed event enum.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Serialization` if the payload does not match `P`.
    pub fn decode<P: EventPayload>(&self) -> Result<P, DomainError> {
        self.event.decode()
    }
}
