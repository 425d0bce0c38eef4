//! Event builders for tests.

use arcade_core::event::{DomainEvent, EventMetadata};
use chrono::{TimeZone, Utc};

/// An event of `event_type` with an empty object payload and a fixed
/// timestamp.
#[must_use]
pub fn test_event(event_type: &str) -> DomainEvent {
    test_event_with(event_type, serde_json::json!({}))
}

/// An event of `event_type` carrying `payload`.
///
/// # Panics
///
/// Never panics in practice; the fixed timestamp is a valid date.
#[must_use]
pub fn test_event_with(event_type: &str, payload: serde_json::Value) -> DomainEvent {
    DomainEvent::new(
        event_type,
        payload,
        EventMetadata::for_command(uuid::Uuid::new_v4()),
        Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
    )
}
