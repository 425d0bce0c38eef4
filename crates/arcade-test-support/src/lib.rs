//! Shared test doubles and utilities for the Arcade lobby engine.

mod callbacks;
mod clock;
mod events;
mod handlers;
mod repository;

pub use callbacks::{
    Recorder, failing_callback, labelled_callback, panicking_callback, recording_callback,
};
pub use clock::{FixedClock, StepClock};
pub use events::{test_event, test_event_with};
pub use handlers::{FailingHandler, RecordingHandler};
pub use repository::{FailingEventStore, FailingSnapshotStore};
