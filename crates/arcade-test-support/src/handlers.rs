//! Test handlers — `EventHandler` implementations that record or fail.

use std::sync::Mutex;

use arcade_core::callback::CallbackResult;
use arcade_core::event::DomainEvent;
use arcade_core::handler::EventHandler;
use async_trait::async_trait;

/// A handler that records every event it handles and always succeeds.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    handled: Mutex<Vec<DomainEvent>>,
}

impl RecordingHandler {
    /// Creates a handler with an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all handled events.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn handled(&self) -> Vec<DomainEvent> {
        self.handled.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventHandler for RecordingHandler {
    fn name(&self) -> &str {
        "recording"
    }

    async fn handle(&self, event: &DomainEvent) -> CallbackResult {
        self.handled.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// A handler that fails on every event.
#[derive(Debug, Default)]
pub struct FailingHandler;

#[async_trait]
impl EventHandler for FailingHandler {
    fn name(&self) -> &str {
        "failing"
    }

    async fn handle(&self, _event: &DomainEvent) -> CallbackResult {
        Err("handler unavailable".into())
    }
}
