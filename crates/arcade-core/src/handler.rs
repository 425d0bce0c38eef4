//! Event handler abstraction.

use async_trait::async_trait;

use crate::callback::CallbackResult;
use crate::event::DomainEvent;

/// An object that reacts to published events (projections, real-time
/// bridges, process managers).
///
/// Handlers are registered per event type on the event bus and identified by
/// the `Arc` they were registered with.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// A name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Reacts to one event.
    ///
    /// # Errors
    ///
    /// Returns an error if the handler could not process the event. The bus
    /// logs and counts the failure and keeps delivering to other handlers.
    async fn handle(&self, event: &DomainEvent) -> CallbackResult;
}
