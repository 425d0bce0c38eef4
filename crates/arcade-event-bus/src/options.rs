use std::fmt;
use std::sync::Arc;

use arcade_core::event::DomainEvent;

/// Priority given to subscriptions that do not set one.
pub const DEFAULT_PRIORITY: u32 = 100;

/// Predicate deciding whether a subscription receives an event.
pub type EventFilter = Arc<dyn Fn(&DomainEvent) -> bool + Send + Sync>;

/// Per-subscription delivery settings.
///
/// Lower priorities are delivered first; equal priorities keep registration
/// order.
#[derive(Clone)]
pub struct SubscribeOptions {
    /// Only events for which this returns `true` are delivered.
    pub filter: Option<EventFilter>,
    /// Delivery rank, ascending.
    pub priority: u32,
}

impl SubscribeOptions {
    /// No filter, [`DEFAULT_PRIORITY`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the priority.
    #[must_use]
    pub fn priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the filter.
    #[must_use]
    pub fn filter(mut self, filter: impl Fn(&DomainEvent) -> bool + Send + Sync + 'static) -> Self {
        self.filter = Some(Arc::new(filter));
        self
    }
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self {
            filter: None,
            priority: DEFAULT_PRIORITY,
        }
    }
}

impl fmt::Debug for SubscribeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscribeOptions")
            .field("filter", &self.filter.is_some())
            .field("priority", &self.priority)
            .finish()
    }
}
