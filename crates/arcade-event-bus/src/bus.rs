//! The event bus.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use arcade_core::callback::{Callback, deliver, isolate};
use arcade_core::event::DomainEvent;
use arcade_core::handler::EventHandler;
use arcade_core::subscription::{Subscription, SubscriptionId, SubscriptionState};

use crate::options::{EventFilter, SubscribeOptions};
use crate::stats::BusStats;

/// Callback receiving published events.
pub type BusCallback = Callback<DomainEvent>;

/// Read-only view of one subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionInfo {
    /// Subscription identifier.
    pub id: SubscriptionId,
    /// Event types the subscription is registered for.
    pub event_types: Vec<String>,
    /// Delivery priority.
    pub priority: u32,
    /// Delivery attempts so far.
    pub event_count: u64,
}

struct Registration {
    id: SubscriptionId,
    state: Arc<SubscriptionState>,
    callback: BusCallback,
    filter: Option<EventFilter>,
    priority: u32,
    event_types: Vec<String>,
}

impl Registration {
    fn accepts(&self, event: &DomainEvent) -> bool {
        self.state.is_active() && self.filter.as_ref().is_none_or(|filter| filter(event))
    }
}

#[derive(Default)]
struct Registry {
    /// Per event type, sorted by `(priority, id)`.
    subscriptions: HashMap<String, Vec<Arc<Registration>>>,
    handlers: HashMap<String, Vec<Arc<dyn EventHandler>>>,
    next_id: u64,
}

impl Registry {
    fn remove(&mut self, id: SubscriptionId, event_types: &[String]) {
        for event_type in event_types {
            if let Some(list) = self.subscriptions.get_mut(event_type) {
                list.retain(|r| r.id != id);
                if list.is_empty() {
                    self.subscriptions.remove(event_type);
                }
            }
        }
    }

    fn active(&self, event_type: &str) -> usize {
        self.subscriptions
            .get(event_type)
            .map_or(0, |list| list.iter().filter(|r| r.state.is_active()).count())
    }
}

#[derive(Default)]
struct Inner {
    registry: Mutex<Registry>,
    published: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// In-process publish/subscribe dispatcher.
///
/// Cloning is cheap and yields a handle to the same bus.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Inner>,
}

impl EventBus {
    /// Creates a bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes `callback` to one event type.
    pub fn subscribe(
        &self,
        event_type: &str,
        callback: BusCallback,
        options: SubscribeOptions,
    ) -> Subscription {
        self.subscribe_many(&[event_type], callback, options)
    }

    /// Subscribes `callback` to several event types as one subscription.
    ///
    /// Dropping or unsubscribing the returned handle removes it from every
    /// type at once. Registering the same callback again creates an
    /// independent subscription.
    pub fn subscribe_many(
        &self,
        event_types: &[&str],
        callback: BusCallback,
        options: SubscribeOptions,
    ) -> Subscription {
        let event_types: Vec<String> = event_types
            .iter()
            .map(|t| (*t).to_owned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let state = Arc::new(SubscriptionState::new());

        let mut registry = self.inner.lock();
        registry.next_id += 1;
        let id = SubscriptionId::new(registry.next_id);
        let registration = Arc::new(Registration {
            id,
            state: Arc::clone(&state),
            callback,
            filter: options.filter,
            priority: options.priority,
            event_types: event_types.clone(),
        });
        for event_type in &event_types {
            let list = registry.subscriptions.entry(event_type.clone()).or_default();
            let at = list.partition_point(|r| r.priority <= registration.priority);
            list.insert(at, Arc::clone(&registration));
        }
        drop(registry);

        tracing::debug!(
            subscription_id = %id,
            event_types = ?event_types,
            priority = options.priority,
            "bus subscription added"
        );

        let bus: Weak<Inner> = Arc::downgrade(&self.inner);
        Subscription::new(id, state, move || {
            if let Some(inner) = bus.upgrade() {
                inner.lock().remove(id, &event_types);
            }
        })
    }

    /// Registers `handler` for `event_type`. Returns `false` if this exact
    /// instance was already registered for that type.
    pub fn register_handler(&self, event_type: &str, handler: Arc<dyn EventHandler>) -> bool {
        let mut registry = self.inner.lock();
        let handlers = registry.handlers.entry(event_type.to_owned()).or_default();
        if handlers.iter().any(|h| same_handler(h, &handler)) {
            return false;
        }
        tracing::debug!(event_type, handler = handler.name(), "bus handler registered");
        handlers.push(handler);
        true
    }

    /// Removes `handler` from `event_type`. Returns `false` if it was not
    /// registered.
    pub fn unregister_handler(&self, event_type: &str, handler: &Arc<dyn EventHandler>) -> bool {
        let mut registry = self.inner.lock();
        let Some(handlers) = registry.handlers.get_mut(event_type) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|h| !same_handler(h, handler));
        let removed = handlers.len() < before;
        if handlers.is_empty() {
            registry.handlers.remove(event_type);
        }
        removed
    }

    /// Delivers `event` to every matching subscription in priority order,
    /// then to every handler registered for its type.
    ///
    /// Each delivery is awaited before the next. Failures are logged and
    /// counted.
    pub async fn publish(&self, event: &DomainEvent) {
        self.inner.published.fetch_add(1, Ordering::Relaxed);
        let event_type = event.event_type.as_str();

        let (subscriptions, handlers) = {
            let registry = self.inner.lock();
            let subscriptions: Vec<Arc<Registration>> = registry
                .subscriptions
                .get(event_type)
                .map(|list| list.iter().cloned().collect())
                .unwrap_or_default();
            let handlers: Vec<Arc<dyn EventHandler>> = registry
                .handlers
                .get(event_type)
                .cloned()
                .unwrap_or_default();
            (subscriptions, handlers)
        };

        if subscriptions.is_empty() && handlers.is_empty() {
            tracing::trace!(event_type, event_id = %event.event_id, "no receivers for event");
            return;
        }

        for registration in &subscriptions {
            if !registration.accepts(event) {
                continue;
            }
            registration.state.record_delivery();
            match deliver(&registration.callback, event.clone()).await {
                Ok(()) => self.record_success(),
                Err(failure) => {
                    self.record_failure();
                    tracing::warn!(
                        event_type,
                        event_id = %event.event_id,
                        subscription_id = %registration.id,
                        error = %failure,
                        "bus subscriber failed"
                    );
                }
            }
        }

        for handler in &handlers {
            match isolate(handler.handle(event)).await {
                Ok(()) => self.record_success(),
                Err(failure) => {
                    self.record_failure();
                    tracing::warn!(
                        event_type,
                        event_id = %event.event_id,
                        handler = handler.name(),
                        error = %failure,
                        "bus handler failed"
                    );
                }
            }
        }
    }

    /// Publishes `events` one after another, in order.
    pub async fn publish_all(&self, events: &[DomainEvent]) {
        for event in events {
            self.publish(event).await;
        }
    }

    /// Returns `true` if any subscription or handler exists for `event_type`.
    #[must_use]
    pub fn has_subscribers(&self, event_type: &str) -> bool {
        self.subscriber_count(event_type) > 0
    }

    /// Active subscriptions plus registered handlers for `event_type`.
    #[must_use]
    pub fn subscriber_count(&self, event_type: &str) -> usize {
        let registry = self.inner.lock();
        registry.active(event_type) + registry.handlers.get(event_type).map_or(0, Vec::len)
    }

    /// Returns the current counters.
    #[must_use]
    pub fn stats(&self) -> BusStats {
        let registry = self.inner.lock();
        let mut distinct = BTreeSet::new();
        let mut subscribers_by_type = BTreeMap::new();
        for (event_type, list) in &registry.subscriptions {
            let active: Vec<SubscriptionId> = list
                .iter()
                .filter(|r| r.state.is_active())
                .map(|r| r.id)
                .collect();
            if !active.is_empty() {
                subscribers_by_type.insert(event_type.clone(), active.len());
            }
            distinct.extend(active);
        }
        BusStats {
            total_subscribers: distinct.len(),
            subscribers_by_type,
            total_events_published: self.inner.published.load(Ordering::Relaxed),
            total_events_delivered: self.inner.delivered.load(Ordering::Relaxed),
            failed_deliveries: self.inner.failed.load(Ordering::Relaxed),
        }
    }

    /// Lists active subscriptions ordered by identifier.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<SubscriptionInfo> {
        let registry = self.inner.lock();
        let mut seen: BTreeMap<SubscriptionId, SubscriptionInfo> = BTreeMap::new();
        for registration in registry.subscriptions.values().flatten() {
            if registration.state.is_active() {
                seen.entry(registration.id).or_insert_with(|| SubscriptionInfo {
                    id: registration.id,
                    event_types: registration.event_types.clone(),
                    priority: registration.priority,
                    event_count: registration.state.event_count(),
                });
            }
        }
        seen.into_values().collect()
    }

    /// Drops every subscription and handler. Outstanding handles become
    /// inactive; counters are kept.
    pub fn clear(&self) {
        let mut registry = self.inner.lock();
        for registration in registry.subscriptions.values().flatten() {
            registration.state.deactivate();
        }
        registry.subscriptions.clear();
        registry.handlers.clear();
        tracing::debug!("bus cleared");
    }

    fn record_success(&self) {
        self.inner.delivered.fetch_add(1, Ordering::Relaxed);
    }

    fn record_failure(&self) {
        self.inner.failed.fetch_add(1, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("stats", &self.stats())
            .finish()
    }
}

fn same_handler(a: &Arc<dyn EventHandler>, b: &Arc<dyn EventHandler>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
