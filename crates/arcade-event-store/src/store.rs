//! In-memory `EventStore`.
//!
//! Events live in one global arena ordered by position; each stream keeps
//! the arena indices of its events. The optimistic version check and the
//! write happen under the same lock, so concurrent appends to one stream
//! cannot both succeed against the same expected version.
//!
//! Subscribers are notified after the lock is released. Appended events are
//! queued on each subscriber's outbox under the store lock, so every outbox
//! holds events in position order. One task at a time drains an outbox; an
//! append that finds an outbox already draining (a running replay, another
//! append, or a callback appending back into the store) leaves its events for
//! that drainer and returns.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_trait::async_trait;

use arcade_core::callback::deliver;
use arcade_core::clock::{Clock, SystemClock};
use arcade_core::error::DomainError;
use arcade_core::event::{DomainEvent, StoredEvent};
use arcade_core::repository::{AppendResult, EventCallback, EventStore, EventStream, ReadOptions};
use arcade_core::subscription::{Subscription, SubscriptionId, SubscriptionState};

/// `(aggregate_type, aggregate_id)`.
type StreamKey = (String, String);

#[derive(Default)]
struct Outbox {
    queue: VecDeque<StoredEvent>,
    draining: bool,
}

struct Subscriber {
    id: SubscriptionId,
    state: Arc<SubscriptionState>,
    callback: EventCallback,
    outbox: Mutex<Outbox>,
}

impl Subscriber {
    fn outbox(&self) -> MutexGuard<'_, Outbox> {
        self.outbox.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues `events`; returns `true` if the caller now owns the drain.
    fn enqueue(&self, events: &[StoredEvent]) -> bool {
        let mut outbox = self.outbox();
        outbox.queue.extend(events.iter().cloned());
        !std::mem::replace(&mut outbox.draining, true)
    }
}

/// The right to deliver one subscriber's queued events.
///
/// Dropped before the queue is empty, it hands the right back and the next
/// append drains what is left.
struct Drain {
    subscriber: Arc<Subscriber>,
    released: bool,
}

impl Drain {
    fn new(subscriber: Arc<Subscriber>) -> Self {
        Self {
            subscriber,
            released: false,
        }
    }

    /// Pops the next queued event, releasing the drain once the queue is empty.
    fn pop(&mut self) -> Option<StoredEvent> {
        if self.released {
            return None;
        }
        let mut outbox = self.subscriber.outbox();
        let next = outbox.queue.pop_front();
        if next.is_none() {
            outbox.draining = false;
            self.released = true;
        }
        next
    }
}

impl Drop for Drain {
    fn drop(&mut self) {
        if !self.released {
            self.subscriber.outbox().draining = false;
        }
    }
}

#[derive(Default)]
struct StoreState {
    events: Vec<StoredEvent>,
    streams: HashMap<StreamKey, Vec<usize>>,
    subscribers: Vec<Arc<Subscriber>>,
    next_subscription_id: u64,
}

impl StoreState {
    fn head(&self) -> u64 {
        self.events.len() as u64
    }

    fn stream_len(&self, key: &StreamKey) -> u64 {
        self.streams.get(key).map_or(0, |indices| indices.len() as u64)
    }
}

struct Inner {
    state: Mutex<StoreState>,
    clock: Arc<dyn Clock>,
    failed_notifications: AtomicU64,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Event store backed by process memory.
///
/// Cloning is cheap and yields a handle to the same store.
#[derive(Clone)]
pub struct InMemoryEventStore {
    inner: Arc<Inner>,
}

impl InMemoryEventStore {
    /// Creates an empty store stamping `stored_at` with the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty store stamping `stored_at` with `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(StoreState {
                    next_subscription_id: 1,
                    ..StoreState::default()
                }),
                clock,
                failed_notifications: AtomicU64::new(0),
            }),
        }
    }

    /// Number of subscriber deliveries that returned an error or panicked.
    #[must_use]
    pub fn failed_notifications(&self) -> u64 {
        self.inner.failed_notifications.load(Ordering::Relaxed)
    }

    /// Number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .lock()
            .subscribers
            .iter()
            .filter(|s| s.state.is_active())
            .count()
    }

    async fn notify(&self, subscriber: &Subscriber, event: StoredEvent) {
        if !subscriber.state.is_active() {
            return;
        }
        subscriber.state.record_delivery();
        let position = event.position;
        let event_type = event.event.event_type.clone();
        if let Err(failure) = deliver(&subscriber.callback, event).await {
            self.inner
                .failed_notifications
                .fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                subscription_id = %subscriber.id,
                event_type = %event_type,
                position,
                error = %failure,
                "event store subscriber failed"
            );
        }
    }
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryEventStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("InMemoryEventStore")
            .field("events", &state.events.len())
            .field("streams", &state.streams.len())
            .field("subscribers", &state.subscribers.len())
            .finish_non_exhaustive()
    }
}

/// Applies reverse, then limit.
fn window(mut events: Vec<StoredEvent>, options: &ReadOptions) -> Vec<StoredEvent> {
    if options.reverse {
        events.reverse();
    }
    if let Some(limit) = options.limit {
        events.truncate(limit);
    }
    events
}

fn skip_count(position: Option<u64>) -> usize {
    position.map_or(0, |p| usize::try_from(p).unwrap_or(usize::MAX))
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(
        &self,
        aggregate_id: &str,
        aggregate_type: &str,
        events: Vec<DomainEvent>,
        expected_version: Option<u64>,
    ) -> Result<AppendResult, DomainError> {
        let (result, appended, mut drains) = {
            let mut state = self.inner.lock();
            let key = (aggregate_type.to_owned(), aggregate_id.to_owned());
            let actual = state.stream_len(&key);

            if let Some(expected) = expected_version.filter(|&e| e != actual) {
                return Err(DomainError::ConcurrencyConflict {
                    aggregate_type: aggregate_type.to_owned(),
                    aggregate_id: aggregate_id.to_owned(),
                    expected,
                    actual,
                });
            }

            if events.is_empty() {
                return Ok(AppendResult {
                    version: actual,
                    position: state.head(),
                });
            }

            let stored_at = self.inner.clock.now();
            let mut appended = Vec::with_capacity(events.len());
            let mut version = actual;
            for event in events {
                version += 1;
                let index = state.events.len();
                let stored = StoredEvent {
                    event,
                    aggregate_id: aggregate_id.to_owned(),
                    aggregate_type: aggregate_type.to_owned(),
                    aggregate_version: version,
                    position: index as u64 + 1,
                    stored_at,
                };
                state.events.push(stored.clone());
                state.streams.entry(key.clone()).or_default().push(index);
                appended.push(stored);
            }

            let drains: Vec<Drain> = state
                .subscribers
                .iter()
                .filter(|s| s.state.is_active() && s.enqueue(&appended))
                .cloned()
                .map(Drain::new)
                .collect();
            let result = AppendResult {
                version,
                position: state.head(),
            };
            (result, appended, drains)
        };

        tracing::debug!(
            aggregate_type,
            aggregate_id,
            count = appended.len(),
            version = result.version,
            position = result.position,
            "appended events"
        );

        // One event per subscriber per round keeps delivery event-major.
        loop {
            let mut delivered = false;
            for drain in &mut drains {
                if let Some(event) = drain.pop() {
                    self.notify(&drain.subscriber, event).await;
                    delivered = true;
                }
            }
            if !delivered {
                break;
            }
        }

        Ok(result)
    }

    async fn read_stream(
        &self,
        aggregate_id: &str,
        aggregate_type: &str,
        options: ReadOptions,
    ) -> Result<EventStream, DomainError> {
        let state = self.inner.lock();
        let key = (aggregate_type.to_owned(), aggregate_id.to_owned());
        let indices = state.streams.get(&key).map_or(&[][..], Vec::as_slice);

        let selected: Vec<StoredEvent> = indices
            .iter()
            .map(|&i| &state.events[i])
            .filter(|e| options.from_version.is_none_or(|v| e.aggregate_version >= v))
            .filter(|e| options.to_version.is_none_or(|v| e.aggregate_version <= v))
            .cloned()
            .collect();

        Ok(EventStream {
            aggregate_id: aggregate_id.to_owned(),
            aggregate_type: aggregate_type.to_owned(),
            version: indices.len() as u64,
            events: window(selected, &options),
        })
    }

    async fn read_by_type(
        &self,
        event_type: &str,
        options: ReadOptions,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        let state = self.inner.lock();
        let selected = state
            .events
            .iter()
            .filter(|e| e.event.event_type == event_type)
            .cloned()
            .collect();
        Ok(window(selected, &options))
    }

    async fn read_all(
        &self,
        from_position: Option<u64>,
        limit: Option<usize>,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        let state = self.inner.lock();
        Ok(state
            .events
            .iter()
            .skip(skip_count(from_position))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn stream_exists(
        &self,
        aggregate_id: &str,
        aggregate_type: &str,
    ) -> Result<bool, DomainError> {
        let key = (aggregate_type.to_owned(), aggregate_id.to_owned());
        Ok(self.inner.lock().stream_len(&key) > 0)
    }

    async fn stream_version(
        &self,
        aggregate_id: &str,
        aggregate_type: &str,
    ) -> Result<u64, DomainError> {
        let key = (aggregate_type.to_owned(), aggregate_id.to_owned());
        Ok(self.inner.lock().stream_len(&key))
    }

    async fn global_position(&self) -> Result<u64, DomainError> {
        Ok(self.inner.lock().head())
    }

    async fn subscribe(
        &self,
        callback: EventCallback,
        from_position: Option<u64>,
    ) -> Result<Subscription, DomainError> {
        let state = Arc::new(SubscriptionState::new());

        let (mut drain, replayed) = {
            let mut store = self.inner.lock();
            let id = SubscriptionId::new(store.next_subscription_id);
            store.next_subscription_id += 1;
            let backlog: VecDeque<StoredEvent> = match from_position {
                Some(position) => store
                    .events
                    .iter()
                    .skip(skip_count(Some(position)))
                    .cloned()
                    .collect(),
                None => VecDeque::new(),
            };
            let replayed = backlog.len();
            // Registered already draining, so live events queue behind the replay.
            let subscriber = Arc::new(Subscriber {
                id,
                state: Arc::clone(&state),
                callback,
                outbox: Mutex::new(Outbox {
                    queue: backlog,
                    draining: true,
                }),
            });
            store.subscribers.push(Arc::clone(&subscriber));
            (Drain::new(subscriber), replayed)
        };

        if replayed > 0 {
            tracing::debug!(
                subscription_id = %drain.subscriber.id,
                from_position,
                count = replayed,
                "replaying events to subscriber"
            );
        }
        while let Some(event) = drain.pop() {
            self.notify(&drain.subscriber, event).await;
        }

        let id = drain.subscriber.id;
        let registry: Weak<Inner> = Arc::downgrade(&self.inner);
        Ok(Subscription::new(id, state, move || {
            if let Some(inner) = registry.upgrade() {
                inner.lock().subscribers.retain(|s| s.id != id);
            }
        }))
    }
}
