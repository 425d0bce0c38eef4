//! Subscription tokens with scoped release.
//!
//! Every `subscribe` in the workspace returns a [`Subscription`]. Dropping it
//! (or calling [`Subscription::unsubscribe`]) deactivates the registration and
//! removes it from the owning registry, so early returns and error paths
//! cannot leak listeners. A registration meant to live as long as its
//! component is kept with [`Subscription::detach`].

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Identifier of one registration within its owning component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Wraps a raw identifier allocated by a registry.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Live state shared between a registry entry and its token.
#[derive(Debug)]
pub struct SubscriptionState {
    active: AtomicBool,
    event_count: AtomicU64,
}

impl SubscriptionState {
    /// Creates an active state with no deliveries.
    #[must_use]
    pub fn new() -> Self {
        Self {
            active: AtomicBool::new(true),
            event_count: AtomicU64::new(0),
        }
    }

    /// Returns whether the registration still receives events.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Deactivates the registration. Returns `true` if it was active.
    pub fn deactivate(&self) -> bool {
        self.active.swap(false, Ordering::AcqRel)
    }

    /// Counts one delivery attempt.
    pub fn record_delivery(&self) {
        self.event_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of delivery attempts so far.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.event_count.load(Ordering::Relaxed)
    }
}

impl Default for SubscriptionState {
    fn default() -> Self {
        Self::new()
    }
}

type Release = Box<dyn FnOnce() + Send + Sync>;

/// Handle to a registration. Releases it when dropped.
#[must_use = "dropping a Subscription unsubscribes immediately; call `detach` to keep it"]
pub struct Subscription {
    id: SubscriptionId,
    state: Arc<SubscriptionState>,
    release: Option<Release>,
}

impl Subscription {
    /// Creates a token. `release` runs exactly once, on unsubscribe or drop,
    /// after the state has been deactivated.
    pub fn new(
        id: SubscriptionId,
        state: Arc<SubscriptionState>,
        release: impl FnOnce() + Send + Sync + 'static,
    ) -> Self {
        Self {
            id,
            state,
            release: Some(Box::new(release)),
        }
    }

    /// Returns the registration identifier.
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns whether the registration still receives events.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Returns the number of events delivered to this registration.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.state.event_count()
    }

    /// Releases the registration now.
    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    /// Keeps the registration alive for the lifetime of its owning component
    /// and returns its identifier.
    pub fn detach(mut self) -> SubscriptionId {
        self.release = None;
        self.id
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            self.state.deactivate();
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .field("event_count", &self.event_count())
            .field("detached", &self.release.is_none())
            .finish()
    }
}
