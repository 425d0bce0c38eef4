//! Arcade Event Bus — in-process publish/subscribe for domain events.
//!
//! Subscriptions are async callbacks ordered by priority with optional
//! filters; handlers are [`EventHandler`](arcade_core::handler::EventHandler)
//! objects registered per event type. A failing or panicking receiver is
//! logged and counted and never stops delivery to the others.

mod bus;
mod options;
mod stats;

pub use bus::{BusCallback, EventBus, SubscriptionInfo};
pub use options::{DEFAULT_PRIORITY, EventFilter, SubscribeOptions};
pub use stats::BusStats;
