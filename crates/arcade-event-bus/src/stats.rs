use std::collections::BTreeMap;

use serde::Serialize;

/// Point-in-time bus counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BusStats {
    /// Distinct active subscriptions. A subscription spanning several event
    /// types counts once.
    pub total_subscribers: usize,
    /// Active subscriptions per event type.
    pub subscribers_by_type: BTreeMap<String, usize>,
    /// Calls to `publish`, including events nobody received.
    pub total_events_published: u64,
    /// Successful deliveries to subscriptions and handlers.
    pub total_events_delivered: u64,
    /// Deliveries that returned an error or panicked.
    pub failed_deliveries: u64,
}
