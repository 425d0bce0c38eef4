//! Time source for event and snapshot timestamps.
//!
//! Stores and aggregates never call `Utc::now()` directly; they are handed a
//! `Clock` so tests can pin `occurred_at`, `stored_at` and `created_at`.

use chrono::{DateTime, Utc};

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_monotonic_enough_for_ordering() {
        let clock: &dyn Clock = &SystemClock;

        let first = clock.now();
        let second = clock.now();

        assert!(second >= first);
    }
}
