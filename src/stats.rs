//! # Broker statistics counters.
//!
//! [`Stats`] holds the monotonic counters the engines bump as messages move
//! through the broker; [`StatsSnapshot`] is the point-in-time view returned
//! by [`Broker::stats`](crate::Broker::stats), combining the counters with
//! the current store depths.
//!
//! Counters use relaxed atomics: they are observability data, not
//! synchronization points.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counters shared between the work queue and pub/sub engines.
#[derive(Debug, Default)]
pub struct Stats {
    /// Envelopes accepted by `enqueue`.
    pub enqueued: AtomicU64,
    /// Envelopes acknowledged (terminal success).
    pub processed: AtomicU64,
    /// Envelopes dead-lettered (terminal failure).
    pub failed: AtomicU64,
    /// Messages accepted by `publish`.
    pub published: AtomicU64,
    /// Per-subscription deliveries that succeeded.
    pub delivered: AtomicU64,
    /// Per-subscription deliveries that exhausted their retry budget.
    pub delivery_failed: AtomicU64,
}

impl Stats {
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}

/// Point-in-time view of broker counters and store depths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Envelopes accepted by `enqueue` since broker creation.
    pub enqueued: u64,
    /// Envelopes acknowledged.
    pub processed: u64,
    /// Envelopes dead-lettered.
    pub failed: u64,
    /// Envelopes currently waiting in the ready queue.
    pub queue_depth: usize,
    /// Envelopes currently in flight.
    pub in_flight: usize,
    /// Envelopes currently parked in the dead-letter store.
    pub dead_letter_depth: usize,
    /// Messages accepted by `publish`.
    pub published: u64,
    /// Per-subscription deliveries that succeeded.
    pub delivered: u64,
    /// Per-subscription deliveries that exhausted their retry budget.
    pub delivery_failed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_at_zero_and_increment() {
        let stats = Stats::default();
        assert_eq!(Stats::get(&stats.enqueued), 0);
        Stats::incr(&stats.enqueued);
        Stats::incr(&stats.enqueued);
        assert_eq!(Stats::get(&stats.enqueued), 2);
        assert_eq!(Stats::get(&stats.processed), 0);
    }
}
