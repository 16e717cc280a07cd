//! # Lifecycle events emitted by the broker.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Work queue events**: envelope flow (enqueued, dequeued, acked, nacked,
//!   dead-lettered, visibility expiry)
//! - **Pub/sub events**: topic fanout and per-subscription delivery outcomes
//! - **Runtime events**: sweeper lifecycle
//!
//! The [`Event`] struct carries additional metadata such as timestamps,
//! envelope ids, topic names, attempt counts, and backoff delays.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! observed out of order.
//!
//! ## Example
//! ```rust
//! use relayq::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::DeliveryExhausted)
//!     .with_topic("orders")
//!     .with_subscriber("audit")
//!     .with_attempt(3)
//!     .with_reason("connection refused");
//!
//! assert_eq!(ev.kind, EventKind::DeliveryExhausted);
//! assert_eq!(ev.topic.as_deref(), Some("orders"));
//! assert_eq!(ev.reason.as_deref(), Some("connection refused"));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of broker lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Work queue events ===
    /// Envelope accepted into the ready queue.
    ///
    /// Sets: `id`, `priority`, `at`, `seq`.
    Enqueued,

    /// Envelope handed to a consumer and moved in flight.
    ///
    /// Sets: `id`, `attempt`, `at`, `seq`.
    Dequeued,

    /// Envelope acknowledged (terminal success).
    ///
    /// Sets: `id`, `at`, `seq`.
    Acked,

    /// Envelope negatively acknowledged and returned to its priority tier.
    ///
    /// Sets: `id`, `attempt`, `at`, `seq`.
    Nacked,

    /// Envelope exhausted its retry budget and was parked in the dead-letter
    /// store (terminal failure).
    ///
    /// Sets: `id`, `attempt`, `at`, `seq`.
    DeadLettered,

    /// Visibility timeout elapsed without ack/nack; envelope requeued by the
    /// sweeper (implicit nack).
    ///
    /// Sets: `id`, `attempt`, `at`, `seq`.
    VisibilityExpired,

    // === Pub/sub events ===
    /// Message published to a topic; fanout initiated.
    ///
    /// Sets: `topic`, `accepted` (via `attempt`), `at`, `seq`.
    Published,

    /// One subscription's delivery succeeded.
    ///
    /// Sets: `topic`, `subscriber`, `attempt`, `at`, `seq`.
    DeliverySucceeded,

    /// One subscription's delivery attempt failed; a retry was scheduled.
    ///
    /// Sets: `topic`, `subscriber`, `attempt`, `delay_ms`, `reason`, `at`, `seq`.
    DeliveryRetryScheduled,

    /// One subscription exhausted its retry budget for a delivery.
    ///
    /// Sets: `topic`, `subscriber`, `attempt`, `reason`, `at`, `seq`.
    DeliveryExhausted,

    /// A subscription was registered on a topic.
    ///
    /// Sets: `topic`, `subscriber`, `at`, `seq`.
    Subscribed,

    /// A subscription was removed from its topic.
    ///
    /// Sets: `topic`, `subscriber`, `at`, `seq`.
    Unsubscribed,

    // === Runtime events ===
    /// The expiry sweeper started ticking.
    ///
    /// Sets: `at`, `seq`.
    SweeperStarted,

    /// The expiry sweeper stopped (broker shutdown).
    ///
    /// Sets: `at`, `seq`.
    SweeperStopped,
}

/// Broker lifecycle event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Envelope id, for work-queue events.
    pub id: Option<u64>,
    /// Topic name, for pub/sub events.
    pub topic: Option<Arc<str>>,
    /// Subscriber name, for delivery events.
    pub subscriber: Option<Arc<str>>,
    /// Attempt count (1-based) or accepted-subscriber count for `Published`.
    pub attempt: Option<u32>,
    /// Backoff delay before the next attempt in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Envelope priority, for `Enqueued`.
    pub priority: Option<i64>,
    /// Human-readable reason (handler errors, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next
    /// sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            kind,
            at: SystemTime::now(),
            id: None,
            topic: None,
            subscriber: None,
            attempt: None,
            delay_ms: None,
            priority: None,
            reason: None,
        }
    }

    /// Attaches an envelope id.
    #[inline]
    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    /// Attaches a topic name.
    #[inline]
    pub fn with_topic(mut self, topic: impl Into<Arc<str>>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Attaches a subscriber name.
    #[inline]
    pub fn with_subscriber(mut self, subscriber: impl Into<Arc<str>>) -> Self {
        self.subscriber = Some(subscriber.into());
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a backoff delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches an envelope priority.
    #[inline]
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::Enqueued);
        let b = Event::new(EventKind::Enqueued);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_builder_fields() {
        let ev = Event::new(EventKind::DeliveryRetryScheduled)
            .with_topic("t")
            .with_subscriber("s")
            .with_attempt(2)
            .with_delay(Duration::from_millis(250))
            .with_reason("boom");
        assert_eq!(ev.topic.as_deref(), Some("t"));
        assert_eq!(ev.subscriber.as_deref(), Some("s"));
        assert_eq!(ev.attempt, Some(2));
        assert_eq!(ev.delay_ms, Some(250));
        assert_eq!(ev.reason.as_deref(), Some("boom"));
    }
}
