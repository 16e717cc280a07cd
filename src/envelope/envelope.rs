//! # Envelope: the work-queue unit of delivery.
//!
//! An [`Envelope`] wraps a [`Body`] with the metadata the work queue needs to
//! schedule it: priority, enqueue time, attempt count, and retry budget.
//!
//! ## Lifecycle
//! ```text
//! enqueue ──► Ready ──dequeue──► InFlight ──ack──► Acked (terminal)
//!               ▲                    │
//!               │         nack / visibility expiry
//!               │                    │
//!               └── attempts < max ──┤
//!                                    └─ attempts >= max ──► DeadLettered (terminal)
//! ```
//!
//! ## Rules
//! - An envelope lives in exactly one home at a time: the ready queue, the
//!   in-flight map, or the dead-letter store, never two at once.
//! - `attempts` increments exactly once per dequeue and never decreases.
//! - `id` is immutable and unique for the owning broker's lifetime.

use tokio::time::Instant;

use super::Body;

/// Unique identifier of an envelope within one broker instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnvelopeId(u64);

impl EnvelopeId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw numeric id.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EnvelopeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeState {
    /// Waiting in the ready queue, eligible for dequeue.
    Ready,
    /// Handed to a consumer, hidden until ack/nack or visibility expiry.
    InFlight,
    /// Successfully processed (terminal).
    Acked,
    /// Retry budget exhausted; parked in the dead-letter store (terminal).
    DeadLettered,
}

impl EnvelopeState {
    /// Returns `true` for states that admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EnvelopeState::Acked | EnvelopeState::DeadLettered)
    }
}

/// The unit of work travelling through the work queue.
///
/// Consumers receive a clone at dequeue time; the broker retains the
/// authoritative copy in its in-flight map until ack/nack/expiry.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// Immutable, broker-unique identifier.
    pub id: EnvelopeId,
    /// Opaque payload.
    pub body: Body,
    /// Scheduling priority; higher dequeues first, FIFO within a tier.
    pub priority: i64,
    /// When the envelope was first enqueued.
    pub enqueued_at: Instant,
    /// Number of dequeues so far (1-based after the first dequeue).
    pub attempts: u32,
    /// Maximum attempts before dead-lettering.
    pub max_retries: u32,
    /// Current lifecycle state.
    pub state: EnvelopeState,
}

impl Envelope {
    pub(crate) fn new(id: EnvelopeId, body: Body, priority: i64, max_retries: u32) -> Self {
        Self {
            id,
            body,
            priority,
            enqueued_at: Instant::now(),
            attempts: 0,
            max_retries,
            state: EnvelopeState::Ready,
        }
    }

    /// Returns `true` once the envelope has consumed its retry budget.
    pub fn retries_exhausted(&self) -> bool {
        self.attempts >= self.max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_envelope_is_ready_with_zero_attempts() {
        let env = Envelope::new(EnvelopeId::new(1), Body::from("x"), 5, 3);
        assert_eq!(env.state, EnvelopeState::Ready);
        assert_eq!(env.attempts, 0);
        assert_eq!(env.priority, 5);
        assert!(!env.retries_exhausted());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!EnvelopeState::Ready.is_terminal());
        assert!(!EnvelopeState::InFlight.is_terminal());
        assert!(EnvelopeState::Acked.is_terminal());
        assert!(EnvelopeState::DeadLettered.is_terminal());
    }

    #[test]
    fn test_retries_exhausted_boundary() {
        let mut env = Envelope::new(EnvelopeId::new(2), Body::from("x"), 0, 2);
        env.attempts = 1;
        assert!(!env.retries_exhausted());
        env.attempts = 2;
        assert!(env.retries_exhausted());
    }
}
