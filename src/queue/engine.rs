//! # WorkQueue: competing-consumer engine.
//!
//! [`WorkQueue`] implements enqueue/dequeue/ack/nack over the envelope store,
//! plus the expiry sweep invoked by the [`Sweeper`](crate::queue::Sweeper).
//!
//! ## State transitions
//! For each envelope, the engine drives:
//! ```text
//! enqueue → Ready → (dequeue, attempts += 1) → InFlight
//!                                                 ├─ ack     → Acked        (terminal)
//!                                                 ├─ nack    → Ready | DeadLettered
//!                                                 └─ expiry  → Ready | DeadLettered
//! ```
//!
//! ## Rules
//! - One mutex guards ready + in-flight + dead-letter together; **every**
//!   transition takes it, so an ack can never race a sweeper requeue of the
//!   same envelope.
//! - `dequeue` never blocks on an empty queue; absence of work is a value.
//! - `nack` and expiry requeue at the **front** of the envelope's own
//!   priority tier: retries are not starved behind newer work, and they do
//!   not jump tiers.
//! - Ack/nack on unknown or terminal ids is a caller bug and surfaces as
//!   [`BrokerError::InvalidState`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::envelope::{Body, Envelope, EnvelopeId, EnvelopeState};
use crate::error::BrokerError;
use crate::events::{Bus, Event, EventKind};
use crate::queue::store::{InFlightRecord, QueueState};
use crate::stats::Stats;

/// Why an in-flight envelope is being returned to the engine.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Requeue {
    /// Consumer called `nack` explicitly.
    Nack,
    /// Visibility deadline elapsed without ack/nack.
    Expired,
}

/// Work-queue engine: priority scheduling, visibility timeouts, dead-lettering.
///
/// Cheap to share: wrap in an `Arc` (the facade does this) and call from any
/// number of producer and consumer tasks concurrently.
pub struct WorkQueue {
    state: Mutex<QueueState>,
    stats: Arc<Stats>,
    bus: Bus,
    /// Ready + in-flight bound; 0 = unbounded.
    max_depth: usize,
}

impl WorkQueue {
    pub(crate) fn new(stats: Arc<Stats>, bus: Bus, max_depth: usize) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            stats,
            bus,
            max_depth,
        }
    }

    /// Creates a `Ready` envelope and inserts it in priority-then-FIFO order.
    ///
    /// Returns the new id immediately; never blocks on consumers.
    ///
    /// # Errors
    /// [`BrokerError::CapacityExceeded`] when the configured depth bound is
    /// hit (counting ready **and** in-flight envelopes, since both return to
    /// the queue's budget).
    pub async fn enqueue(
        &self,
        body: Body,
        priority: i64,
        max_retries: u32,
    ) -> Result<EnvelopeId, BrokerError> {
        let mut state = self.state.lock().await;
        if self.max_depth > 0 && state.ready_len() + state.in_flight_len() >= self.max_depth {
            return Err(BrokerError::CapacityExceeded {
                what: "ready queue",
                limit: self.max_depth,
            });
        }

        let id = state.allocate_id();
        let env = Envelope::new(id, body, priority, max_retries);
        state.push_back(env);
        drop(state);

        Stats::incr(&self.stats.enqueued);
        self.bus
            .publish(Event::new(EventKind::Enqueued).with_id(id.get()).with_priority(priority));
        Ok(id)
    }

    /// Removes the highest-priority, oldest ready envelope and hands out a copy.
    ///
    /// The envelope moves to `InFlight` with `visibility_deadline = now +
    /// visibility`, and `attempts` is incremented exactly once. Returns
    /// `None` when the ready queue is empty; callers wanting blocking
    /// semantics poll with their own backoff.
    ///
    /// Two concurrent dequeues can never observe the same envelope: the pop
    /// and the in-flight insert happen under one lock.
    pub async fn dequeue(&self, visibility: Duration) -> Option<Envelope> {
        let mut state = self.state.lock().await;
        let mut env = state.pop_highest()?;
        env.attempts += 1;
        env.state = EnvelopeState::InFlight;

        let copy = env.clone();
        state.insert_in_flight(InFlightRecord {
            envelope: env,
            visibility_deadline: Instant::now() + visibility,
        });
        drop(state);

        self.bus.publish(
            Event::new(EventKind::Dequeued)
                .with_id(copy.id.get())
                .with_attempt(copy.attempts),
        );
        Some(copy)
    }

    /// Acknowledges an in-flight envelope: terminal success.
    ///
    /// # Errors
    /// [`BrokerError::InvalidState`] if `id` is unknown or already terminal.
    /// Double-acking indicates a consumer bug worth surfacing.
    pub async fn ack(&self, id: EnvelopeId) -> Result<(), BrokerError> {
        let mut state = self.state.lock().await;
        state
            .remove_in_flight(id)
            .ok_or_else(|| BrokerError::invalid_state("ack", id))?;
        drop(state);

        Stats::incr(&self.stats.processed);
        self.bus.publish(Event::new(EventKind::Acked).with_id(id.get()));
        Ok(())
    }

    /// Negatively acknowledges an in-flight envelope.
    ///
    /// With retry budget remaining the envelope returns to the **front** of
    /// its priority tier; otherwise it is dead-lettered.
    ///
    /// # Errors
    /// [`BrokerError::InvalidState`] if `id` is unknown or already terminal.
    pub async fn nack(&self, id: EnvelopeId) -> Result<(), BrokerError> {
        let mut state = self.state.lock().await;
        let record = state
            .remove_in_flight(id)
            .ok_or_else(|| BrokerError::invalid_state("nack", id))?;
        self.requeue_locked(&mut state, record.envelope, Requeue::Nack);
        Ok(())
    }

    /// Requeues every in-flight envelope whose visibility deadline elapsed.
    ///
    /// Behaves exactly as an implicit nack per expired envelope; this is the
    /// recovery path for consumers that crashed between dequeue and ack.
    /// Returns the number of envelopes swept.
    pub async fn sweep_expired(&self, now: Instant) -> usize {
        let mut state = self.state.lock().await;
        let expired = state.expired_ids(now);
        let swept = expired.len();
        for id in expired {
            if let Some(record) = state.remove_in_flight(id) {
                self.requeue_locked(&mut state, record.envelope, Requeue::Expired);
            }
        }
        swept
    }

    /// Removes and returns all dead-lettered envelopes (operator API).
    pub async fn drain_dead_letters(&self) -> Vec<Envelope> {
        self.state.lock().await.drain_dead()
    }

    /// Envelopes waiting in the ready queue.
    pub async fn depth(&self) -> usize {
        self.state.lock().await.ready_len()
    }

    /// Envelopes currently in flight.
    pub async fn in_flight_count(&self) -> usize {
        self.state.lock().await.in_flight_len()
    }

    /// Envelopes parked in the dead-letter store.
    pub async fn dead_letter_depth(&self) -> usize {
        self.state.lock().await.dead_len()
    }

    /// Shared path for nack and expiry: escalate to the dead-letter store
    /// once the budget is spent, else return to the front of the tier.
    fn requeue_locked(&self, state: &mut QueueState, mut env: Envelope, cause: Requeue) {
        if env.retries_exhausted() {
            env.state = EnvelopeState::DeadLettered;
            let ev = Event::new(EventKind::DeadLettered)
                .with_id(env.id.get())
                .with_attempt(env.attempts);
            state.push_dead(env);
            Stats::incr(&self.stats.failed);
            self.bus.publish(ev);
        } else {
            env.state = EnvelopeState::Ready;
            let kind = match cause {
                Requeue::Nack => EventKind::Nacked,
                Requeue::Expired => EventKind::VisibilityExpired,
            };
            let ev = Event::new(kind).with_id(env.id.get()).with_attempt(env.attempts);
            state.push_front(env);
            self.bus.publish(ev);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue() -> WorkQueue {
        WorkQueue::new(Arc::new(Stats::default()), Bus::new(64), 0)
    }

    fn bounded(max_depth: usize) -> WorkQueue {
        WorkQueue::new(Arc::new(Stats::default()), Bus::new(64), max_depth)
    }

    #[tokio::test]
    async fn test_dequeue_empty_returns_none() {
        let q = queue();
        assert!(q.dequeue(Duration::from_secs(1)).await.is_none());
    }

    #[tokio::test]
    async fn test_priority_then_fifo_ordering() {
        let q = queue();
        let mut ids = Vec::new();
        for priority in [1, 5, 1, 5] {
            ids.push(q.enqueue(Body::from("m"), priority, 3).await.unwrap());
        }

        let a = q.dequeue(Duration::from_secs(5)).await.unwrap();
        let b = q.dequeue(Duration::from_secs(5)).await.unwrap();
        let c = q.dequeue(Duration::from_secs(5)).await.unwrap();
        let d = q.dequeue(Duration::from_secs(5)).await.unwrap();
        assert_eq!(
            vec![a.id, b.id, c.id, d.id],
            vec![ids[1], ids[3], ids[0], ids[2]]
        );
    }

    #[tokio::test]
    async fn test_dequeue_increments_attempts_once() {
        let q = queue();
        q.enqueue(Body::from("m"), 0, 3).await.unwrap();
        let env = q.dequeue(Duration::from_secs(5)).await.unwrap();
        assert_eq!(env.attempts, 1);
        assert_eq!(env.state, EnvelopeState::InFlight);
        assert_eq!(q.in_flight_count().await, 1);
        assert_eq!(q.depth().await, 0);
    }

    #[tokio::test]
    async fn test_ack_is_terminal_and_double_ack_fails() {
        let q = queue();
        q.enqueue(Body::from("m"), 0, 3).await.unwrap();
        let env = q.dequeue(Duration::from_secs(5)).await.unwrap();

        q.ack(env.id).await.unwrap();
        assert_eq!(q.in_flight_count().await, 0);

        let err = q.ack(env.id).await.unwrap_err();
        assert!(matches!(err, BrokerError::InvalidState { op: "ack", .. }));
    }

    #[tokio::test]
    async fn test_ack_unknown_id_fails() {
        let q = queue();
        let err = q.ack(EnvelopeId::new(99)).await.unwrap_err();
        assert_eq!(err.as_label(), "invalid_state");
    }

    #[tokio::test]
    async fn test_nack_requeues_at_front_of_tier() {
        let q = queue();
        let first = q.enqueue(Body::from("a"), 1, 5).await.unwrap();
        let second = q.enqueue(Body::from("b"), 1, 5).await.unwrap();

        let env = q.dequeue(Duration::from_secs(5)).await.unwrap();
        assert_eq!(env.id, first);
        q.nack(env.id).await.unwrap();

        // The retried envelope comes back before the younger one in its tier.
        let again = q.dequeue(Duration::from_secs(5)).await.unwrap();
        assert_eq!(again.id, first);
        assert_eq!(again.attempts, 2);
        let other = q.dequeue(Duration::from_secs(5)).await.unwrap();
        assert_eq!(other.id, second);
    }

    #[tokio::test]
    async fn test_retry_to_dlq_boundary() {
        // max_retries=2: first nack requeues (attempts=1), the 2nd nack
        // (attempts=2) dead-letters.
        let q = queue();
        let id = q.enqueue(Body::from("m"), 0, 2).await.unwrap();

        let env = q.dequeue(Duration::from_secs(5)).await.unwrap();
        q.nack(env.id).await.unwrap();
        assert_eq!(q.dead_letter_depth().await, 0);

        let env = q.dequeue(Duration::from_secs(5)).await.unwrap();
        assert_eq!(env.attempts, 2);
        q.nack(env.id).await.unwrap();

        assert_eq!(q.dead_letter_depth().await, 1);
        assert!(q.dequeue(Duration::from_secs(5)).await.is_none());

        let dead = q.drain_dead_letters().await;
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].id, id);
        assert_eq!(dead[0].state, EnvelopeState::DeadLettered);
        assert_eq!(q.dead_letter_depth().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_requeues_expired_in_flight() {
        let q = queue();
        q.enqueue(Body::from("m"), 0, 5).await.unwrap();
        let env = q.dequeue(Duration::from_secs(1)).await.unwrap();
        assert_eq!(env.attempts, 1);

        // Before the deadline nothing is swept.
        assert_eq!(q.sweep_expired(Instant::now()).await, 0);

        tokio::time::advance(Duration::from_millis(1100)).await;
        assert_eq!(q.sweep_expired(Instant::now()).await, 1);
        assert_eq!(q.in_flight_count().await, 0);

        let again = q.dequeue(Duration::from_secs(1)).await.unwrap();
        assert_eq!(again.id, env.id);
        assert_eq!(again.attempts, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_escalates_to_dlq_when_budget_spent() {
        let q = queue();
        q.enqueue(Body::from("m"), 0, 1).await.unwrap();
        let env = q.dequeue(Duration::from_secs(1)).await.unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(q.sweep_expired(Instant::now()).await, 1);

        assert_eq!(q.depth().await, 0);
        assert_eq!(q.dead_letter_depth().await, 1);
        let _ = env;
    }

    #[tokio::test]
    async fn test_capacity_bound_counts_in_flight() {
        let q = bounded(2);
        q.enqueue(Body::from("a"), 0, 3).await.unwrap();
        q.enqueue(Body::from("b"), 0, 3).await.unwrap();

        let err = q.enqueue(Body::from("c"), 0, 3).await.unwrap_err();
        assert!(matches!(err, BrokerError::CapacityExceeded { limit: 2, .. }));

        // Dequeuing does not free budget; the envelope is merely hidden.
        q.dequeue(Duration::from_secs(5)).await.unwrap();
        assert!(q.enqueue(Body::from("c"), 0, 3).await.is_err());

        // Acking does.
        let env = q.dequeue(Duration::from_secs(5)).await.unwrap();
        q.ack(env.id).await.unwrap();
        assert!(q.enqueue(Body::from("c"), 0, 3).await.is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_dequeues_never_share_an_envelope() {
        let q = Arc::new(queue());
        for _ in 0..50 {
            q.enqueue(Body::from("m"), 0, 3).await.unwrap();
        }

        let mut handles = Vec::new();
        for _ in 0..8 {
            let q = Arc::clone(&q);
            handles.push(tokio::spawn(async move {
                let mut seen = Vec::new();
                while let Some(env) = q.dequeue(Duration::from_secs(60)).await {
                    seen.push(env.id);
                }
                seen
            }));
        }

        let mut all = Vec::new();
        for h in handles {
            all.extend(h.await.unwrap());
        }
        all.sort();
        let before = all.len();
        all.dedup();
        assert_eq!(before, 50);
        assert_eq!(all.len(), 50);
    }
}
