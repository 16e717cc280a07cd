//! # Broker: the public facade.
//!
//! [`Broker`] combines the two engines over one shared statistics block and
//! event bus, and owns the runtime pieces: the root [`CancellationToken`]
//! and the background [`Sweeper`](crate::queue::Sweeper).
//!
//! ## Ownership
//! The broker owns its envelope store exclusively; there is no ambient
//! global state. Construct it, share it (`Arc<Broker>` if needed), and tear
//! it down explicitly with [`Broker::shutdown`].
//!
//! ## Example
//! ```no_run
//! use relayq::{Body, Broker, BrokerConfig, HandlerError, HandlerFn};
//!
//! # async fn demo() -> Result<(), relayq::BrokerError> {
//! let broker = Broker::new(BrokerConfig::default());
//!
//! // Work queue: competing consumers.
//! broker.enqueue(Body::from("job-1")).await?;
//! if let Some(env) = broker.dequeue().await {
//!     broker.ack(env.id).await?;
//! }
//!
//! // Pub/sub: every matching subscriber gets its own copy.
//! broker
//!     .subscribe(
//!         "orders",
//!         HandlerFn::arc("audit", |body: Body| async move {
//!             println!("{body:?}");
//!             Ok::<_, HandlerError>(())
//!         }),
//!     )
//!     .await?;
//! let accepted = broker.publish("orders", Body::from("order-7")).await?;
//! assert_eq!(accepted, 1);
//!
//! broker.shutdown().await;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::BrokerConfig;
use crate::envelope::{Body, Envelope, EnvelopeId};
use crate::error::BrokerError;
use crate::events::{Bus, Event};
use crate::pubsub::{ConsumerRef, PubSub, SubscriptionId};
use crate::queue::{Sweeper, WorkQueue};
use crate::stats::{Stats, StatsSnapshot};

/// Dual-mode in-process message broker.
///
/// Combines a competing-consumer work queue (visibility timeouts,
/// dead-lettering) with topic-based pub/sub fanout (per-subscription retry).
/// All methods take `&self`; the broker is safe to call from any number of
/// concurrent producer and consumer tasks.
pub struct Broker {
    config: BrokerConfig,
    queue: Arc<WorkQueue>,
    pubsub: PubSub,
    stats: Arc<Stats>,
    bus: Bus,
    token: CancellationToken,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl Broker {
    /// Builds a broker and starts its expiry sweeper.
    ///
    /// Must be called within a Tokio runtime (the sweeper is spawned here).
    pub fn new(config: BrokerConfig) -> Self {
        let bus = Bus::new(config.bus_capacity);
        let stats = Arc::new(Stats::default());
        let token = CancellationToken::new();

        let queue = Arc::new(WorkQueue::new(
            Arc::clone(&stats),
            bus.clone(),
            config.max_depth,
        ));
        let pubsub = PubSub::new(
            config.backoff,
            config.max_subscribers_per_topic,
            Arc::clone(&stats),
            bus.clone(),
            token.clone(),
        );
        let sweeper = Sweeper::new(Arc::clone(&queue), config.sweep_interval, bus.clone())
            .spawn(token.child_token());

        Self {
            config,
            queue,
            pubsub,
            stats,
            bus,
            token,
            sweeper: Mutex::new(Some(sweeper)),
        }
    }

    // === Work queue ===

    /// Enqueues a body at priority 0 with the configured default retry budget.
    pub async fn enqueue(&self, body: impl Into<Body>) -> Result<EnvelopeId, BrokerError> {
        self.enqueue_with(body, 0, self.config.default_max_retries)
            .await
    }

    /// Enqueues a body with explicit priority and retry budget.
    pub async fn enqueue_with(
        &self,
        body: impl Into<Body>,
        priority: i64,
        max_retries: u32,
    ) -> Result<EnvelopeId, BrokerError> {
        self.queue.enqueue(body.into(), priority, max_retries).await
    }

    /// Dequeues with the configured default visibility timeout.
    ///
    /// Returns `None` immediately when no work is ready; callers wanting
    /// blocking semantics poll with their own backoff.
    pub async fn dequeue(&self) -> Option<Envelope> {
        self.queue.dequeue(self.config.default_visibility).await
    }

    /// Dequeues with an explicit visibility timeout.
    pub async fn dequeue_with(&self, visibility: Duration) -> Option<Envelope> {
        self.queue.dequeue(visibility).await
    }

    /// Acknowledges an in-flight envelope (terminal success).
    pub async fn ack(&self, id: EnvelopeId) -> Result<(), BrokerError> {
        self.queue.ack(id).await
    }

    /// Negatively acknowledges an in-flight envelope (requeue or dead-letter).
    pub async fn nack(&self, id: EnvelopeId) -> Result<(), BrokerError> {
        self.queue.nack(id).await
    }

    /// Removes and returns all dead-lettered envelopes (operator API).
    pub async fn drain_dead_letters(&self) -> Vec<Envelope> {
        self.queue.drain_dead_letters().await
    }

    // === Pub/sub ===

    /// Publishes to a topic; returns the accepted-subscriber count.
    pub async fn publish(
        &self,
        topic: &str,
        body: impl Into<Body>,
    ) -> Result<usize, BrokerError> {
        self.pubsub.publish(topic, body.into()).await
    }

    /// Subscribes a handler with the configured default retry budget.
    pub async fn subscribe(
        &self,
        topic: &str,
        consumer: ConsumerRef,
    ) -> Result<SubscriptionId, BrokerError> {
        self.subscribe_with(topic, consumer, self.config.default_max_retries)
            .await
    }

    /// Subscribes a handler with an explicit per-delivery retry budget.
    pub async fn subscribe_with(
        &self,
        topic: &str,
        consumer: ConsumerRef,
        max_retries: u32,
    ) -> Result<SubscriptionId, BrokerError> {
        self.pubsub.subscribe(topic, consumer, max_retries).await
    }

    /// Removes a subscription; the second removal of the same id fails.
    pub async fn unsubscribe(&self, id: SubscriptionId) -> Result<(), BrokerError> {
        self.pubsub.unsubscribe(id).await
    }

    // === Observability & lifecycle ===

    /// Point-in-time statistics: counters plus current store depths.
    pub async fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            enqueued: Stats::get(&self.stats.enqueued),
            processed: Stats::get(&self.stats.processed),
            failed: Stats::get(&self.stats.failed),
            queue_depth: self.queue.depth().await,
            in_flight: self.queue.in_flight_count().await,
            dead_letter_depth: self.queue.dead_letter_depth().await,
            published: Stats::get(&self.stats.published),
            delivered: Stats::get(&self.stats.delivered),
            delivery_failed: Stats::get(&self.stats.delivery_failed),
        }
    }

    /// A receiver of broker lifecycle events published after this call.
    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// The broker's event bus (for wiring log writers or metrics sinks).
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Stops the sweeper and aborts pending pub/sub backoff sleeps.
    ///
    /// Idempotent; safe to call from multiple tasks. Envelopes already in
    /// flight stay in the store; the broker is in-memory, so a shut-down
    /// broker is simply one that no longer recovers timeouts.
    pub async fn shutdown(&self) {
        self.token.cancel();
        if let Some(handle) = self.sweeper.lock().await.take() {
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use crate::pubsub::HandlerFn;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_config() -> BrokerConfig {
        BrokerConfig {
            sweep_interval: Duration::from_millis(100),
            default_visibility: Duration::from_secs(1),
            ..BrokerConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_work_queue_roundtrip_updates_stats() {
        let broker = Broker::new(fast_config());
        let id = broker.enqueue("job").await.unwrap();

        let env = broker.dequeue().await.unwrap();
        assert_eq!(env.id, id);
        assert_eq!(env.body.as_str(), Some("job"));
        broker.ack(id).await.unwrap();

        let stats = broker.stats().await;
        assert_eq!(stats.enqueued, 1);
        assert_eq!(stats.processed, 1);
        assert_eq!(stats.queue_depth, 0);
        assert_eq!(stats.in_flight, 0);
        broker.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_priority_ordering_across_facade() {
        let broker = Broker::new(fast_config());
        let mut ids = Vec::new();
        for priority in [1, 5, 1, 5] {
            ids.push(broker.enqueue_with("m", priority, 3).await.unwrap());
        }
        let got: Vec<_> = [
            broker.dequeue().await.unwrap().id,
            broker.dequeue().await.unwrap().id,
            broker.dequeue().await.unwrap().id,
            broker.dequeue().await.unwrap().id,
        ]
        .to_vec();
        assert_eq!(got, vec![ids[1], ids[3], ids[0], ids[2]]);
        broker.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_unacked_envelope_is_recovered_by_sweeper() {
        let broker = Broker::new(fast_config());
        broker.enqueue("job").await.unwrap();

        // Consumer "crashes": dequeues with 1s visibility and never acks.
        let env = broker.dequeue_with(Duration::from_secs(1)).await.unwrap();
        assert_eq!(env.attempts, 1);

        tokio::time::sleep(Duration::from_millis(1200)).await;

        let again = broker.dequeue().await.unwrap();
        assert_eq!(again.id, env.id);
        assert_eq!(again.attempts, 2);
        broker.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_envelope_terminates() {
        // At-least-once, never zero-once: everything ends Acked or DeadLettered.
        let broker = Broker::new(fast_config());
        for _ in 0..10 {
            broker.enqueue_with("m", 0, 2).await.unwrap();
        }

        // Ack half, nack the rest to exhaustion.
        for i in 0..10 {
            let env = broker.dequeue().await.unwrap();
            if i % 2 == 0 {
                broker.ack(env.id).await.unwrap();
            } else {
                broker.nack(env.id).await.unwrap();
            }
        }
        while let Some(env) = broker.dequeue().await {
            broker.nack(env.id).await.unwrap();
        }

        let stats = broker.stats().await;
        assert_eq!(stats.processed + stats.failed, 10);
        assert_eq!(stats.queue_depth, 0);
        assert_eq!(stats.in_flight, 0);
        broker.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_pubsub_roundtrip_updates_stats() {
        let broker = Broker::new(fast_config());
        let ok_calls = Arc::new(AtomicU32::new(0));
        let ok_in = Arc::clone(&ok_calls);
        broker
            .subscribe(
                "orders",
                HandlerFn::arc("ok", move |_body: Body| {
                    let calls = Arc::clone(&ok_in);
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, HandlerError>(())
                    }
                }),
            )
            .await
            .unwrap();
        broker
            .subscribe_with(
                "orders",
                HandlerFn::arc("broken", |_body: Body| async {
                    Err::<(), _>(HandlerError::fail("down"))
                }),
                2,
            )
            .await
            .unwrap();

        let accepted = broker.publish("orders", "order-1").await.unwrap();
        assert_eq!(accepted, 2);

        tokio::time::sleep(Duration::from_secs(5)).await;

        let stats = broker.stats().await;
        assert_eq!(stats.published, 1);
        assert_eq!(stats.delivered, 1);
        assert_eq!(stats.delivery_failed, 1);
        assert_eq!(ok_calls.load(Ordering::SeqCst), 1);
        broker.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_is_idempotent() {
        let broker = Broker::new(fast_config());
        broker.shutdown().await;
        broker.shutdown().await;
        // The store stays queryable after shutdown.
        assert_eq!(broker.stats().await.queue_depth, 0);
    }
}
