//! # PubSub: topic fanout engine.
//!
//! [`PubSub`] resolves a topic's subscription set at publish time and spawns
//! one independent [`dispatch`](crate::pubsub::dispatch) task per accepted
//! subscription. `publish` returns as soon as fanout has been initiated; it
//! reports the accepted-subscriber count, not final delivery success, which
//! arrives later through statistics and bus events.
//!
//! ## Rules
//! - Snapshot semantics: subscribers registered after a publish never see it.
//! - A subscription whose filter rejects the body gets **no** delivery
//!   attempt and is not counted.
//! - Publishing to a topic with zero subscribers is a no-op fanout, not an
//!   error.
//! - No ordering guarantee exists across subscribers or across topics.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::envelope::Body;
use crate::error::BrokerError;
use crate::events::{Bus, Event, EventKind};
use crate::policies::BackoffPolicy;
use crate::pubsub::consumer::ConsumerRef;
use crate::pubsub::dispatch::{run_delivery, DispatchContext};
use crate::pubsub::registry::{SubscriptionId, TopicRegistry};
use crate::stats::Stats;

/// Fanout engine: publish/subscribe/unsubscribe over the topic table.
pub struct PubSub {
    registry: TopicRegistry,
    backoff: BackoffPolicy,
    stats: Arc<Stats>,
    bus: Bus,
    /// Root token; each dispatch runs under a child so broker shutdown
    /// aborts pending backoff sleeps.
    token: CancellationToken,
}

impl PubSub {
    pub(crate) fn new(
        backoff: BackoffPolicy,
        max_subscribers_per_topic: usize,
        stats: Arc<Stats>,
        bus: Bus,
        token: CancellationToken,
    ) -> Self {
        Self {
            registry: TopicRegistry::new(bus.clone(), max_subscribers_per_topic),
            backoff,
            stats,
            bus,
            token,
        }
    }

    /// Fans a message out to every currently subscribed, accepting consumer.
    ///
    /// Returns the number of subscriptions that accepted the body (their
    /// filter passed); each of those receives an independent delivery attempt
    /// on its own task. Zero subscribers is a valid fanout of count 0.
    pub async fn publish(&self, topic: &str, body: Body) -> Result<usize, BrokerError> {
        let snapshot = self.registry.snapshot(topic).await;
        let accepted: Vec<_> = snapshot
            .into_iter()
            .filter(|sub| sub.consumer().accepts(&body))
            .collect();
        let count = accepted.len();

        Stats::incr(&self.stats.published);
        self.bus.publish(
            Event::new(EventKind::Published)
                .with_topic(topic)
                .with_attempt(count as u32),
        );

        for subscription in accepted {
            let ctx = DispatchContext {
                subscription,
                body: body.clone(),
                backoff: self.backoff,
                stats: Arc::clone(&self.stats),
                bus: self.bus.clone(),
                token: self.token.child_token(),
            };
            tokio::spawn(run_delivery(ctx));
        }
        Ok(count)
    }

    /// Registers a subscription on `topic`, creating the topic if needed.
    pub async fn subscribe(
        &self,
        topic: &str,
        consumer: ConsumerRef,
        max_retries: u32,
    ) -> Result<SubscriptionId, BrokerError> {
        self.registry.subscribe(topic, consumer, max_retries).await
    }

    /// Removes a subscription; see [`TopicRegistry::unsubscribe`].
    pub async fn unsubscribe(&self, id: SubscriptionId) -> Result<(), BrokerError> {
        self.registry.unsubscribe(id).await
    }

    /// Number of subscriptions currently attached to `topic`.
    pub async fn subscription_count(&self, topic: &str) -> usize {
        self.registry.subscription_count(topic).await
    }
}
