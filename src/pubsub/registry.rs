//! # Topic and subscription table.
//!
//! [`TopicRegistry`] owns the pub/sub half of the envelope store: a map of
//! topic name → subscription list, plus an id index for unsubscribe. It is
//! guarded by its own `RwLock`, separate from the work-queue mutex, so fanout
//! churn never contends with queue throughput.
//!
//! ## Rules
//! - Topics are **namespaces**, not objects with a deletion lifecycle: they
//!   are created implicitly on first publish or subscribe and retained
//!   (possibly empty) for the broker's lifetime.
//! - A subscription holds a non-owning reference to its topic: removing it
//!   does not destroy the topic, and the topic only retains a callable
//!   handle ([`ConsumerRef`]) for dispatch.
//! - Publish-time snapshots: a publish observes the subscription list as it
//!   was at that moment; late subscribers see only later publishes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::BrokerError;
use crate::events::{Bus, Event, EventKind};
use crate::pubsub::consumer::ConsumerRef;

/// Unique identifier of a subscription within one broker instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Returns the raw numeric id.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One registered subscriber on one topic.
///
/// Shared between the registry and any dispatch tasks currently delivering
/// to it; removal from the registry does not interrupt dispatches already
/// holding the `Arc`.
pub struct Subscription {
    id: SubscriptionId,
    topic: Arc<str>,
    consumer: ConsumerRef,
    max_retries: u32,
    /// Failed delivery attempts accumulated over the subscription's lifetime.
    failures: AtomicU64,
}

impl Subscription {
    /// The subscription's handle, as returned by subscribe.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// The topic this subscription is attached to.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub(crate) fn topic_arc(&self) -> Arc<str> {
        Arc::clone(&self.topic)
    }

    /// The subscriber's handler.
    pub fn consumer(&self) -> &ConsumerRef {
        &self.consumer
    }

    /// Per-delivery attempt budget.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Failed delivery attempts accumulated so far.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub(crate) fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Default)]
struct TopicTable {
    /// Topic name → subscriptions, in subscribe order.
    topics: HashMap<Arc<str>, Vec<Arc<Subscription>>>,
    /// Subscription id → owning topic, for unsubscribe.
    index: HashMap<SubscriptionId, Arc<str>>,
}

/// Concurrent topic/subscription table.
pub struct TopicRegistry {
    table: RwLock<TopicTable>,
    next_id: AtomicU64,
    bus: Bus,
    /// Per-topic subscription bound; 0 = unbounded.
    max_subscribers: usize,
}

impl TopicRegistry {
    pub(crate) fn new(bus: Bus, max_subscribers: usize) -> Self {
        Self {
            table: RwLock::new(TopicTable::default()),
            next_id: AtomicU64::new(0),
            bus,
            max_subscribers,
        }
    }

    /// Registers a subscription, creating the topic entry if needed.
    ///
    /// # Errors
    /// [`BrokerError::CapacityExceeded`] when the per-topic bound is hit.
    pub async fn subscribe(
        &self,
        topic: &str,
        consumer: ConsumerRef,
        max_retries: u32,
    ) -> Result<SubscriptionId, BrokerError> {
        let mut table = self.table.write().await;
        let name: Arc<str> = Arc::from(topic);
        let subs = table.topics.entry(Arc::clone(&name)).or_default();
        if self.max_subscribers > 0 && subs.len() >= self.max_subscribers {
            return Err(BrokerError::CapacityExceeded {
                what: "topic subscriptions",
                limit: self.max_subscribers,
            });
        }

        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let sub = Arc::new(Subscription {
            id,
            topic: Arc::clone(&name),
            consumer,
            max_retries,
            failures: AtomicU64::new(0),
        });
        let subscriber: Arc<str> = Arc::from(sub.consumer.name());
        subs.push(sub);
        table.index.insert(id, name.clone());
        drop(table);

        self.bus.publish(
            Event::new(EventKind::Subscribed)
                .with_topic(name)
                .with_subscriber(subscriber),
        );
        Ok(id)
    }

    /// Removes a subscription from its topic.
    ///
    /// The (possibly now empty) topic entry is retained for reuse. A second
    /// unsubscribe of the same id is a caller bug and surfaces as
    /// [`BrokerError::InvalidState`].
    pub async fn unsubscribe(&self, id: SubscriptionId) -> Result<(), BrokerError> {
        let mut table = self.table.write().await;
        let topic = table.index.remove(&id).ok_or(BrokerError::InvalidState {
            op: "unsubscribe",
            id: id.get(),
        })?;

        let mut subscriber: Option<Arc<str>> = None;
        if let Some(subs) = table.topics.get_mut(&topic) {
            if let Some(pos) = subs.iter().position(|s| s.id == id) {
                let sub = subs.remove(pos);
                subscriber = Some(Arc::from(sub.consumer.name()));
            }
        }
        drop(table);

        let mut ev = Event::new(EventKind::Unsubscribed).with_topic(topic);
        if let Some(name) = subscriber {
            ev = ev.with_subscriber(name);
        }
        self.bus.publish(ev);
        Ok(())
    }

    /// Snapshot of a topic's current subscriptions, creating the (empty)
    /// topic entry on first reference.
    pub async fn snapshot(&self, topic: &str) -> Vec<Arc<Subscription>> {
        {
            let table = self.table.read().await;
            if let Some(subs) = table.topics.get(topic) {
                return subs.clone();
            }
        }
        // First reference to this topic: create the namespace.
        let mut table = self.table.write().await;
        table.topics.entry(Arc::from(topic)).or_default().clone()
    }

    /// Number of subscriptions currently attached to `topic`.
    pub async fn subscription_count(&self, topic: &str) -> usize {
        self.table
            .read()
            .await
            .topics
            .get(topic)
            .map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::Body;
    use crate::pubsub::HandlerFn;

    fn noop() -> ConsumerRef {
        HandlerFn::arc("noop", |_body: Body| async { Ok::<_, crate::error::HandlerError>(()) })
    }

    fn registry() -> TopicRegistry {
        TopicRegistry::new(Bus::new(64), 0)
    }

    #[tokio::test]
    async fn test_subscribe_creates_topic_implicitly() {
        let reg = registry();
        assert_eq!(reg.subscription_count("orders").await, 0);
        reg.subscribe("orders", noop(), 3).await.unwrap();
        assert_eq!(reg.subscription_count("orders").await, 1);
    }

    #[tokio::test]
    async fn test_unsubscribe_retains_empty_topic() {
        let reg = registry();
        let id = reg.subscribe("orders", noop(), 3).await.unwrap();
        reg.unsubscribe(id).await.unwrap();

        assert_eq!(reg.subscription_count("orders").await, 0);
        // The namespace survives and is immediately reusable.
        let table = reg.table.read().await;
        assert!(table.topics.contains_key("orders"));
    }

    #[tokio::test]
    async fn test_unsubscribe_twice_is_invalid_state() {
        let reg = registry();
        let id = reg.subscribe("orders", noop(), 3).await.unwrap();
        reg.unsubscribe(id).await.unwrap();

        let err = reg.unsubscribe(id).await.unwrap_err();
        assert!(matches!(
            err,
            BrokerError::InvalidState {
                op: "unsubscribe",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_snapshot_is_publish_time_view() {
        let reg = registry();
        reg.subscribe("orders", noop(), 3).await.unwrap();
        let snap = reg.snapshot("orders").await;
        assert_eq!(snap.len(), 1);

        reg.subscribe("orders", noop(), 3).await.unwrap();
        // The earlier snapshot does not grow retroactively.
        assert_eq!(snap.len(), 1);
        assert_eq!(reg.snapshot("orders").await.len(), 2);
    }

    #[tokio::test]
    async fn test_snapshot_creates_empty_topic() {
        let reg = registry();
        assert!(reg.snapshot("new-topic").await.is_empty());
        let table = reg.table.read().await;
        assert!(table.topics.contains_key("new-topic"));
    }

    #[tokio::test]
    async fn test_per_topic_capacity_bound() {
        let reg = TopicRegistry::new(Bus::new(8), 1);
        reg.subscribe("t", noop(), 3).await.unwrap();
        let err = reg.subscribe("t", noop(), 3).await.unwrap_err();
        assert_eq!(err.as_label(), "capacity_exceeded");
        // Other topics are unaffected.
        assert!(reg.subscribe("u", noop(), 3).await.is_ok());
    }

    #[tokio::test]
    async fn test_ids_are_unique_across_topics() {
        let reg = registry();
        let a = reg.subscribe("t", noop(), 3).await.unwrap();
        let b = reg.subscribe("u", noop(), 3).await.unwrap();
        assert_ne!(a, b);
    }
}
