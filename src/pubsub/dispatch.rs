//! # Per-subscription delivery loop.
//!
//! One [`run_delivery`] invocation is one independent unit of concurrent
//! execution: the fanout in [`PubSub::publish`](crate::pubsub::PubSub::publish)
//! spawns one per accepted subscription, so a failing or slow subscriber only
//! ever delays its own copy.
//!
//! ## Attempt flow
//! ```text
//! loop {
//!   ├─► attempt += 1
//!   ├─► deliver() (panics caught at this boundary)
//!   │     ├─ Ok                        → DeliverySucceeded, done
//!   │     ├─ Err(Fatal)                → DeliveryExhausted, done
//!   │     └─ Err(Fail)
//!   │          ├─ attempt >= budget    → DeliveryExhausted, done
//!   │          └─ else → DeliveryRetryScheduled → sleep(backoff) → continue
//!   └─ exit: broker token cancelled (shutdown aborts the sleep)
//! }
//! ```
//!
//! ## Rules
//! - Attempts run **sequentially** within one dispatch (never parallel).
//! - A panic in the handler is converted to a retryable failure; it never
//!   unwinds into the broker or siblings.
//! - Exhaustion is recorded (stats + event + the subscription's failure
//!   counter) but never surfaced to the publisher.

use std::sync::Arc;

use futures::FutureExt;
use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::envelope::Body;
use crate::error::HandlerError;
use crate::events::{Bus, Event, EventKind};
use crate::policies::BackoffPolicy;
use crate::pubsub::consumer::ConsumerRef;
use crate::pubsub::registry::Subscription;
use crate::stats::Stats;

/// Everything one dispatch task needs, bundled at fanout time.
pub(crate) struct DispatchContext {
    pub subscription: Arc<Subscription>,
    pub body: Body,
    pub backoff: BackoffPolicy,
    pub stats: Arc<Stats>,
    pub bus: Bus,
    pub token: CancellationToken,
}

/// Drives one delivery to completion, exhaustion, or broker shutdown.
pub(crate) async fn run_delivery(ctx: DispatchContext) {
    let sub = &ctx.subscription;
    let topic = sub.topic_arc();
    let name: Arc<str> = Arc::from(sub.consumer().name());
    let budget = sub.max_retries().max(1); // every dispatch gets at least one attempt
    let mut attempt: u32 = 0;

    loop {
        if ctx.token.is_cancelled() {
            return;
        }
        attempt += 1;

        match attempt_once(sub.consumer(), &ctx.body).await {
            Ok(()) => {
                Stats::incr(&ctx.stats.delivered);
                ctx.bus.publish(
                    Event::new(EventKind::DeliverySucceeded)
                        .with_topic(topic)
                        .with_subscriber(name)
                        .with_attempt(attempt),
                );
                return;
            }
            Err(e) => {
                sub.record_failure();

                if !e.is_retryable() || attempt >= budget {
                    Stats::incr(&ctx.stats.delivery_failed);
                    ctx.bus.publish(
                        Event::new(EventKind::DeliveryExhausted)
                            .with_topic(topic)
                            .with_subscriber(name)
                            .with_attempt(attempt)
                            .with_reason(e.as_message()),
                    );
                    return;
                }

                let delay = ctx.backoff.next(attempt - 1);
                ctx.bus.publish(
                    Event::new(EventKind::DeliveryRetryScheduled)
                        .with_topic(Arc::clone(&topic))
                        .with_subscriber(Arc::clone(&name))
                        .with_attempt(attempt)
                        .with_delay(delay)
                        .with_reason(e.as_message()),
                );

                let sleep = time::sleep(delay);
                tokio::pin!(sleep);
                select! {
                    _ = &mut sleep => {}
                    _ = ctx.token.cancelled() => return,
                }
            }
        }
    }
}

/// Runs one handler attempt with panic isolation.
///
/// `AssertUnwindSafe` is acceptable here for the same reason it is in any
/// fanout worker: a panicking handler forfeits its own delivery, and the
/// broker shares no mutable state with it.
async fn attempt_once(consumer: &ConsumerRef, body: &Body) -> Result<(), HandlerError> {
    let fut = consumer.deliver(body);
    match std::panic::AssertUnwindSafe(fut).catch_unwind().await {
        Ok(res) => res,
        Err(panic_err) => {
            let info = {
                let any = &*panic_err;
                if let Some(msg) = any.downcast_ref::<&'static str>() {
                    (*msg).to_string()
                } else if let Some(msg) = any.downcast_ref::<String>() {
                    msg.clone()
                } else {
                    "unknown panic".to_string()
                }
            };
            Err(HandlerError::fail(format!("handler panicked: {info}")))
        }
    }
}
