//! # Example: pubsub_retry
//!
//! Topic fanout with a flaky subscriber that recovers after two failures.
//!
//! Demonstrates how to:
//! - Subscribe handlers to a topic, one with a filter predicate.
//! - Configure exponential backoff for delivery retries.
//! - Observe delivery lifecycle events from the broadcast bus.
//!
//! Run with: `cargo run --example pubsub_retry`

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use relayq::{BackoffPolicy, Body, Broker, BrokerConfig, HandlerError, HandlerFn};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let mut cfg = BrokerConfig::default();
    cfg.backoff = BackoffPolicy {
        first: Duration::from_millis(50),
        ..BackoffPolicy::default()
    };
    let broker = Broker::new(cfg);
    let mut events = broker.subscribe_events();

    // Fails twice, then succeeds. Retries are driven by the backoff policy.
    let calls = Arc::new(AtomicU32::new(0));
    let mailer = {
        let calls = calls.clone();
        HandlerFn::arc("mailer", move |body: Body| {
            let calls = calls.clone();
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    return Err(HandlerError::fail("smtp unavailable"));
                }
                println!("[mailer] sent {:?}", body.as_str());
                Ok(())
            }
        })
    };
    broker.subscribe_with("orders", mailer, 5).await?;

    // Only sees bodies that pass its filter.
    let vip = Arc::new(
        HandlerFn::new("vip-alerts", |body: Body| async move {
            println!("[vip-alerts] {:?}", body.as_str());
            Ok::<_, HandlerError>(())
        })
        .with_filter(|body| body.as_str().is_some_and(|s| s.contains("vip"))),
    );
    broker.subscribe("orders", vip).await?;

    let accepted = broker.publish("orders", Body::from("order-7")).await?;
    println!("[publish] accepted by {accepted} subscriber(s)");
    let accepted = broker.publish("orders", Body::from("vip order-8")).await?;
    println!("[publish] accepted by {accepted} subscriber(s)");

    // Watch the retry storm settle.
    tokio::time::sleep(Duration::from_secs(1)).await;
    while let Ok(ev) = events.try_recv() {
        println!("[event] seq={} kind={:?}", ev.seq, ev.kind);
    }

    broker.shutdown().await;
    Ok(())
}
