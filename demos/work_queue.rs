//! # Example: work_queue
//!
//! Competing-consumer queue with priorities, a nack, and a dead letter.
//!
//! Demonstrates how to:
//! - Enqueue envelopes with explicit priority and retry budget.
//! - Drain the queue in priority-then-FIFO order.
//! - Nack a failing envelope and watch it land in the dead-letter store.
//!
//! Run with: `cargo run --example work_queue`

use std::time::Duration;

use relayq::{Body, Broker, BrokerConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let mut cfg = BrokerConfig::default();
    cfg.sweep_interval = Duration::from_millis(100);
    cfg.default_visibility = Duration::from_millis(500);
    let broker = Broker::new(cfg);

    // max_retries = 1: a single failed attempt dead-letters the envelope.
    broker.enqueue_with(Body::from("daily-report"), 0, 1).await?;
    broker.enqueue_with(Body::from("password-reset"), 10, 1).await?;
    broker.enqueue(Body::from("thumbnail")).await?;

    while let Some(env) = broker.dequeue().await {
        let text = env.body.as_str().unwrap_or("<binary>");
        if text == "daily-report" {
            println!("[consumer] {text}: upstream down, nacking");
            broker.nack(env.id).await?;
        } else {
            println!("[consumer] {text}: done (priority {})", env.priority);
            broker.ack(env.id).await?;
        }
    }

    for dead in broker.drain_dead_letters().await {
        println!(
            "[dlq] {:?} after {} attempt(s)",
            dead.body.as_str().unwrap_or("<binary>"),
            dead.attempts
        );
    }

    let stats = broker.stats().await;
    println!(
        "[stats] enqueued={} processed={} failed={}",
        stats.enqueued, stats.processed, stats.failed
    );

    broker.shutdown().await;
    Ok(())
}
