//! # Simple logging receiver for debugging and demos.
//!
//! [`LogWriter`] drains a [`Bus`](super::Bus) receiver and prints events to
//! stdout in a human-readable format. This is primarily useful for
//! development, debugging, and examples.
//!
//! ## Output format
//! ```text
//! [enqueued] id=3 priority=5
//! [dequeued] id=3 attempt=1
//! [nacked] id=3 attempt=1
//! [dead-lettered] id=3 attempt=2
//! [published] topic=orders accepted=2
//! [delivery-retry] topic=orders subscriber=audit attempt=1 delay_ms=200 err="connection refused"
//! [delivery-exhausted] topic=orders subscriber=audit attempt=3 err="connection refused"
//! [sweeper-started]
//! ```

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::bus::Bus;
use super::event::{Event, EventKind};

/// Simple stdout logging receiver.
///
/// Enabled via the `logging` feature. Prints human-readable event lines to
/// stdout for debugging and demonstration purposes.
///
/// Not intended for production use. Subscribe to the bus directly for
/// structured logging or metrics collection.
pub struct LogWriter;

impl LogWriter {
    /// Spawns a background task that prints every bus event until the token
    /// is cancelled.
    pub fn spawn(bus: &Bus, token: CancellationToken) -> JoinHandle<()> {
        let mut rx = bus.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    res = rx.recv() => match res {
                        Ok(ev) => Self::write(&ev),
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            println!("[log-lagged] skipped={n}");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
        })
    }

    fn write(e: &Event) {
        match e.kind {
            EventKind::Enqueued => {
                if let (Some(id), Some(prio)) = (e.id, e.priority) {
                    println!("[enqueued] id={id} priority={prio}");
                }
            }
            EventKind::Dequeued => {
                println!("[dequeued] id={:?} attempt={:?}", e.id, e.attempt);
            }
            EventKind::Acked => {
                println!("[acked] id={:?}", e.id);
            }
            EventKind::Nacked => {
                println!("[nacked] id={:?} attempt={:?}", e.id, e.attempt);
            }
            EventKind::DeadLettered => {
                println!("[dead-lettered] id={:?} attempt={:?}", e.id, e.attempt);
            }
            EventKind::VisibilityExpired => {
                println!("[visibility-expired] id={:?} attempt={:?}", e.id, e.attempt);
            }
            EventKind::Published => {
                println!("[published] topic={:?} accepted={:?}", e.topic, e.attempt);
            }
            EventKind::DeliverySucceeded => {
                println!(
                    "[delivered] topic={:?} subscriber={:?} attempt={:?}",
                    e.topic, e.subscriber, e.attempt
                );
            }
            EventKind::DeliveryRetryScheduled => {
                println!(
                    "[delivery-retry] topic={:?} subscriber={:?} attempt={:?} delay_ms={:?} err={:?}",
                    e.topic, e.subscriber, e.attempt, e.delay_ms, e.reason
                );
            }
            EventKind::DeliveryExhausted => {
                println!(
                    "[delivery-exhausted] topic={:?} subscriber={:?} attempt={:?} err={:?}",
                    e.topic, e.subscriber, e.attempt, e.reason
                );
            }
            EventKind::Subscribed => {
                println!("[subscribed] topic={:?} subscriber={:?}", e.topic, e.subscriber);
            }
            EventKind::Unsubscribed => {
                println!("[unsubscribed] topic={:?} subscriber={:?}", e.topic, e.subscriber);
            }
            EventKind::SweeperStarted => {
                println!("[sweeper-started]");
            }
            EventKind::SweeperStopped => {
                println!("[sweeper-stopped]");
            }
        }
    }
}
