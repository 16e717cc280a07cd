//! # Sweeper: background expiry of unacknowledged in-flight envelopes.
//!
//! The [`Sweeper`] is the broker's failure-recovery mechanism for the work
//! queue: a consumer that crashed (or stalled) between dequeue and ack will
//! never acknowledge, so the sweeper periodically requeues every in-flight
//! envelope whose visibility deadline elapsed, the at-least-once choice of
//! redelivery over silent loss.
//!
//! ## Loop shape
//! ```text
//! loop {
//!   select! {
//!     _ = token.cancelled() => break,
//!     _ = interval.tick()   => queue.sweep_expired(now),
//!   }
//! }
//! ```
//!
//! Each sweep takes the same lock as dequeue/ack/nack, so an ack arriving
//! concurrently with a tick is ordered by the lock, never by timing.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::events::{Bus, Event, EventKind};
use crate::queue::WorkQueue;

/// Periodic visibility-timeout sweeper for one [`WorkQueue`].
pub struct Sweeper {
    queue: Arc<WorkQueue>,
    interval: Duration,
    bus: Bus,
}

impl Sweeper {
    pub(crate) fn new(queue: Arc<WorkQueue>, interval: Duration, bus: Bus) -> Self {
        Self {
            queue,
            interval,
            bus,
        }
    }

    /// Spawns the sweep loop; it runs until `token` is cancelled.
    ///
    /// The first tick fires after one full interval (not immediately), so a
    /// freshly dequeued envelope is never swept before its timeout can
    /// possibly elapse.
    pub fn spawn(self, token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            self.bus.publish(Event::new(EventKind::SweeperStarted));
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        self.queue.sweep_expired(Instant::now()).await;
                    }
                }
            }
            self.bus.publish(Event::new(EventKind::SweeperStopped));
        })
    }
}
