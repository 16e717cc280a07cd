//! # Broker configuration.
//!
//! [`BrokerConfig`] defines the broker's behavior: sweeper cadence, default
//! visibility timeout, retry budgets, capacity bounds, event bus capacity,
//! and redelivery backoff.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use relayq::{BackoffPolicy, BrokerConfig};
//!
//! let mut cfg = BrokerConfig::default();
//! cfg.sweep_interval = Duration::from_millis(500);
//! cfg.default_visibility = Duration::from_secs(30);
//! cfg.max_depth = 10_000;
//! cfg.backoff = BackoffPolicy::default();
//!
//! assert_eq!(cfg.max_depth, 10_000);
//! ```

use std::time::Duration;

use crate::policies::BackoffPolicy;

/// Global configuration for a broker instance.
///
/// Controls sweeper cadence, visibility, retry budgets, capacity bounds,
/// and redelivery backoff.
#[derive(Clone, Debug)]
pub struct BrokerConfig {
    /// How often the sweeper scans for expired in-flight envelopes.
    pub sweep_interval: Duration,
    /// Visibility timeout used by [`Broker::dequeue`](crate::Broker::dequeue).
    pub default_visibility: Duration,
    /// Retry budget used when enqueue/subscribe callers don't specify one.
    pub default_max_retries: u32,
    /// Maximum ready + in-flight envelopes (0 = unbounded).
    pub max_depth: usize,
    /// Maximum subscriptions per topic (0 = unbounded).
    pub max_subscribers_per_topic: usize,
    /// Capacity of the lifecycle event bus channel.
    pub bus_capacity: usize,
    /// Backoff policy for pub/sub redelivery.
    pub backoff: BackoffPolicy,
}

impl Default for BrokerConfig {
    /// Provides a default configuration:
    /// - `sweep_interval = 1s`
    /// - `default_visibility = 30s`
    /// - `default_max_retries = 3`
    /// - `max_depth = 0` (unbounded)
    /// - `max_subscribers_per_topic = 0` (unbounded)
    /// - `bus_capacity = 1024`
    /// - `backoff = BackoffPolicy::default()`
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(1),
            default_visibility: Duration::from_secs(30),
            default_max_retries: 3,
            max_depth: 0,
            max_subscribers_per_topic: 0,
            bus_capacity: 1024,
            backoff: BackoffPolicy::default(),
        }
    }
}
