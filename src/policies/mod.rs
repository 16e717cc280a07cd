//! Retry delay policies for pub/sub redelivery.
//!
//! This module groups the knobs that control **how long** a dispatch worker
//! waits between delivery attempts to a failing subscriber.
//!
//! ## Contents
//! - [`BackoffPolicy`] how retry delays evolve (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization strategy to avoid thundering herd
//!
//! ## Quick wiring
//! ```text
//! BrokerConfig { backoff: BackoffPolicy, .. }
//!      └─► pubsub::dispatch uses backoff.next(attempt - 1)
//!          to schedule the delay before attempt + 1
//! ```
//!
//! ## Defaults
//! - `BackoffPolicy::default()` → first=100ms, factor=2.0, max=30s, jitter=None.
//! - `JitterPolicy::None` by default; consider `Equal` for balanced randomness
//!   when many subscriptions share a failing downstream.

mod backoff;
mod jitter;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
