//! Pub/sub: topic-based fanout with per-subscription retry.
//!
//! This module implements the fanout half of the broker:
//! - [`Consume`] / [`ConsumerRef`]: the handler capability a subscriber
//!   plugs in (optional filter + async delivery)
//! - [`HandlerFn`]: closure-backed [`Consume`] implementation
//! - [`TopicRegistry`], [`Subscription`], [`SubscriptionId`]: the
//!   topic/subscription table
//! - [`PubSub`]: publish fanout, one independent dispatch per accepted
//!   subscription
//!
//! ## Wiring
//! ```text
//! publish(topic, body)
//!     │  snapshot subscriptions, filter by accepts()
//!     ├──► spawn dispatch(sub 1) ──► deliver / retry with backoff
//!     ├──► spawn dispatch(sub 2) ──► deliver / retry with backoff
//!     └──► spawn dispatch(sub N) ──► deliver / retry with backoff
//! ```
//!
//! Dispatches are independent: one subscriber failing, stalling, or panicking
//! never blocks delivery to its siblings or fails the publisher. The work
//! queue is "exactly one of N consumers gets it"; pub/sub is "every matching
//! subscriber gets an independent attempt".

mod consumer;
mod dispatch;
mod engine;
mod handler_fn;
mod registry;

pub use consumer::{Consume, ConsumerRef};
pub use engine::PubSub;
pub use handler_fn::HandlerFn;
pub use registry::{Subscription, SubscriptionId, TopicRegistry};
