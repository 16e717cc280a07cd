//! # relayq
//!
//! **Relayq** is a lightweight in-process message broker for Rust.
//!
//! It provides two delivery modes over one store: a priority **work queue**
//! with competing consumers, visibility timeouts, and dead-lettering, and
//! topic-based **pub/sub** fanout with per-subscription retry. The crate is
//! designed as a building block for background job systems and in-process
//! event pipelines.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   producer   │   │   producer   │   │  publisher   │
//!     │ (enqueue)    │   │ (enqueue)    │   │ (publish)    │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────┐ ┌───────────────────────────────────┐
//! │  WorkQueue                        │ │  PubSub                           │
//! │  - ready: priority tiers (FIFO    │ │  - TopicRegistry (subscriptions   │
//! │    within a tier)                 │ │    by topic, filter predicates)   │
//! │  - in-flight: visibility deadline │ │  - one dispatch task per accepted │
//! │    per envelope                   │ │    subscription per publish       │
//! │  - dead-letter store              │ │  - backoff + retry per delivery   │
//! └──────┬───────────────┬────────────┘ └──────────────┬────────────────────┘
//!        ▼               ▼                             ▼
//!   ┌──────────┐   ┌──────────────┐          ┌──────────────────┐
//!   │ consumer │   │   Sweeper    │          │  dispatch task   │
//!   │ dequeue/ │   │ (redelivers  │          │  (retry loop,    │
//!   │ ack/nack │   │  expired     │          │   panic caught)  │
//!   └────┬─────┘   │  envelopes)  │          └────────┬─────────┘
//!        │         └──────┬───────┘                   │
//!        │ Publishes      │ Publishes                 │ Publishes
//!        │ Events:        │ Events:                   │ Events:
//!        │ - Enqueued     │ - VisibilityExpired       │ - DeliverySucceeded
//!        │ - Acked        │ - DeadLettered            │ - DeliveryRetrySched.
//!        │ - Nacked       │ - SweeperStarted          │ - DeliveryExhausted
//!        ▼                ▼                           ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! │                 (capacity: BrokerConfig::bus_capacity)            │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ### Envelope lifecycle
//! ```text
//! enqueue ──► Ready (priority tier, FIFO within tier)
//!
//! dequeue:
//!   ├─► attempts += 1
//!   ├─► InFlight with deadline = now + visibility
//!   └─► caller must ack or nack before the deadline
//!
//! ack  ──► Acked (terminal; envelope dropped)
//!
//! nack / visibility expiry:
//!   ├─ attempts < max_retries ──► front of its priority tier (Ready)
//!   └─ attempts >= max_retries ─► DeadLettered (terminal; inspect via
//!                                 drain_dead_letters)
//! ```
//!
//! ## Features
//! | Area              | Description                                                           | Key types / traits                      |
//! |-------------------|-----------------------------------------------------------------------|-----------------------------------------|
//! | **Work queue**    | Competing consumers, priority-then-FIFO, visibility timeouts, DLQ.    | [`Broker`], [`Envelope`]                |
//! | **Pub/sub**       | Topic fanout, per-subscription retry, filter predicates.              | [`Consume`], [`HandlerFn`]              |
//! | **Policies**      | Exponential backoff with optional jitter for delivery retries.        | [`BackoffPolicy`], [`JitterPolicy`]     |
//! | **Events**        | Broadcast lifecycle events for logging/metrics.                       | [`Bus`], [`Event`], [`EventKind`]       |
//! | **Errors**        | Typed errors for broker operations and handler outcomes.              | [`BrokerError`], [`HandlerError`]       |
//! | **Configuration** | Centralize runtime settings.                                          | [`BrokerConfig`]                        |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use relayq::{Body, Broker, BrokerConfig, HandlerError, HandlerFn};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let broker = Broker::new(BrokerConfig::default());
//!
//!     // Work queue: one consumer wins each envelope.
//!     broker.enqueue_with(Body::from("resize-image"), 5, 3).await?;
//!     broker.enqueue(Body::from("send-email")).await?;
//!     while let Some(env) = broker.dequeue().await {
//!         println!("processing {:?}", env.body);
//!         broker.ack(env.id).await?;
//!     }
//!
//!     // Pub/sub: every matching subscription gets its own copy.
//!     broker
//!         .subscribe(
//!             "orders",
//!             HandlerFn::arc("audit", |body: Body| async move {
//!                 println!("audit: {body:?}");
//!                 Ok::<_, HandlerError>(())
//!             }),
//!         )
//!         .await?;
//!     let accepted = broker.publish("orders", Body::from("order-7")).await?;
//!     assert_eq!(accepted, 1);
//!
//!     broker.shutdown().await;
//!     Ok(())
//! }
//! ```
mod broker;
mod config;
mod envelope;
mod error;
mod events;
mod policies;
mod pubsub;
mod queue;
mod stats;

// ---- Public re-exports ----

pub use broker::Broker;
pub use config::BrokerConfig;
pub use envelope::{Body, Envelope, EnvelopeId, EnvelopeState};
pub use error::{BrokerError, HandlerError};
pub use events::{Bus, Event, EventKind};
pub use policies::{BackoffPolicy, JitterPolicy};
pub use pubsub::{Consume, ConsumerRef, HandlerFn, SubscriptionId};
pub use stats::StatsSnapshot;

// Optional: expose a simple built-in stdout logger (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use events::LogWriter;
