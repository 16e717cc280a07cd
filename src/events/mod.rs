//! Broker lifecycle events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to observe
//! what the broker is doing: enqueues, dequeues, acknowledgments, visibility
//! expiries, publishes, and per-subscription delivery outcomes.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `WorkQueue`, `Sweeper`, `PubSub` dispatch workers,
//!   `TopicRegistry`.
//! - **Consumers**: anything holding a receiver from [`Bus::subscribe`]:
//!   metrics exporters, audit sinks, or the built-in `LogWriter`
//!   (feature `logging`).
//!
//! The bus is observability plumbing, not a delivery mechanism: losing an
//! event (lagged receiver) never affects broker semantics.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};

#[cfg(feature = "logging")]
mod log;
#[cfg(feature = "logging")]
pub use log::LogWriter;
