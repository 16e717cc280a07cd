//! # Core subscriber trait
//!
//! [`Consume`] is the extension point for plugging subscriber handlers into
//! the broker. Each accepted delivery is driven by a dedicated dispatch task
//! owned by the [`PubSub`](crate::pubsub::PubSub) engine.
//!
//! ## Contract
//! - Implementations may be slow (I/O, batching); they do **not** block the
//!   publisher nor sibling subscribers.
//! - [`Consume::accepts`] is the filter predicate: return `false` and the
//!   broker never constructs a delivery attempt for that body.
//! - Failed deliveries are retried with backoff up to the subscription's
//!   retry budget; handlers should therefore be **idempotent**.
//! - Panics inside [`Consume::deliver`] are caught at the dispatch boundary
//!   and treated as retryable failures.
//!
//! ## Example (skeleton)
//! ```rust
//! use async_trait::async_trait;
//! use relayq::{Body, Consume, HandlerError};
//!
//! struct Audit;
//!
//! #[async_trait]
//! impl Consume for Audit {
//!     async fn deliver(&self, body: &Body) -> Result<(), HandlerError> {
//!         // write audit record...
//!         let _ = body;
//!         Ok(())
//!     }
//!     fn name(&self) -> &str { "audit" }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::envelope::Body;
use crate::error::HandlerError;

/// Shared handle to a subscriber handler.
pub type ConsumerRef = Arc<dyn Consume>;

/// Contract for subscriber handlers.
///
/// Called from a per-delivery dispatch task. Implementations should avoid
/// blocking the async runtime (prefer async I/O and cooperative waits).
#[async_trait]
pub trait Consume: Send + Sync + 'static {
    /// Handles one delivery attempt for this subscriber.
    ///
    /// Returning [`HandlerError::Fail`] schedules a retry (with backoff)
    /// until the subscription's budget is spent; [`HandlerError::Fatal`]
    /// stops retries immediately.
    async fn deliver(&self, body: &Body) -> Result<(), HandlerError>;

    /// Filter predicate: whether this subscriber wants the body at all.
    ///
    /// Bodies rejected here never produce a delivery attempt. Defaults to
    /// accepting everything.
    fn accepts(&self, _body: &Body) -> bool {
        true
    }

    /// Human-readable name (for logs/metrics).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
