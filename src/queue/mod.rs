//! Work queue: competing-consumer delivery with visibility timeouts.
//!
//! This module implements the queue half of the broker:
//! - [`store`](self): `QueueState`, the envelope store (ready priority
//!   buckets, in-flight map, dead-letter store) as plain data operations
//! - [`WorkQueue`]: enqueue/dequeue/ack/nack over one exclusive lock
//! - [`Sweeper`]: background expiry of unacknowledged in-flight envelopes
//!
//! ## Wiring
//! ```text
//! producers ──enqueue──► WorkQueue ──dequeue──► consumers
//!                           │   ▲
//!                  sweep_expired │ ack / nack
//!                           │   │
//!                        Sweeper (interval tick, cancellable)
//! ```
//!
//! The ready queue, in-flight map, and dead-letter store live behind a single
//! mutex: dequeue, ack, nack, and sweep all touch at least two of the three,
//! and the ack-vs-expiry race is resolved by that lock rather than by timing.

mod engine;
mod store;
mod sweeper;

pub use engine::WorkQueue;
pub use sweeper::Sweeper;
