//! Data model for messages travelling through the broker.
//!
//! - [`Body`]: opaque, cheaply clonable payload shared between fanout copies.
//! - [`Envelope`]: the work-queue unit, carrying priority and retry metadata.
//! - [`EnvelopeId`] / [`EnvelopeState`]: identity and lifecycle state.

mod body;
#[allow(clippy::module_inception)]
mod envelope;

pub use body::Body;
pub use envelope::{Envelope, EnvelopeId, EnvelopeState};
