//! Error types used by the broker and by subscriber handlers.
//!
//! This module defines two main error enums:
//!
//! - [`BrokerError`]: errors surfaced to callers of the broker API itself.
//! - [`HandlerError`]: errors raised by subscriber handler executions.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging/metrics
//! and additional utilities such as [`HandlerError::is_retryable`].

use thiserror::Error;

use crate::envelope::EnvelopeId;

/// # Errors produced by the broker API.
///
/// These represent misuse of the broker surface (acknowledging unknown
/// envelopes, unsubscribing twice) or producer-side backpressure signals.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BrokerError {
    /// The operation referenced an id that does not exist or is already terminal.
    ///
    /// Double-acking, nacking an acked envelope, or unsubscribing a removed
    /// subscription all indicate a caller bug; the broker surfaces it rather
    /// than silently succeeding.
    #[error("invalid state: {op} on unknown or terminal id {id}")]
    InvalidState {
        /// The operation that was attempted (`"ack"`, `"nack"`, `"unsubscribe"`).
        op: &'static str,
        /// The offending id, rendered for diagnostics.
        id: u64,
    },

    /// A configured capacity bound was hit; the producer should back off.
    #[error("capacity exceeded: {what} is full (limit {limit})")]
    CapacityExceeded {
        /// Which bound was hit (`"ready queue"`, `"topic subscriptions"`).
        what: &'static str,
        /// The configured limit.
        limit: usize,
    },
}

impl BrokerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use relayq::BrokerError;
    ///
    /// let err = BrokerError::CapacityExceeded { what: "ready queue", limit: 8 };
    /// assert_eq!(err.as_label(), "capacity_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            BrokerError::InvalidState { .. } => "invalid_state",
            BrokerError::CapacityExceeded { .. } => "capacity_exceeded",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            BrokerError::InvalidState { op, id } => format!("{op} rejected for id={id}"),
            BrokerError::CapacityExceeded { what, limit } => {
                format!("{what} full, limit={limit}")
            }
        }
    }

    pub(crate) fn invalid_state(op: &'static str, id: EnvelopeId) -> Self {
        BrokerError::InvalidState { op, id: id.get() }
    }
}

/// # Errors produced by subscriber handler execution.
///
/// These represent failures of individual delivery attempts. A [`HandlerError::Fail`]
/// is retried with backoff up to the subscription's retry budget; a
/// [`HandlerError::Fatal`] short-circuits retries for that delivery.
///
/// Handler errors never propagate to the publisher or to sibling subscribers.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum HandlerError {
    /// Delivery attempt failed but may succeed if retried.
    #[error("delivery failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Non-recoverable fatal error (should not be retried).
    #[error("fatal delivery error (no retry): {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },
}

impl HandlerError {
    /// Shorthand for a retryable failure.
    pub fn fail(error: impl Into<String>) -> Self {
        HandlerError::Fail {
            error: error.into(),
        }
    }

    /// Shorthand for a non-retryable failure.
    pub fn fatal(error: impl Into<String>) -> Self {
        HandlerError::Fatal {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            HandlerError::Fail { .. } => "handler_failed",
            HandlerError::Fatal { .. } => "handler_fatal",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            HandlerError::Fail { error } => format!("error: {error}"),
            HandlerError::Fatal { error } => format!("fatal: {error}"),
        }
    }

    /// Indicates whether the error type is safe to retry.
    ///
    /// Returns `true` for [`HandlerError::Fail`], `false` for
    /// [`HandlerError::Fatal`].
    ///
    /// # Example
    /// ```
    /// use relayq::HandlerError;
    ///
    /// assert!(HandlerError::fail("boom").is_retryable());
    /// assert!(!HandlerError::fatal("nope").is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, HandlerError::Fail { .. })
    }
}
