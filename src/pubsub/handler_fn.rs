//! # Function-backed subscriber handler (`HandlerFn`)
//!
//! [`HandlerFn`] wraps a closure `F: Fn(Body) -> Fut`, producing a fresh
//! future per delivery attempt. This avoids shared mutable state; if a
//! handler needs shared state, capture an `Arc<...>` explicitly inside the
//! closure.
//!
//! An optional filter closure implements [`Consume::accepts`], so a
//! subscription's predicate and its handler travel together.
//!
//! ## Example
//! ```rust
//! use relayq::{Body, ConsumerRef, HandlerError, HandlerFn};
//!
//! let h: ConsumerRef = HandlerFn::arc("printer", |body: Body| async move {
//!     println!("{:?}", body);
//!     Ok::<_, HandlerError>(())
//! });
//! assert_eq!(h.name(), "printer");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::envelope::Body;
use crate::error::HandlerError;
use crate::pubsub::consumer::Consume;

/// Filter predicate attached to a [`HandlerFn`].
type FilterFn = Box<dyn Fn(&Body) -> bool + Send + Sync>;

/// Function-backed subscriber handler.
///
/// Wraps a closure that *creates* a new future per delivery attempt.
pub struct HandlerFn<F> {
    name: Cow<'static, str>,
    f: F,
    filter: Option<FilterFn>,
}

impl<F> HandlerFn<F> {
    /// Creates a new function-backed handler.
    ///
    /// Prefer [`HandlerFn::arc`] when you immediately need a [`ConsumerRef`](crate::pubsub::ConsumerRef).
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
            filter: None,
        }
    }

    /// Creates the handler and returns it as a shared handle (`Arc<dyn Consume>`).
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }

    /// Attaches a filter predicate; bodies it rejects are never delivered.
    ///
    /// ## Example
    /// ```rust
    /// use relayq::{Body, HandlerError, HandlerFn};
    ///
    /// let h = HandlerFn::new("evens-only", |_body: Body| async { Ok::<_, HandlerError>(()) })
    ///     .with_filter(|body| body.as_bytes().first().is_some_and(|b| b % 2 == 0));
    /// ```
    pub fn with_filter(mut self, pred: impl Fn(&Body) -> bool + Send + Sync + 'static) -> Self {
        self.filter = Some(Box::new(pred));
        self
    }
}

#[async_trait]
impl<F, Fut> Consume for HandlerFn<F>
where
    F: Fn(Body) -> Fut + Send + Sync + 'static, // Fn, not FnMut
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn deliver(&self, body: &Body) -> Result<(), HandlerError> {
        (self.f)(body.clone()).await
    }

    fn accepts(&self, body: &Body) -> bool {
        match &self.filter {
            Some(pred) => pred(body),
            None => true,
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_closure_is_invoked_per_delivery() {
        let h = HandlerFn::new("echo", |body: Body| async move {
            if body.as_str() == Some("boom") {
                Err(HandlerError::fail("boom"))
            } else {
                Ok(())
            }
        });

        assert!(h.deliver(&Body::from("ok")).await.is_ok());
        assert!(h.deliver(&Body::from("boom")).await.is_err());
    }

    #[tokio::test]
    async fn test_filter_gates_accepts_not_deliver() {
        let h = HandlerFn::new("filtered", |_body: Body| async { Ok::<_, HandlerError>(()) })
            .with_filter(|body| body.as_str() != Some("skip"));

        assert!(h.accepts(&Body::from("take")));
        assert!(!h.accepts(&Body::from("skip")));
        // accepts() is advisory for the engine; deliver still works if called.
        assert!(h.deliver(&Body::from("skip")).await.is_ok());
    }

    #[test]
    fn test_default_name_without_filter() {
        let h = HandlerFn::new("named", |_body: Body| async { Ok::<_, HandlerError>(()) });
        assert_eq!(Consume::name(&h), "named");
        assert!(h.accepts(&Body::from("anything")));
    }
}
