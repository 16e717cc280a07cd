//! # Opaque message payload.
//!
//! [`Body`] is the unit of content carried by envelopes and published messages.
//! The broker never inspects it; filters and handlers receive it by reference.
//!
//! Internally the payload is an `Arc<[u8]>`, so cloning a body (fanout produces
//! one clone per matching subscriber) never copies the bytes. Large payloads
//! are the caller's responsibility to externalize (store-by-reference) before
//! enqueueing or publishing.

use std::fmt;
use std::sync::Arc;

/// Opaque, cheaply clonable message payload.
///
/// ### Properties
/// - **Opaque**: the broker treats the bytes as a black box.
/// - **Cheap clone**: `Arc`-backed; fanout copies share the allocation.
/// - **Immutable**: the payload cannot change after construction.
#[derive(Clone, PartialEq, Eq)]
pub struct Body(Arc<[u8]>);

impl Body {
    /// Creates a body from raw bytes.
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self(bytes.into())
    }

    /// Returns the payload bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the payload as UTF-8 text, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    /// Returns the payload length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Body {
    fn from(s: &str) -> Self {
        Self(Arc::from(s.as_bytes()))
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Self(Arc::from(s.into_bytes().into_boxed_slice()))
    }
}

impl From<Vec<u8>> for Body {
    fn from(v: Vec<u8>) -> Self {
        Self(Arc::from(v.into_boxed_slice()))
    }
}

impl From<&[u8]> for Body {
    fn from(b: &[u8]) -> Self {
        Self(Arc::from(b))
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(s) => write!(f, "Body({s:?})"),
            None => write!(f, "Body({} bytes)", self.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_roundtrip() {
        let body = Body::from("hello");
        assert_eq!(body.as_str(), Some("hello"));
        assert_eq!(body.as_bytes(), b"hello");
        assert_eq!(body.len(), 5);
    }

    #[test]
    fn test_clone_shares_allocation() {
        let body = Body::from(vec![1u8, 2, 3]);
        let copy = body.clone();
        assert_eq!(body, copy);
        assert!(std::ptr::eq(body.as_bytes(), copy.as_bytes()));
    }

    #[test]
    fn test_non_utf8_has_no_str_view() {
        let body = Body::from(vec![0xffu8, 0xfe]);
        assert!(body.as_str().is_none());
        assert!(!body.is_empty());
    }
}
