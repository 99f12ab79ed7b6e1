#![forbid(unsafe_code)]

//! The error carried by a failed [`Async`](crate::Async).

use std::any::Any;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use vigil_core::panic_message;

/// Failures raised by vigil itself rather than by a producer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureCause {
    #[error("{0}")]
    Message(String),

    /// A `map` / `flat_map` closure panicked.
    #[error("computation panicked: {message}")]
    Panicked { message: String },
}

/// Why a deferred result failed.
///
/// Cloning shares the same underlying error, so every listener and every
/// derived result sees the identical failure ([`ptr_eq`](Self::ptr_eq)).
#[derive(Clone)]
pub struct Failure {
    error: Arc<dyn Error + Send + Sync + 'static>,
}

impl Failure {
    /// Wrap any error.
    pub fn new<E>(error: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self {
            error: Arc::new(error),
        }
    }

    /// A failure described only by a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(FailureCause::Message(message.into()))
    }

    /// Convert a caught panic payload.
    #[must_use]
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        Self::new(FailureCause::Panicked {
            message: panic_message(payload.as_ref()),
        })
    }

    /// Whether both handles share the same underlying error.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.error, &other.error)
    }

    #[must_use]
    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        self.error.downcast_ref::<E>()
    }

    /// Whether this failure came from a panicking computation.
    #[must_use]
    pub fn is_panic(&self) -> bool {
        matches!(
            self.downcast_ref::<FailureCause>(),
            Some(FailureCause::Panicked { .. })
        )
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Failure").field(&self.error).finish()
    }
}

impl Error for Failure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.error.source()
    }
}

impl From<FailureCause> for Failure {
    fn from(cause: FailureCause) -> Self {
        Self::new(cause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn clones_share_identity() {
        let a = Failure::msg("boom");
        let b = a.clone();
        let c = Failure::msg("boom");
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));
        assert_eq!(a.to_string(), "boom");
    }

    #[test]
    fn downcast_to_wrapped_error() {
        let failure = Failure::new(io::Error::new(io::ErrorKind::NotFound, "gone"));
        let io = failure.downcast_ref::<io::Error>().unwrap();
        assert_eq!(io.kind(), io::ErrorKind::NotFound);
        assert!(failure.downcast_ref::<FailureCause>().is_none());
    }

    #[test]
    fn panic_payload_becomes_panicked_cause() {
        let payload: Box<dyn Any + Send> = Box::new("bad input");
        let failure = Failure::from_panic(payload);
        assert!(failure.is_panic());
        assert_eq!(failure.to_string(), "computation panicked: bad input");
        assert!(!Failure::msg("plain").is_panic());
    }

    #[test]
    fn is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Failure>();
    }
}
