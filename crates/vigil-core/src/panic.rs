#![forbid(unsafe_code)]

//! Capturing handler panics during a fire pass.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use thiserror::Error;

/// Best-effort human readable text for a panic payload.
#[must_use]
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// The first panic raised by a handler during one fire pass.
///
/// Sibling handlers still ran. Further panics in the same pass are counted in
/// [`suppressed()`](Self::suppressed) and reported through `tracing`.
#[derive(Debug, Error)]
#[error("listener panicked: {message} ({suppressed} further panics in the same pass)")]
pub struct ListenerPanic {
    message: String,
    suppressed: usize,
    payload: Box<dyn Any + Send>,
}

impl ListenerPanic {
    pub(crate) fn new(payload: Box<dyn Any + Send>) -> Self {
        Self {
            message: panic_message(payload.as_ref()),
            suppressed: 0,
            payload,
        }
    }

    /// Text of the first panic.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Number of later panics in the same pass.
    #[must_use]
    pub fn suppressed(&self) -> usize {
        self.suppressed
    }

    /// The original payload, e.g. for `downcast`.
    #[must_use]
    pub fn into_payload(self) -> Box<dyn Any + Send> {
        self.payload
    }

    /// Continue unwinding with the original payload.
    pub fn resume(self) -> ! {
        panic::resume_unwind(self.payload)
    }
}

/// Accumulates handler panics across one pass: keeps the first, logs the rest.
#[derive(Debug, Default)]
pub(crate) struct PanicSlot {
    first: Option<ListenerPanic>,
}

impl PanicSlot {
    pub(crate) fn run(&mut self, f: impl FnOnce()) {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
            match self.first.as_mut() {
                None => self.first = Some(ListenerPanic::new(payload)),
                Some(first) => {
                    first.suppressed += 1;
                    tracing::warn!(
                        message = %panic_message(payload.as_ref()),
                        suppressed = first.suppressed,
                        "additional listener panic in fire pass"
                    );
                }
            }
        }
    }

    pub(crate) fn finish(self) -> Result<(), ListenerPanic> {
        match self.first {
            Some(panic) => Err(panic),
            None => Ok(()),
        }
    }
}
