#![forbid(unsafe_code)]

//! Single-assignment deferred results.
//!
//! # Design
//!
//! An [`Async<T>`] is a cloneable handle to shared state: the outcome slot
//! (`None` while pending) and one registry of outcome listeners. Success,
//! failure and result handlers are all entries in that single registry,
//! filtered by the outcome they care about. The outcome is stored as
//! `Rc<Result<T, Failure>>` so that `flat_map` can forward an inner result
//! without cloning the value.
//!
//! Every handler is one-shot (`FnOnce`). A handler attached after completion
//! runs immediately, inside the attach call.
//!
//! # Invariants
//!
//! 1. The outcome is written at most once; afterwards it never changes.
//! 2. Every handler attached before completion runs exactly once, in
//!    attachment order, during the completing call.
//! 3. After the completing fire pass the registry is cleared, so completed
//!    results retain no handlers and outstanding registrations are no-ops.
//! 4. Combinators always return a new instance and never complete their
//!    inputs.
//!
//! # Failure Modes
//!
//! - **Double completion**: `try_succeed` / `try_fail` hand the rejected value
//!   back in [`AlreadyCompleted`]; `succeed` / `fail` panic.
//! - **Handler panics**: remaining handlers still run, then the first panic
//!   resumes on the completing caller.
//! - **Mapping closure panics**: captured; the derived result fails with
//!   [`Failure::from_panic`].
//! - **Failure never observed**: a failed result dropped before any failure
//!   handler saw it logs a `warn!`.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use thiserror::Error;
use vigil_core::{Listeners, Registration, next_object_id};

use crate::failure::Failure;

type Outcome<T> = Rc<Result<T, Failure>>;

/// Coarse state of a deferred result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AsyncState {
    Pending,
    Succeeded,
    Failed,
}

impl AsyncState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    fn of<T>(outcome: &Result<T, Failure>) -> Self {
        match outcome {
            Ok(_) => Self::Succeeded,
            Err(_) => Self::Failed,
        }
    }
}

impl fmt::Display for AsyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        })
    }
}

/// A completion attempt on a result that had already completed.
///
/// Carries the rejected value so the caller can recover it.
#[derive(Error)]
#[error("async#{async_id} already {state}")]
pub struct AlreadyCompleted<V> {
    async_id: u64,
    state: AsyncState,
    rejected: V,
}

impl<V> AlreadyCompleted<V> {
    /// Id of the result that rejected the completion.
    #[must_use]
    pub fn async_id(&self) -> u64 {
        self.async_id
    }

    /// The state the result was already in.
    #[must_use]
    pub fn state(&self) -> AsyncState {
        self.state
    }

    /// Take back the value that was not accepted.
    pub fn into_rejected(self) -> V {
        self.rejected
    }
}

impl<V> fmt::Debug for AlreadyCompleted<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlreadyCompleted")
            .field("async_id", &self.async_id)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

struct AsyncInner<T: 'static> {
    id: u64,
    outcome: RefCell<Option<Outcome<T>>>,
    listeners: Listeners<Outcome<T>>,
    failure_observed: Rc<Cell<bool>>,
}

impl<T: 'static> Drop for AsyncInner<T> {
    fn drop(&mut self) {
        if let Some(outcome) = self.outcome.get_mut()
            && let Err(failure) = &**outcome
            && !self.failure_observed.get()
        {
            tracing::warn!(async_id = self.id, %failure, "failed async dropped with unobserved failure");
        }
    }
}

/// A value that becomes available later, or a [`Failure`].
///
/// Clones are handles to the same result. `Async` is single-threaded; a
/// producer running elsewhere must hand its outcome back to the owning thread
/// before calling [`succeed`](Self::succeed) or [`fail`](Self::fail).
pub struct Async<T: 'static> {
    inner: Rc<AsyncInner<T>>,
}

impl<T: 'static> Async<T> {
    /// A pending result.
    #[must_use]
    pub fn new() -> Self {
        Self::with_outcome(None)
    }

    /// A result that has already succeeded.
    pub fn succeeded(value: T) -> Self {
        Self::with_outcome(Some(Rc::new(Ok(value))))
    }

    /// A result that has already failed.
    #[must_use]
    pub fn failed(failure: Failure) -> Self {
        Self::with_outcome(Some(Rc::new(Err(failure))))
    }

    fn with_outcome(outcome: Option<Outcome<T>>) -> Self {
        Self {
            inner: Rc::new(AsyncInner {
                id: next_object_id(),
                outcome: RefCell::new(outcome),
                listeners: Listeners::new(),
                failure_observed: Rc::new(Cell::new(false)),
            }),
        }
    }

    // ── completion ──────────────────────────────────────────────────────

    /// Complete with `value`, or return it inside [`AlreadyCompleted`] if
    /// the result is already terminal.
    pub fn try_succeed(&self, value: T) -> Result<(), AlreadyCompleted<T>> {
        self.settle(value, |value| Rc::new(Ok(value)))
    }

    /// Complete with `failure`, or return it inside [`AlreadyCompleted`] if
    /// the result is already terminal.
    pub fn try_fail(&self, failure: Failure) -> Result<(), AlreadyCompleted<Failure>> {
        self.settle(failure, |failure| Rc::new(Err(failure)))
    }

    /// Complete with `value`.
    ///
    /// # Panics
    ///
    /// Panics if the result has already completed, or re-raises the first
    /// panic of a success handler.
    pub fn succeed(&self, value: T) {
        if let Err(err) = self.try_succeed(value) {
            panic!("{err}");
        }
    }

    /// Complete with `failure`.
    ///
    /// # Panics
    ///
    /// Panics if the result has already completed, or re-raises the first
    /// panic of a failure handler.
    pub fn fail(&self, failure: Failure) {
        if let Err(err) = self.try_fail(failure) {
            panic!("{err}");
        }
    }

    fn settle<V>(
        &self,
        input: V,
        into_outcome: impl FnOnce(V) -> Outcome<T>,
    ) -> Result<(), AlreadyCompleted<V>> {
        let outcome = {
            let mut slot = self.inner.outcome.borrow_mut();
            if let Some(existing) = slot.as_deref() {
                return Err(AlreadyCompleted {
                    async_id: self.inner.id,
                    state: AsyncState::of(existing),
                    rejected: input,
                });
            }
            let outcome = into_outcome(input);
            *slot = Some(Rc::clone(&outcome));
            outcome
        };
        tracing::debug!(
            async_id = self.inner.id,
            outcome = %AsyncState::of(&*outcome),
            handlers = self.inner.listeners.len(),
            "async completed"
        );
        let fired = self.inner.listeners.try_fire(&outcome);
        self.inner.listeners.clear();
        if let Err(panic) = fired {
            panic.resume();
        }
        Ok(())
    }

    /// Complete from an upstream result. A result the caller already
    /// completed by hand keeps its own outcome.
    fn forward(&self, outcome: Outcome<T>) {
        if let Err(err) = self.settle(outcome, |outcome| outcome) {
            tracing::debug!(async_id = err.async_id, state = %err.state, "forwarded outcome ignored");
        }
    }

    // ── handlers ────────────────────────────────────────────────────────

    fn attach(
        &self,
        observes_failure: bool,
        handler: impl FnOnce(&Outcome<T>) + 'static,
    ) -> Registration {
        let current = self.inner.outcome.borrow().clone();
        if let Some(outcome) = current {
            if observes_failure && outcome.is_err() {
                self.inner.failure_observed.set(true);
            }
            handler(&outcome);
            return Registration::empty();
        }

        let observed = Rc::clone(&self.inner.failure_observed);
        let slot = Cell::new(Some(handler));
        self.inner.listeners.add(move |outcome: &Outcome<T>| {
            if observes_failure && outcome.is_err() {
                observed.set(true);
            }
            if let Some(handler) = slot.take() {
                handler(outcome);
            }
        })
    }

    /// Run `handler` with the value once this result succeeds.
    pub fn on_success(&self, handler: impl FnOnce(&T) + 'static) -> Registration {
        self.attach(false, move |outcome| {
            if let Ok(value) = &**outcome {
                handler(value);
            }
        })
    }

    /// Run `handler` with the failure once this result fails.
    pub fn on_failure(&self, handler: impl FnOnce(&Failure) + 'static) -> Registration {
        self.attach(true, move |outcome| {
            if let Err(failure) = &**outcome {
                handler(failure);
            }
        })
    }

    /// Attach a success and a failure handler behind one registration.
    pub fn on_result(
        &self,
        on_success: impl FnOnce(&T) + 'static,
        on_failure: impl FnOnce(&Failure) + 'static,
    ) -> Registration {
        self.attach(true, move |outcome| match &**outcome {
            Ok(value) => on_success(value),
            Err(failure) => on_failure(failure),
        })
    }

    /// Run `handler` with the outcome, whichever it is.
    pub fn on_complete(&self, handler: impl FnOnce(&Result<T, Failure>) + 'static) -> Registration {
        self.attach(true, move |outcome| handler(&**outcome))
    }

    // ── inspection ──────────────────────────────────────────────────────

    #[must_use]
    pub fn state(&self) -> AsyncState {
        self.inner
            .outcome
            .borrow()
            .as_deref()
            .map_or(AsyncState::Pending, AsyncState::of)
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.inner.outcome.borrow().is_none()
    }

    /// The failure, if this result has failed. Counts as observing it.
    #[must_use]
    pub fn failure(&self) -> Option<Failure> {
        let failure = match self.inner.outcome.borrow().as_deref() {
            Some(Err(failure)) => Some(failure.clone()),
            _ => None,
        };
        if failure.is_some() {
            self.inner.failure_observed.set(true);
        }
        failure
    }

    /// Number of handlers still waiting for completion.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.inner.listeners.len()
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Whether both handles refer to the same result.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // ── combinators ─────────────────────────────────────────────────────

    /// A new result completing with `f(value)` on success, or with the same
    /// failure. A panic inside `f` fails the new result.
    pub fn map<R: 'static>(&self, f: impl FnOnce(&T) -> R + 'static) -> Async<R> {
        self.try_map(move |value| Ok(f(value)))
    }

    /// Like [`map`](Self::map), for a fallible `f`; `Err` fails the new
    /// result.
    pub fn try_map<R: 'static>(
        &self,
        f: impl FnOnce(&T) -> Result<R, Failure> + 'static,
    ) -> Async<R> {
        let result = Async::new();
        let target = result.clone();
        self.attach(true, move |outcome| {
            let mapped = match &**outcome {
                Ok(value) => panic::catch_unwind(AssertUnwindSafe(|| f(value)))
                    .unwrap_or_else(|payload| Err(Failure::from_panic(payload))),
                Err(failure) => Err(failure.clone()),
            };
            target.forward(Rc::new(mapped));
        });
        result
    }

    /// A new result following the result `f` returns for the value, or
    /// failing with the same failure without calling `f`.
    pub fn flat_map<R: 'static>(&self, f: impl FnOnce(&T) -> Async<R> + 'static) -> Async<R> {
        let result = Async::new();
        let target = result.clone();
        self.attach(true, move |outcome| match &**outcome {
            Err(failure) => target.forward(Rc::new(Err(failure.clone()))),
            Ok(value) => match panic::catch_unwind(AssertUnwindSafe(|| f(value))) {
                Err(payload) => target.forward(Rc::new(Err(Failure::from_panic(payload)))),
                Ok(next) => {
                    next.attach(true, move |outcome| target.forward(Rc::clone(outcome)));
                }
            },
        });
        result
    }

    /// Drop the value, keeping only completion and failure.
    pub fn to_unit(&self) -> Async<()> {
        self.map(|_| ())
    }
}

impl<T: Clone + 'static> Async<T> {
    /// The value, if this result has succeeded.
    #[must_use]
    pub fn value(&self) -> Option<T> {
        match self.inner.outcome.borrow().as_deref() {
            Some(Ok(value)) => Some(value.clone()),
            _ => None,
        }
    }
}

impl<T: 'static> Clone for Async<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: 'static> Default for Async<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> fmt::Debug for Async<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Async")
            .field("id", &self.inner.id)
            .field("state", &self.state())
            .field("handlers", &self.inner.listeners.len())
            .finish()
    }
}
