#![forbid(unsafe_code)]

//! Constructors and combinators building new [`Async`] values.
//!
//! # Invariants
//!
//! 1. Every combinator returns a fresh result and never completes its inputs.
//! 2. `pair` and `composite` complete exactly once: with all values once every
//!    input succeeded, or with the first failure to arrive.
//! 3. Once the combined result is terminal, its remaining input handlers are
//!    removed, so later outcomes of the other inputs are ignored.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use vigil_core::Registration;

use crate::deferred::Async;
use crate::failure::Failure;

/// An already succeeded result.
pub fn constant<T: 'static>(value: T) -> Async<T> {
    Async::succeeded(value)
}

/// An already failed result.
#[must_use]
pub fn failure<T: 'static>(failure: Failure) -> Async<T> {
    Async::failed(failure)
}

/// An already succeeded result carrying no value.
#[must_use]
pub fn void() -> Async<()> {
    Async::succeeded(())
}

/// Shared bookkeeping for a combined result.
struct Join<S, T: 'static> {
    slots: RefCell<S>,
    done: Cell<bool>,
    result: Async<T>,
    inputs: RefCell<Vec<Registration>>,
}

impl<S, T: 'static> Join<S, T> {
    fn new(slots: S) -> Rc<Self> {
        Rc::new(Self {
            slots: RefCell::new(slots),
            done: Cell::new(false),
            result: Async::new(),
            inputs: RefCell::new(Vec::new()),
        })
    }

    fn finish(&self, outcome: Result<T, Failure>) {
        if self.done.replace(true) {
            return;
        }
        let inputs = std::mem::take(&mut *self.inputs.borrow_mut());
        for registration in &inputs {
            registration.remove();
        }
        let completed = match outcome {
            Ok(value) => self.result.try_succeed(value).map_err(|_| ()),
            Err(failure) => self.result.try_fail(failure).map_err(|_| ()),
        };
        if completed.is_err() {
            tracing::debug!(async_id = self.result.id(), "combined result was completed elsewhere");
        }
    }

    fn track(&self, registration: Registration) {
        if self.done.get() {
            registration.remove();
        } else {
            self.inputs.borrow_mut().push(registration);
        }
    }
}

/// Combine two results into one holding both values.
///
/// Succeeds once both inputs succeed, whatever the order. Fails with the first
/// failure to arrive; the other input is then ignored.
pub fn pair<A, B>(a: &Async<A>, b: &Async<B>) -> Async<(A, B)>
where
    A: Clone + 'static,
    B: Clone + 'static,
{
    let join: Rc<Join<(Option<A>, Option<B>), (A, B)>> = Join::new((None, None));

    let registration = {
        let join = Rc::clone(&join);
        a.on_result(
            {
                let join = Rc::clone(&join);
                move |value: &A| {
                    join.slots.borrow_mut().0 = Some(value.clone());
                    complete_pair(&join);
                }
            },
            move |failure| join.finish(Err(failure.clone())),
        )
    };
    join.track(registration);

    if !join.done.get() {
        let registration = {
            let join = Rc::clone(&join);
            b.on_result(
                {
                    let join = Rc::clone(&join);
                    move |value: &B| {
                        join.slots.borrow_mut().1 = Some(value.clone());
                        complete_pair(&join);
                    }
                },
                move |failure| join.finish(Err(failure.clone())),
            )
        };
        join.track(registration);
    }

    join.result.clone()
}

fn complete_pair<A: Clone + 'static, B: Clone + 'static>(join: &Join<(Option<A>, Option<B>), (A, B)>) {
    let both = match &*join.slots.borrow() {
        (Some(a), Some(b)) => Some((a.clone(), b.clone())),
        _ => None,
    };
    if let Some(both) = both {
        join.finish(Ok(both));
    }
}

/// Combine any number of results into one holding all values, in input
/// order. An empty input succeeds immediately.
pub fn composite<T: Clone + 'static>(inputs: Vec<Async<T>>) -> Async<Vec<T>> {
    if inputs.is_empty() {
        return Async::succeeded(Vec::new());
    }

    let join: Rc<Join<Vec<Option<T>>, Vec<T>>> = Join::new(vec![None; inputs.len()]);
    for (index, input) in inputs.iter().enumerate() {
        if join.done.get() {
            break;
        }
        let registration = {
            let on_value = Rc::clone(&join);
            let on_failure = Rc::clone(&join);
            input.on_result(
                move |value: &T| {
                    on_value.slots.borrow_mut()[index] = Some(value.clone());
                    complete_all(&on_value);
                },
                move |failure| on_failure.finish(Err(failure.clone())),
            )
        };
        join.track(registration);
    }

    join.result.clone()
}

fn complete_all<T: Clone + 'static>(join: &Join<Vec<Option<T>>, Vec<T>>) {
    let all: Option<Vec<T>> = join.slots.borrow().iter().cloned().collect();
    if let Some(all) = all {
        join.finish(Ok(all));
    }
}
