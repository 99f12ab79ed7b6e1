#![forbid(unsafe_code)]

//! Test helpers: handlers that record what they observed.
//!
//! Enabled for this crate's own tests and, through the `test-helpers`
//! feature, for downstream test suites.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Records a clone of every event it is handed.
#[derive(Debug)]
pub struct EventRecorder<E> {
    events: Rc<RefCell<Vec<E>>>,
}

impl<E> Clone for EventRecorder<E> {
    fn clone(&self) -> Self {
        Self {
            events: Rc::clone(&self.events),
        }
    }
}

impl<E: Clone + 'static> EventRecorder<E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// A handler appending to this recorder.
    pub fn handler(&self) -> impl Fn(&E) + use<E> {
        let events = Rc::clone(&self.events);
        move |e: &E| events.borrow_mut().push(e.clone())
    }

    /// Everything recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<E> {
        self.events.borrow().clone()
    }

    #[must_use]
    pub fn last(&self) -> Option<E> {
        self.events.borrow().last().cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl<E: Clone + 'static> Default for EventRecorder<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Counts invocations, ignoring the event.
#[derive(Debug, Clone, Default)]
pub struct CallCounter {
    count: Rc<Cell<usize>>,
}

impl CallCounter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A handler bumping this counter.
    pub fn handler<E: ?Sized + 'static>(&self) -> impl Fn(&E) + use<E> {
        let count = Rc::clone(&self.count);
        move |_: &E| count.set(count.get() + 1)
    }

    pub fn bump(&self) {
        self.count.set(self.count.get() + 1);
    }

    #[must_use]
    pub fn get(&self) -> usize {
        self.count.get()
    }

    pub fn reset(&self) {
        self.count.set(0);
    }
}
