#![forbid(unsafe_code)]

//! Mutable observable cell.
//!
//! # Re-entrancy
//!
//! `set()` may be called from inside one of its own handlers. The nested
//! call completes (value replaced, its own fire pass run) before the outer
//! pass resumes. Handlers later in the outer pass still receive the outer
//! event's `(old, new)`; `get()` always reports the latest value.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use vigil_core::{Listeners, Registration};

use super::{PropertyChangeEvent, PropertyId, ReadableProperty, WeakProperty, WritableProperty};

type EqualityPolicy<T> = Box<dyn Fn(&T, &T) -> bool>;

struct ValueInner<T: 'static> {
    id: PropertyId,
    value: RefCell<T>,
    equal: EqualityPolicy<T>,
    listeners: Listeners<PropertyChangeEvent<T>>,
}

/// A mutable value with synchronous change notification.
///
/// Cloning creates another handle to the **same** cell. Equality between
/// handles is identity, so properties can be stored inside values held by
/// other properties.
pub struct ValueProperty<T: 'static> {
    inner: Rc<ValueInner<T>>,
}

impl<T: Clone + PartialEq + 'static> ValueProperty<T> {
    /// Create a property compared with `PartialEq`.
    pub fn new(value: T) -> Self {
        Self::with_equality(value, |a, b| a == b)
    }
}

impl<T: Clone + 'static> ValueProperty<T> {
    /// Create a property with a custom equality policy. `set()` is a no-op
    /// whenever `equal(current, new)` holds.
    pub fn with_equality(value: T, equal: impl Fn(&T, &T) -> bool + 'static) -> Self {
        Self {
            inner: Rc::new(ValueInner {
                id: PropertyId::next(),
                value: RefCell::new(value),
                equal: Box::new(equal),
                listeners: Listeners::new(),
            }),
        }
    }

    /// Current value (cloned).
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Borrow the current value without cloning.
    ///
    /// # Panics
    ///
    /// Panics if `f` calls `set()` on this property.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Replace the value and notify handlers, unless it is equal to the
    /// current one.
    ///
    /// A handler panic is re-raised here after every handler has run.
    pub fn set(&self, value: T) {
        if (self.inner.equal)(&self.inner.value.borrow(), &value) {
            return;
        }
        let old = self.inner.value.replace(value.clone());
        self.inner
            .listeners
            .fire(&PropertyChangeEvent { old, new: value });
    }

    /// Attach a change handler.
    pub fn add_handler(&self, handler: impl Fn(&PropertyChangeEvent<T>) + 'static) -> Registration {
        self.inner.listeners.add(handler)
    }

    /// Number of attached handlers.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.inner.listeners.len()
    }

    #[must_use]
    pub fn id(&self) -> PropertyId {
        self.inner.id
    }
}

impl<T: Clone + 'static> ReadableProperty<T> for ValueProperty<T> {
    fn get(&self) -> T {
        ValueProperty::get(self)
    }

    fn add_handler<H>(&self, handler: H) -> Registration
    where
        H: Fn(&PropertyChangeEvent<T>) + 'static,
    {
        self.inner.listeners.add(handler)
    }

    fn id(&self) -> PropertyId {
        self.inner.id
    }

    fn downgrade(&self) -> WeakProperty<T> {
        let weak = Rc::downgrade(&self.inner);
        WeakProperty::new(move || weak.upgrade().map(|inner| inner.value.borrow().clone()))
    }
}

impl<T: Clone + 'static> WritableProperty<T> for ValueProperty<T> {
    fn set(&self, value: T) {
        ValueProperty::set(self, value);
    }
}

impl<T: 'static> Clone for ValueProperty<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: 'static> PartialEq for ValueProperty<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: 'static> Eq for ValueProperty<T> {}

impl<T: Clone + PartialEq + Default + 'static> Default for ValueProperty<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for ValueProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueProperty")
            .field("id", &self.inner.id)
            .field("value", &*self.inner.value.borrow())
            .field("handlers", &self.inner.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::panic::{self, AssertUnwindSafe};
    use vigil_core::testing::{CallCounter, EventRecorder};

    #[test]
    fn get_returns_initial_then_last_set() {
        let prop = ValueProperty::new(1);
        assert_eq!(prop.get(), 1);
        prop.set(2);
        prop.set(3);
        assert_eq!(prop.get(), 3);
    }

    #[test]
    fn set_fires_old_and_new() {
        let prop = ValueProperty::new("a".to_string());
        let recorder = EventRecorder::<PropertyChangeEvent<String>>::new();
        prop.add_handler(recorder.handler());
        prop.set("b".to_string());
        assert_eq!(
            recorder.events(),
            vec![PropertyChangeEvent::new("a".to_string(), "b".to_string())]
        );
    }

    #[test]
    fn equal_set_is_noop() {
        let prop = ValueProperty::new(5);
        let counter = CallCounter::new();
        prop.add_handler(counter.handler());
        prop.set(5);
        assert_eq!(counter.get(), 0);
        prop.set(6);
        prop.set(6);
        assert_eq!(counter.get(), 1);
    }

    #[test]
    fn option_values_are_nullable() {
        let prop: ValueProperty<Option<i32>> = ValueProperty::default();
        let recorder = EventRecorder::<PropertyChangeEvent<Option<i32>>>::new();
        prop.add_handler(recorder.handler());
        prop.set(None);
        prop.set(Some(1));
        prop.set(None);
        assert_eq!(
            recorder.events(),
            vec![
                PropertyChangeEvent::new(None, Some(1)),
                PropertyChangeEvent::new(Some(1), None),
            ]
        );
    }

    #[test]
    fn custom_equality_policy() {
        // Case-insensitive: changing only case is not a change.
        let prop = ValueProperty::with_equality("abc".to_string(), |a: &String, b: &String| {
            a.eq_ignore_ascii_case(b)
        });
        let counter = CallCounter::new();
        prop.add_handler(counter.handler());
        prop.set("ABC".to_string());
        assert_eq!(prop.get(), "abc");
        assert_eq!(counter.get(), 0);
        prop.set("abd".to_string());
        assert_eq!(counter.get(), 1);
    }

    #[test]
    fn removed_handler_stops_firing() {
        let prop = ValueProperty::new(0);
        let counter = CallCounter::new();
        let reg = prop.add_handler(counter.handler());
        prop.set(1);
        reg.remove();
        reg.remove();
        prop.set(2);
        assert_eq!(counter.get(), 1);
        assert_eq!(prop.handler_count(), 0);
    }

    #[test]
    fn reentrant_set_completes_nested_first() {
        let prop = ValueProperty::new(0);
        let recorder = EventRecorder::<PropertyChangeEvent<i32>>::new();
        {
            let p = prop.clone();
            prop.add_handler(move |e| {
                if e.new == 1 {
                    p.set(2);
                }
            });
        }
        prop.add_handler(recorder.handler());
        prop.set(1);

        assert_eq!(prop.get(), 2);
        assert_eq!(
            recorder.events(),
            vec![PropertyChangeEvent::new(1, 2), PropertyChangeEvent::new(0, 1)]
        );
    }

    #[test]
    fn handler_can_read_during_fire() {
        let prop = ValueProperty::new(0);
        let seen = Rc::new(Cell::new(-1));
        {
            let (p, seen) = (prop.clone(), Rc::clone(&seen));
            prop.add_handler(move |_| seen.set(p.get()));
        }
        prop.set(7);
        assert_eq!(seen.get(), 7);
    }

    #[test]
    fn handler_panic_surfaces_after_siblings_run() {
        let prop = ValueProperty::new(0);
        let counter = CallCounter::new();
        prop.add_handler(|_| panic!("listener failed"));
        prop.add_handler(counter.handler());
        let result = panic::catch_unwind(AssertUnwindSafe(|| prop.set(1)));
        assert!(result.is_err());
        assert_eq!(counter.get(), 1);
        assert_eq!(prop.get(), 1);
    }

    #[test]
    fn clones_share_state_and_compare_by_identity() {
        let a = ValueProperty::new(1);
        let b = a.clone();
        let c = ValueProperty::new(1);
        b.set(4);
        assert_eq!(a.get(), 4);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn downgrade_does_not_keep_alive() {
        let prop = ValueProperty::new(9);
        let weak = ReadableProperty::downgrade(&prop);
        assert_eq!(weak.get(), Some(9));
        drop(prop);
        assert_eq!(weak.get(), None);
    }

    #[test]
    fn debug_shows_value() {
        let prop = ValueProperty::new(42);
        assert!(format!("{prop:?}").contains("42"));
    }
}
