#![forbid(unsafe_code)]

//! Select: a property whose value is read through another property chosen by
//! an outer property's value.
//!
//! # Design
//!
//! [`SelectProperty<T>`] keeps its state in an `Rc`. The handlers it attaches
//! to the outer and inner properties hold only a `Weak` back-reference. The
//! outer property is read through a [`WeakProperty`] reader and is never kept
//! alive. The inner property currently selected is held by the select, so an
//! inner that the select function builds on the fly (a mapped property, say)
//! stays subscribed to its own sources for as long as it is selected.
//!
//! The select is wired eagerly: construction resolves the inner property and
//! subscribes to it. Handlers added at any later time therefore see the
//! current value from `get()` and receive changes from whatever inner
//! property is active at that moment.
//!
//! # Invariants
//!
//! 1. `get()` equals `f(outer.get())?.get()`, or the default when `f` yields
//!    no inner property.
//! 2. At most one inner subscription is live. On an outer change that selects
//!    a different inner instance, the old subscription is removed before the
//!    new one is attached.
//! 3. Selecting the same inner instance again causes no re-subscription.
//! 4. Handlers fire only when the selected value actually changes.
//! 5. Dispose (explicit or on drop of the last handle) removes the inner
//!    subscription, then the outer one.
//!
//! # Failure Modes
//!
//! - **Outer dropped**: its notifications stop; the select keeps tracking the
//!   inner it last selected.
//! - **Inner replaced**: the previous inner is released together with its
//!   subscription.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use vigil_core::{Listeners, Registration};

use super::{
    ErasedProperty, PropertyChangeEvent, PropertyId, ReadableProperty, WeakProperty,
};

enum Resolution<T> {
    /// The outer property is gone; nothing to re-evaluate.
    OuterGone,
    /// The outer value maps to no inner property.
    Absent,
    Inner(Box<dyn ErasedProperty<T>>),
}

struct InnerLink<T> {
    id: PropertyId,
    property: Box<dyn ErasedProperty<T>>,
    registration: Registration,
}

struct SelectState<T: 'static> {
    id: PropertyId,
    default: T,
    value: RefCell<T>,
    resolve: Box<dyn Fn() -> Resolution<T>>,
    inner: RefCell<Option<InnerLink<T>>>,
    outer: RefCell<Registration>,
    disposed: Cell<bool>,
    listeners: Listeners<PropertyChangeEvent<T>>,
}

impl<T: Clone + PartialEq + 'static> SelectState<T> {
    fn on_outer_changed(self: &Rc<Self>) {
        if self.disposed.get() {
            return;
        }
        let candidate = match (self.resolve)() {
            Resolution::OuterGone => return,
            Resolution::Absent => None,
            Resolution::Inner(property) => Some(property),
        };

        let current_id = self.inner.borrow().as_ref().map(|link| link.id);
        let candidate_id = candidate.as_deref().map(|p| p.id());
        if current_id == candidate_id {
            return;
        }

        let stale = self.inner.borrow_mut().take();
        if let Some(stale) = stale {
            stale.registration.remove();
        }

        let value = match candidate {
            None => self.default.clone(),
            Some(property) => {
                let weak: Weak<Self> = Rc::downgrade(self);
                let inner: &dyn ErasedProperty<T> = &*property;
                let registration = inner.add_boxed_handler(Box::new(move |_| {
                    if let Some(state) = weak.upgrade() {
                        state.on_inner_changed();
                    }
                }));
                let value = inner.get();
                let id = inner.id();
                *self.inner.borrow_mut() = Some(InnerLink {
                    id,
                    property,
                    registration,
                });
                value
            }
        };
        tracing::debug!(
            property_id = self.id.raw(),
            inner_id = candidate_id.map(PropertyId::raw),
            "select rewired"
        );
        self.update(value);
    }

    fn on_inner_changed(&self) {
        // Re-read rather than trust the event: a nested set() may already have
        // moved the inner value past what this notification carries.
        let value = self
            .inner
            .borrow()
            .as_ref()
            .map(|link| ErasedProperty::get(&*link.property));
        if let Some(value) = value {
            self.update(value);
        }
    }

    fn update(&self, new: T) {
        if *self.value.borrow() == new {
            return;
        }
        let old = self.value.replace(new.clone());
        self.listeners.fire(&PropertyChangeEvent { old, new });
    }
}

impl<T: 'static> SelectState<T> {
    fn release(&self) {
        if self.disposed.replace(true) {
            return;
        }
        let inner = self.inner.borrow_mut().take();
        if let Some(inner) = inner {
            inner.registration.remove();
        }
        self.outer.borrow().remove();
    }
}

impl<T: 'static> Drop for SelectState<T> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Read-only property flattening `outer -> inner property -> value`.
///
/// Cloning creates another handle to the same select. The select is disposed
/// when the last handle drops, or earlier through [`dispose()`](Self::dispose).
pub struct SelectProperty<T: 'static> {
    state: Rc<SelectState<T>>,
}

impl<T: Clone + PartialEq + 'static> SelectProperty<T> {
    /// Build a select over `outer`.
    ///
    /// `select` maps the outer value to the inner property to follow, or to
    /// `None`, in which case the select reports `default`.
    pub fn new<S, O, P, F>(outer: &O, select: F, default: T) -> Self
    where
        S: 'static,
        O: ReadableProperty<S>,
        P: ReadableProperty<T> + 'static,
        F: Fn(&S) -> Option<P> + 'static,
    {
        let outer_reader = ReadableProperty::downgrade(outer);
        let resolve = move || match outer_reader.get() {
            None => Resolution::OuterGone,
            Some(value) => match select(&value) {
                None => Resolution::Absent,
                Some(inner) => Resolution::Inner(Box::new(inner) as Box<dyn ErasedProperty<T>>),
            },
        };

        let state = Rc::new(SelectState {
            id: PropertyId::next(),
            value: RefCell::new(default.clone()),
            default,
            resolve: Box::new(resolve),
            inner: RefCell::new(None),
            outer: RefCell::new(Registration::empty()),
            disposed: Cell::new(false),
            listeners: Listeners::new(),
        });

        let weak = Rc::downgrade(&state);
        let registration = outer.add_handler(move |_: &PropertyChangeEvent<S>| {
            if let Some(state) = weak.upgrade() {
                state.on_outer_changed();
            }
        });
        *state.outer.borrow_mut() = registration;

        state.on_outer_changed();
        Self { state }
    }

    /// Current selected value.
    #[must_use]
    pub fn get(&self) -> T {
        self.state.value.borrow().clone()
    }

    /// Attach a change handler.
    pub fn add_handler(&self, handler: impl Fn(&PropertyChangeEvent<T>) + 'static) -> Registration {
        self.state.listeners.add(handler)
    }
}

impl<T: 'static> SelectProperty<T> {
    /// Release the inner and outer subscriptions. The select keeps its last
    /// value and stops changing. Idempotent.
    pub fn dispose(&self) {
        self.state.release();
    }

    /// Whether [`dispose()`](Self::dispose) has run.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.state.disposed.get()
    }

    /// Identity of the inner property currently followed, if any.
    #[must_use]
    pub fn inner_id(&self) -> Option<PropertyId> {
        self.state.inner.borrow().as_ref().map(|link| link.id)
    }

    #[must_use]
    pub fn id(&self) -> PropertyId {
        self.state.id
    }
}

impl<T: Clone + PartialEq + 'static> ReadableProperty<T> for SelectProperty<T> {
    fn get(&self) -> T {
        SelectProperty::get(self)
    }

    fn add_handler<H>(&self, handler: H) -> Registration
    where
        H: Fn(&PropertyChangeEvent<T>) + 'static,
    {
        self.state.listeners.add(handler)
    }

    fn id(&self) -> PropertyId {
        self.state.id
    }

    fn downgrade(&self) -> WeakProperty<T> {
        let weak = Rc::downgrade(&self.state);
        WeakProperty::new(move || weak.upgrade().map(|state| state.value.borrow().clone()))
    }
}

impl<T: 'static> Clone for SelectProperty<T> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<T: 'static> PartialEq for SelectProperty<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for SelectProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectProperty")
            .field("id", &self.state.id)
            .field("value", &*self.state.value.borrow())
            .field("inner", &self.state.inner.borrow().as_ref().map(|l| l.id))
            .field("disposed", &self.state.disposed.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::ValueProperty;
    use vigil_core::testing::{CallCounter, EventRecorder};

    #[derive(Clone, Debug, PartialEq)]
    struct Holder {
        value: ValueProperty<i32>,
    }

    impl Holder {
        fn new(v: i32) -> Self {
            Self {
                value: ValueProperty::new(v),
            }
        }
    }

    fn select_over(outer: &ValueProperty<Option<Holder>>) -> SelectProperty<i32> {
        SelectProperty::new(outer, |h: &Option<Holder>| h.as_ref().map(|h| h.value.clone()), 30)
    }

    #[test]
    fn default_when_outer_selects_nothing() {
        let outer = ValueProperty::new(None::<Holder>);
        let sel = select_over(&outer);
        assert_eq!(sel.get(), 30);
        assert_eq!(sel.inner_id(), None);
    }

    #[test]
    fn initial_inner_is_followed() {
        let holder = Holder::new(5);
        let outer = ValueProperty::new(Some(holder.clone()));
        let sel = select_over(&outer);
        assert_eq!(sel.get(), 5);
        assert_eq!(sel.inner_id(), Some(holder.value.id()));
        assert_eq!(holder.value.handler_count(), 1);
    }

    #[test]
    fn outer_change_fires_with_old_and_new() {
        let outer = ValueProperty::new(None::<Holder>);
        let sel = select_over(&outer);
        let recorder = EventRecorder::<PropertyChangeEvent<i32>>::new();
        sel.add_handler(recorder.handler());

        outer.set(Some(Holder::new(239)));
        assert_eq!(sel.get(), 239);
        assert_eq!(recorder.events(), vec![PropertyChangeEvent::new(30, 239)]);
    }

    #[test]
    fn switching_inner_unsubscribes_old() {
        let first = Holder::new(1);
        let second = Holder::new(2);
        let outer = ValueProperty::new(Some(first.clone()));
        let sel = select_over(&outer);
        let counter = CallCounter::new();
        sel.add_handler(counter.handler());

        outer.set(Some(second.clone()));
        assert_eq!(first.value.handler_count(), 0);
        assert_eq!(second.value.handler_count(), 1);
        assert_eq!(counter.get(), 1);

        first.value.set(100);
        assert_eq!(sel.get(), 2);
        assert_eq!(counter.get(), 1);

        second.value.set(3);
        assert_eq!(sel.get(), 3);
        assert_eq!(counter.get(), 2);
    }

    #[test]
    fn reselecting_same_inner_does_not_resubscribe() {
        let holder = Holder::new(1);
        let outer = ValueProperty::with_equality(Some(holder.clone()), |_, _| false);
        let sel = select_over(&outer);
        let reg_count_before = holder.value.handler_count();
        outer.set(Some(holder.clone()));
        assert_eq!(holder.value.handler_count(), reg_count_before);
        assert_eq!(sel.inner_id(), Some(holder.value.id()));
    }

    #[test]
    fn same_value_in_new_inner_does_not_fire() {
        let outer = ValueProperty::new(Some(Holder::new(7)));
        let sel = select_over(&outer);
        let counter = CallCounter::new();
        sel.add_handler(counter.handler());
        outer.set(Some(Holder::new(7)));
        assert_eq!(counter.get(), 0);
    }

    #[test]
    fn back_to_none_restores_default() {
        let holder = Holder::new(1);
        let outer = ValueProperty::new(Some(holder.clone()));
        let sel = select_over(&outer);
        outer.set(None);
        assert_eq!(sel.get(), 30);
        assert_eq!(holder.value.handler_count(), 0);
    }

    #[test]
    fn dispose_releases_inner_then_outer() {
        let holder = Holder::new(1);
        let outer = ValueProperty::new(Some(holder.clone()));
        let sel = select_over(&outer);
        assert_eq!(outer.handler_count(), 1);

        sel.dispose();
        sel.dispose();
        assert!(sel.is_disposed());
        assert_eq!(holder.value.handler_count(), 0);
        assert_eq!(outer.handler_count(), 0);

        holder.value.set(50);
        assert_eq!(sel.get(), 1);
    }

    #[test]
    fn drop_releases_subscriptions() {
        let holder = Holder::new(1);
        let outer = ValueProperty::new(Some(holder.clone()));
        let sel = select_over(&outer);
        let clone = sel.clone();
        drop(sel);
        assert_eq!(outer.handler_count(), 1);
        drop(clone);
        assert_eq!(outer.handler_count(), 0);
        assert_eq!(holder.value.handler_count(), 0);
    }

    #[test]
    fn does_not_keep_outer_alive() {
        let outer = ValueProperty::new(Some(Holder::new(4)));
        let weak = ReadableProperty::downgrade(&outer);
        let sel = select_over(&outer);
        drop(outer);
        assert_eq!(weak.get(), None);
        assert_eq!(sel.get(), 4);
    }

    #[test]
    fn nested_inner_set_leaves_select_consistent() {
        let holder = Holder::new(0);
        let outer = ValueProperty::new(Some(holder.clone()));
        {
            let v = holder.value.clone();
            holder.value.add_handler(move |e| {
                if e.new == 1 {
                    v.set(2);
                }
            });
        }
        let sel = select_over(&outer);
        let recorder = EventRecorder::<PropertyChangeEvent<i32>>::new();
        sel.add_handler(recorder.handler());

        holder.value.set(1);
        assert_eq!(sel.get(), 2);
        assert_eq!(recorder.last(), Some(PropertyChangeEvent::new(0, 2)));
    }
}
