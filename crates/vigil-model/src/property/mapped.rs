#![forbid(unsafe_code)]

//! Eagerly recomputed values derived from one or two properties.
//!
//! # Design
//!
//! [`MappedProperty<T>`] wraps a compute function and its cached result in
//! shared, reference-counted storage. Unlike a lazy memo, it recomputes as
//! soon as a source notifies, so it can notify its own handlers with the
//! precise `(old, new)` pair.
//!
//! # Invariants
//!
//! 1. `get()` equals the compute function applied to the sources' current
//!    values, as long as every source is alive.
//! 2. Handlers fire only when the recomputed value differs from the cached one.
//! 3. `version()` increments by exactly 1 per change of the cached value.
//!
//! # Failure Modes
//!
//! - **Compute function panics**: the cached value stays at the last
//!   successful result; the panic reaches whoever changed the source.
//! - **Source dropped**: recomputation stops and the last cached value is
//!   retained.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use vigil_core::{Listeners, Registration, Subscription};

use super::{PropertyChangeEvent, PropertyId, ReadableProperty, WeakProperty};

struct MappedInner<T: 'static> {
    id: PropertyId,
    value: RefCell<T>,
    version: Cell<u64>,
    compute: Box<dyn Fn() -> Option<T>>,
    listeners: Listeners<PropertyChangeEvent<T>>,
    /// Source handlers; removed when the mapped property drops.
    subscriptions: RefCell<Vec<Subscription>>,
}

impl<T: Clone + PartialEq + 'static> MappedInner<T> {
    fn recompute(&self) {
        let Some(new) = (self.compute)() else {
            return;
        };
        if *self.value.borrow() == new {
            return;
        }
        let old = self.value.replace(new.clone());
        self.version.set(self.version.get() + 1);
        self.listeners.fire(&PropertyChangeEvent { old, new });
    }
}

/// A read-only property computed from other properties.
///
/// Cloning creates a new handle to the **same** inner state.
pub struct MappedProperty<T: 'static> {
    inner: Rc<MappedInner<T>>,
}

impl<T: Clone + PartialEq + 'static> MappedProperty<T> {
    /// Derive from a single property.
    pub fn from_property<S, P>(source: &P, map: impl Fn(&S) -> T + 'static) -> Self
    where
        S: 'static,
        P: ReadableProperty<S>,
    {
        let reader = source.downgrade();
        let initial = map(&source.get());
        let this = Self::with_compute(initial, move || reader.get().map(|v| map(&v)));
        this.watch(source);
        this
    }

    /// Derive from two properties.
    pub fn from2<S1, S2, P1, P2>(
        s1: &P1,
        s2: &P2,
        map: impl Fn(&S1, &S2) -> T + 'static,
    ) -> Self
    where
        S1: 'static,
        S2: 'static,
        P1: ReadableProperty<S1>,
        P2: ReadableProperty<S2>,
    {
        let r1 = s1.downgrade();
        let r2 = s2.downgrade();
        let initial = map(&s1.get(), &s2.get());
        let this = Self::with_compute(initial, move || match (r1.get(), r2.get()) {
            (Some(a), Some(b)) => Some(map(&a, &b)),
            _ => None,
        });
        this.watch(s1);
        this.watch(s2);
        this
    }

    fn with_compute(initial: T, compute: impl Fn() -> Option<T> + 'static) -> Self {
        Self {
            inner: Rc::new(MappedInner {
                id: PropertyId::next(),
                value: RefCell::new(initial),
                version: Cell::new(0),
                compute: Box::new(compute),
                listeners: Listeners::new(),
                subscriptions: RefCell::new(Vec::new()),
            }),
        }
    }

    fn watch<S: 'static, P: ReadableProperty<S>>(&self, source: &P) {
        let weak = Rc::downgrade(&self.inner);
        let registration = source.add_handler(move |_: &PropertyChangeEvent<S>| {
            if let Some(inner) = weak.upgrade() {
                inner.recompute();
            }
        });
        self.inner
            .subscriptions
            .borrow_mut()
            .push(registration.into_subscription());
    }

    /// Current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Access the current value by reference without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Attach a change handler.
    pub fn add_handler(&self, handler: impl Fn(&PropertyChangeEvent<T>) + 'static) -> Registration {
        self.inner.listeners.add(handler)
    }

    /// Number of times the cached value has changed.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    #[must_use]
    pub fn id(&self) -> PropertyId {
        self.inner.id
    }
}

impl<T: Clone + PartialEq + 'static> ReadableProperty<T> for MappedProperty<T> {
    fn get(&self) -> T {
        MappedProperty::get(self)
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

impl<T: 'static> Clone for MappedProperty<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for MappedProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedProperty")
            .field("id", &self.inner.id)
            .field("value", &*self.inner.value.borrow())
            .field("version", &self.inner.version.get())
            .finish()
    }
}
