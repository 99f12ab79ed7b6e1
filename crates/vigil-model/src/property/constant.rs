#![forbid(unsafe_code)]

//! A property that never changes.

use std::fmt;
use std::rc::Rc;

use vigil_core::Registration;

use super::{PropertyChangeEvent, PropertyId, ReadableProperty, WeakProperty};

/// Read-only property fixed at construction. Handlers are accepted and never
/// invoked.
pub struct ConstantProperty<T> {
    id: PropertyId,
    value: Rc<T>,
}

impl<T: Clone + 'static> ConstantProperty<T> {
    pub fn new(value: T) -> Self {
        Self {
            id: PropertyId::next(),
            value: Rc::new(value),
        }
    }
}

impl<T: Clone + 'static> ReadableProperty<T> for ConstantProperty<T> {
    fn get(&self) -> T {
        T::clone(&self.value)
    }

    fn add_handler<H>(&self, _handler: H) -> Registration
    where
        H: Fn(&PropertyChangeEvent<T>) + 'static,
    {
        Registration::empty()
    }

    fn id(&self) -> PropertyId {
        self.id
    }

    fn downgrade(&self) -> WeakProperty<T> {
        let value = Rc::clone(&self.value);
        WeakProperty::new(move || Some(T::clone(&value)))
    }
}

impl<T> Clone for ConstantProperty<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            value: Rc::clone(&self.value),
        }
    }
}

impl<T> PartialEq for ConstantProperty<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T: fmt::Debug> fmt::Debug for ConstantProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConstantProperty").field(&self.value).finish()
    }
}
