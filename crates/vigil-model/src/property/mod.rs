#![forbid(unsafe_code)]

//! Property traits and the change event they share.
//!
//! # Invariants
//!
//! 1. `get()` returns the latest value; no property caches lazily.
//! 2. Handlers fire in registration order, once per actual change, with the
//!    `(old, new)` pair of that change.
//! 3. Setting a value the equality policy deems equal is a no-op.
//! 4. Derived properties hold their sources through [`WeakProperty`] readers
//!    and `Weak` handler back-references only; they never keep a source alive.
//!    The one owned reference is a select's currently selected inner.

use std::fmt;

use vigil_core::{Registration, next_object_id};

pub mod constant;
pub mod mapped;
pub mod select;
pub mod value;

pub use constant::ConstantProperty;
pub use mapped::MappedProperty;
pub use select::SelectProperty;
pub use value::ValueProperty;

/// Identity of a property instance, unique for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyId(u64);

impl PropertyId {
    pub(crate) fn next() -> Self {
        Self(next_object_id())
    }

    /// Raw id value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "property#{}", self.0)
    }
}

/// Notification payload: the value before and after one change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyChangeEvent<T> {
    pub old: T,
    pub new: T,
}

impl<T> PropertyChangeEvent<T> {
    pub fn new(old: T, new: T) -> Self {
        Self { old, new }
    }
}

/// Non-owning reader of a property's current value.
///
/// `get()` returns `None` once the property has been dropped.
pub struct WeakProperty<T> {
    read: Box<dyn Fn() -> Option<T>>,
}

impl<T> WeakProperty<T> {
    pub fn new(read: impl Fn() -> Option<T> + 'static) -> Self {
        Self {
            read: Box::new(read),
        }
    }

    #[must_use]
    pub fn get(&self) -> Option<T> {
        (self.read)()
    }
}

impl<T> fmt::Debug for WeakProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakProperty").finish_non_exhaustive()
    }
}

/// A value that can be read and observed.
pub trait ReadableProperty<T> {
    /// Current value.
    fn get(&self) -> T;

    /// Attach a change handler. The handler stays attached until the returned
    /// registration is removed or the property is dropped.
    fn add_handler<H>(&self, handler: H) -> Registration
    where
        H: Fn(&PropertyChangeEvent<T>) + 'static;

    /// Identity of this instance (shared by clones of the same handle).
    fn id(&self) -> PropertyId;

    /// A reader that does not keep the property alive.
    fn downgrade(&self) -> WeakProperty<T>;
}

/// A property that can also be written.
pub trait WritableProperty<T>: ReadableProperty<T> {
    /// Replace the value, notifying handlers if it changed.
    fn set(&self, value: T);
}

/// Object-safe view of a [`ReadableProperty`], used where the concrete
/// property type is chosen at runtime.
///
/// Every `ReadableProperty` is an `ErasedProperty`, and a
/// [`BoxedProperty<T>`] is a `ReadableProperty` again, so a select function
/// can return different property kinds from different branches.
pub trait ErasedProperty<T> {
    fn id(&self) -> PropertyId;
    fn get(&self) -> T;
    fn downgrade(&self) -> WeakProperty<T>;
    fn add_boxed_handler(&self, handler: Box<dyn Fn(&PropertyChangeEvent<T>)>) -> Registration;
}

impl<T: 'static, P: ReadableProperty<T>> ErasedProperty<T> for P {
    fn id(&self) -> PropertyId {
        ReadableProperty::id(self)
    }

    fn get(&self) -> T {
        ReadableProperty::get(self)
    }

    fn downgrade(&self) -> WeakProperty<T> {
        ReadableProperty::downgrade(self)
    }

    fn add_boxed_handler(&self, handler: Box<dyn Fn(&PropertyChangeEvent<T>)>) -> Registration {
        self.add_handler(move |event: &PropertyChangeEvent<T>| handler(event))
    }
}

/// A property whose concrete kind is only known at runtime.
pub type BoxedProperty<T> = Box<dyn ErasedProperty<T>>;

impl<T: 'static> ReadableProperty<T> for BoxedProperty<T> {
    fn get(&self) -> T {
        ErasedProperty::get(&**self)
    }

    fn add_handler<H>(&self, handler: H) -> Registration
    where
        H: Fn(&PropertyChangeEvent<T>) + 'static,
    {
        ErasedProperty::add_boxed_handler(&**self, Box::new(handler))
    }

    fn id(&self) -> PropertyId {
        ErasedProperty::id(&**self)
    }

    fn downgrade(&self) -> WeakProperty<T> {
        ErasedProperty::downgrade(&**self)
    }
}
