#![forbid(unsafe_code)]

//! Observable properties for vigil.
//!
//! - [`ValueProperty`]: a mutable cell that notifies on every change.
//! - [`SelectProperty`]: flattens "a property whose value selects another
//!   property" into a single read-only property.
//! - [`MappedProperty`]: an eagerly recomputed function of one or two sources.
//! - [`ConstantProperty`]: a property that never changes.
//!
//! All of them implement [`ReadableProperty`]; the free functions in
//! [`properties`] build the derived kinds. A [`BoxedProperty`] erases the
//! concrete kind when it is only known at runtime.

pub mod properties;
pub mod property;

pub use property::{
    BoxedProperty, ConstantProperty, ErasedProperty, MappedProperty, PropertyChangeEvent,
    PropertyId, ReadableProperty, SelectProperty, ValueProperty, WeakProperty, WritableProperty,
};
pub use vigil_core::{Registration, Subscription};
