#![forbid(unsafe_code)]

//! Free functions building derived properties.

use crate::property::{
    ConstantProperty, MappedProperty, ReadableProperty, SelectProperty,
};

/// Follow the property that `f` selects from `outer`'s current value.
///
/// While `f` yields `None` the result reports `default`.
///
/// ```
/// use vigil_model::{ValueProperty, properties};
///
/// let inner = ValueProperty::new(5);
/// let outer = ValueProperty::new(Some(inner.clone()));
/// let selected = properties::select(&outer, |p: &Option<ValueProperty<i32>>| p.clone(), 0);
/// assert_eq!(selected.get(), 5);
///
/// inner.set(6);
/// assert_eq!(selected.get(), 6);
///
/// outer.set(None);
/// assert_eq!(selected.get(), 0);
/// ```
pub fn select<S, T, O, P, F>(outer: &O, f: F, default: T) -> SelectProperty<T>
where
    S: 'static,
    T: Clone + PartialEq + 'static,
    O: ReadableProperty<S>,
    P: ReadableProperty<T> + 'static,
    F: Fn(&S) -> Option<P> + 'static,
{
    SelectProperty::new(outer, f, default)
}

/// Eagerly apply `f` to every value of `source`.
pub fn map<S, T, P>(source: &P, f: impl Fn(&S) -> T + 'static) -> MappedProperty<T>
where
    S: 'static,
    T: Clone + PartialEq + 'static,
    P: ReadableProperty<S>,
{
    MappedProperty::from_property(source, f)
}

/// Combine two sources.
pub fn map2<S1, S2, T, P1, P2>(
    a: &P1,
    b: &P2,
    f: impl Fn(&S1, &S2) -> T + 'static,
) -> MappedProperty<T>
where
    S1: 'static,
    S2: 'static,
    T: Clone + PartialEq + 'static,
    P1: ReadableProperty<S1>,
    P2: ReadableProperty<S2>,
{
    MappedProperty::from2(a, b, f)
}

pub fn constant<T: Clone + 'static>(value: T) -> ConstantProperty<T> {
    ConstantProperty::new(value)
}

/// Boolean negation of `source`.
pub fn not<P: ReadableProperty<bool>>(source: &P) -> MappedProperty<bool> {
    map(source, |v: &bool| !v)
}

/// `true` while `source` holds `None`.
pub fn is_none<T: 'static, P: ReadableProperty<Option<T>>>(source: &P) -> MappedProperty<bool> {
    map(source, |v: &Option<T>| v.is_none())
}
