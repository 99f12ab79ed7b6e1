//! Property-based invariant tests for value, mapped and select properties.
//!
//! 1. After any sequence of `set()`, `get()` returns the last value set.
//! 2. Handlers fire exactly once per actual change, never for equal values.
//! 3. Every event's `old` equals the previous event's `new`.
//! 4. A mapped property always equals its function of the source.
//! 5. A select always equals the value of the inner property its outer
//!    currently selects, or the default.
//! 6. A select holds at most one inner subscription.

use proptest::prelude::*;
use vigil_core::testing::EventRecorder;
use vigil_model::{PropertyChangeEvent, ValueProperty, properties};

// ═════════════════════════════════════════════════════════════════════════
// 1-3. Value property
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn value_property_reports_changes(values in proptest::collection::vec(0u8..4, 0..40)) {
        let prop = ValueProperty::new(0u8);
        let recorder = EventRecorder::<PropertyChangeEvent<u8>>::new();
        prop.add_handler(recorder.handler());

        let mut current = 0u8;
        let mut changes = 0usize;
        for v in values {
            if v != current {
                changes += 1;
                current = v;
            }
            prop.set(v);
            prop_assert_eq!(prop.get(), current);
        }

        let events = recorder.events();
        prop_assert_eq!(events.len(), changes);
        let mut previous = 0u8;
        for event in &events {
            prop_assert_eq!(event.old, previous);
            prop_assert_ne!(event.old, event.new);
            previous = event.new;
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Mapped property
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn mapped_tracks_source(values in proptest::collection::vec(any::<i16>(), 0..40)) {
        let source = ValueProperty::new(0i16);
        let bucket = properties::map(&source, |v: &i16| v.rem_euclid(5));
        for v in values {
            source.set(v);
            prop_assert_eq!(bucket.get(), v.rem_euclid(5));
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5-6. Select
// ═════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
enum Step {
    /// Point the outer property at inner `n`, or at nothing.
    Select(Option<usize>),
    /// Set inner `n` to a value.
    SetInner(usize, i32),
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        proptest::option::of(0usize..3).prop_map(Step::Select),
        (0usize..3, -3i32..3).prop_map(|(i, v)| Step::SetInner(i, v)),
    ]
}

proptest! {
    #[test]
    fn select_follows_current_inner(steps in proptest::collection::vec(step_strategy(), 0..60)) {
        let inners: Vec<ValueProperty<i32>> = (0..3).map(|_| ValueProperty::new(0)).collect();
        let outer: ValueProperty<Option<usize>> = ValueProperty::new(None);
        let sel = {
            let inners = inners.clone();
            properties::select(
                &outer,
                move |slot: &Option<usize>| slot.map(|i| inners[i].clone()),
                -100,
            )
        };
        let recorder = EventRecorder::<PropertyChangeEvent<i32>>::new();
        sel.add_handler(recorder.handler());

        for step in steps {
            match step {
                Step::Select(slot) => outer.set(slot),
                Step::SetInner(i, v) => inners[i].set(v),
            }
            let expected = outer.get().map_or(-100, |i| inners[i].get());
            prop_assert_eq!(sel.get(), expected);

            let subscribed: usize = inners.iter().map(ValueProperty::handler_count).sum();
            prop_assert_eq!(subscribed, usize::from(outer.get().is_some()));
        }

        for event in recorder.events() {
            prop_assert_ne!(event.old, event.new);
        }
    }
}
