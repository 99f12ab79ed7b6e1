#![forbid(unsafe_code)]

//! Ordered, re-entrant-safe handler registry.
//!
//! # Design
//!
//! Entries live in a `Vec<Rc<Entry>>` behind `Rc<RefCell<..>>`. A fire pass
//! clones the vector (copy-on-iterate) and releases the borrow before calling
//! any handler, so handlers may freely add, remove, or fire again. Each entry
//! carries a `removed` flag: removal during a pass flips the flag, which the
//! pass checks before each call.
//!
//! Registrations hold only a `Weak` to the registry, so removing after the
//! owner is gone is a no-op.
//!
//! # Failure Modes
//!
//! - **Handler panics**: caught per handler; the pass continues. The first
//!   payload is returned from [`try_fire`](Listeners::try_fire) or resumed by
//!   [`fire`](Listeners::fire).
//! - **Hook panics**: lifecycle hooks are not guarded and unwind into the
//!   caller of `add`/`remove`.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::panic::{ListenerPanic, PanicSlot};
use crate::registration::Registration;

struct Entry<E> {
    id: u64,
    removed: Cell<bool>,
    handler: Box<dyn Fn(&E)>,
}

struct Hooks {
    on_first_added: Box<dyn Fn()>,
    on_last_removed: Box<dyn Fn()>,
}

struct ListenersInner<E> {
    entries: Vec<Rc<Entry<E>>>,
    next_id: u64,
    hooks: Option<Rc<Hooks>>,
}

/// An ordered multiset of handlers for events of type `E`.
pub struct Listeners<E: 'static> {
    inner: Rc<RefCell<ListenersInner<E>>>,
}

impl<E: 'static> Listeners<E> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(ListenersInner {
                entries: Vec::new(),
                next_id: 0,
                hooks: None,
            })),
        }
    }

    /// Create an empty registry that calls `on_first_added` when it goes from
    /// zero to one handler and `on_last_removed` when it goes back to zero.
    pub fn with_hooks(on_first_added: impl Fn() + 'static, on_last_removed: impl Fn() + 'static) -> Self {
        let listeners = Self::new();
        listeners.inner.borrow_mut().hooks = Some(Rc::new(Hooks {
            on_first_added: Box::new(on_first_added),
            on_last_removed: Box::new(on_last_removed),
        }));
        listeners
    }

    /// Append a handler. It will be invoked by every subsequent fire pass
    /// until the returned registration is removed.
    pub fn add(&self, handler: impl Fn(&E) + 'static) -> Registration {
        let (id, first, hooks) = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.entries.push(Rc::new(Entry {
                id,
                removed: Cell::new(false),
                handler: Box::new(handler),
            }));
            (id, inner.entries.len() == 1, inner.hooks.clone())
        };
        if first && let Some(hooks) = hooks {
            (hooks.on_first_added)();
        }

        let weak = Rc::downgrade(&self.inner);
        Registration::from_fn(move || remove_entry(&weak, id))
    }

    /// Invoke every currently registered handler once, in registration order.
    ///
    /// Returns the first handler panic, if any, after all handlers have run.
    pub fn try_fire(&self, event: &E) -> Result<(), ListenerPanic> {
        let snapshot: Vec<Rc<Entry<E>>> = self.inner.borrow().entries.clone();
        let mut slot = PanicSlot::default();
        let mut fired = 0usize;
        for entry in &snapshot {
            if entry.removed.get() {
                continue;
            }
            fired += 1;
            slot.run(|| (entry.handler)(event));
        }
        tracing::trace!(listeners = snapshot.len(), fired, "fire pass complete");
        slot.finish()
    }

    /// Like [`try_fire`](Self::try_fire), but re-raises the first handler
    /// panic on the caller once the pass is complete.
    pub fn fire(&self, event: &E) {
        if let Err(panic) = self.try_fire(event) {
            panic.resume();
        }
    }

    /// Remove every handler. Outstanding registrations become no-ops.
    pub fn clear(&self) {
        let (drained, hooks) = {
            let mut inner = self.inner.borrow_mut();
            let drained = std::mem::take(&mut inner.entries);
            (drained, inner.hooks.clone())
        };
        for entry in &drained {
            entry.removed.set(true);
        }
        if !drained.is_empty() && let Some(hooks) = hooks {
            (hooks.on_last_removed)();
        }
        // Handlers (and anything they capture) drop here, outside the borrow.
        drop(drained);
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    /// Whether no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().entries.is_empty()
    }
}

fn remove_entry<E: 'static>(weak: &Weak<RefCell<ListenersInner<E>>>, id: u64) {
    let Some(inner) = weak.upgrade() else {
        return;
    };
    let (removed, now_empty, hooks) = {
        let mut inner = inner.borrow_mut();
        match inner.entries.iter().position(|e| e.id == id) {
            Some(pos) => {
                let entry = inner.entries.remove(pos);
                entry.removed.set(true);
                (Some(entry), inner.entries.is_empty(), inner.hooks.clone())
            }
            None => (None, false, None),
        }
    };
    if now_empty && let Some(hooks) = hooks {
        (hooks.on_last_removed)();
    }
    drop(removed);
}

impl<E: 'static> Default for Listeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: 'static> fmt::Debug for Listeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners").field("len", &self.len()).finish()
    }
}
