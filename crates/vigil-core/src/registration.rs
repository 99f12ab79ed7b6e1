#![forbid(unsafe_code)]

//! Disposable listener handles.
//!
//! A [`Registration`] is returned by every attach call in vigil. Calling
//! [`remove()`](Registration::remove) detaches exactly the listener it was
//! created for. Removal is idempotent, may happen from inside the handler
//! being fired, and is a silent no-op once the owning registry is gone.
//!
//! Dropping a `Registration` does **not** detach anything: listeners live
//! until they are removed or their owner settles/drops. Wrap the handle in a
//! [`Subscription`] when scope-bound cleanup is wanted.

use std::cell::RefCell;
use std::fmt;

type Remover = Box<dyn FnOnce()>;

/// Handle to a single attached listener.
pub struct Registration {
    remover: RefCell<Option<Remover>>,
}

impl Registration {
    /// A registration that is already removed. Used when nothing had to be
    /// attached (e.g. a handler fired synchronously against settled state).
    #[must_use]
    pub fn empty() -> Self {
        Self {
            remover: RefCell::new(None),
        }
    }

    /// Build a registration whose removal runs `remove` exactly once.
    pub fn from_fn(remove: impl FnOnce() + 'static) -> Self {
        Self {
            remover: RefCell::new(Some(Box::new(remove))),
        }
    }

    /// Combine several registrations into one. Removing the result removes
    /// every part, in the order given.
    pub fn composite(parts: impl IntoIterator<Item = Registration>) -> Self {
        let parts: Vec<Registration> = parts.into_iter().collect();
        if parts.is_empty() {
            return Self::empty();
        }
        Self::from_fn(move || {
            for part in &parts {
                part.remove();
            }
        })
    }

    /// Detach the listener. Subsequent calls do nothing.
    pub fn remove(&self) {
        // Take first so a re-entrant remove() from inside the remover is a no-op.
        let remover = self.remover.borrow_mut().take();
        if let Some(remover) = remover {
            remover();
        }
    }

    /// Whether [`remove()`](Self::remove) has already run (or there was never
    /// anything to remove).
    #[must_use]
    pub fn is_removed(&self) -> bool {
        self.remover.borrow().is_none()
    }

    /// Convert into a guard that removes the listener when dropped.
    #[must_use]
    pub fn into_subscription(self) -> Subscription {
        Subscription { registration: self }
    }
}

impl Default for Registration {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("removed", &self.is_removed())
            .finish()
    }
}

/// RAII guard that removes its listener on drop.
///
/// Keep the guard alive for as long as the listener should stay attached.
#[must_use = "dropping a Subscription immediately removes its listener"]
pub struct Subscription {
    registration: Registration,
}

impl Subscription {
    /// Remove the listener now instead of at drop.
    pub fn unsubscribe(self) {
        self.registration.remove();
    }

    /// Give up scope-bound cleanup and hand back the plain registration.
    pub fn into_registration(self) -> Registration {
        let remover = self.registration.remover.borrow_mut().take();
        match remover {
            Some(remover) => Registration::from_fn(remover),
            None => Registration::empty(),
        }
    }

    /// Whether the listener has already been removed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.registration.is_removed()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.registration.remove();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
