#![forbid(unsafe_code)]

//! Core plumbing shared by every vigil observable and deferred result.
//!
//! - [`Registration`]: disposable handle for exactly one listener. Removal is
//!   idempotent and survives the owning registry being dropped.
//! - [`Subscription`]: RAII guard around a `Registration` that removes on drop.
//! - [`Listeners`]: ordered, re-entrant-safe handler registry.
//! - [`ListenerPanic`]: the first panic raised by a handler during a fire pass,
//!   captured so the rest of the pass can run.
//!
//! # Invariants
//!
//! 1. Handlers fire in registration order.
//! 2. Handlers added during a fire pass are not invoked by that pass.
//! 3. Handlers removed during a fire pass are skipped if not yet reached and
//!    are never invoked twice.
//! 4. A panicking handler never prevents its siblings from running; the first
//!    panic is handed back to whoever triggered the pass.

pub mod id;
pub mod listeners;
pub mod panic;
pub mod registration;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

pub use id::next_object_id;
pub use listeners::Listeners;
pub use panic::{ListenerPanic, panic_message};
pub use registration::{Registration, Subscription};
