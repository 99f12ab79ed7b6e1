#![forbid(unsafe_code)]

//! Process-wide identity allocation for observables and deferred results.

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a fresh, never-reused object id.
///
/// Ids start at 1 and increase monotonically for the lifetime of the process.
#[must_use]
pub fn next_object_id() -> u64 {
    NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed)
}
