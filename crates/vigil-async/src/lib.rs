#![forbid(unsafe_code)]

//! Deferred results for vigil.
//!
//! An [`Async<T>`] starts pending and completes exactly once, either with a
//! value or with a [`Failure`]. Handlers registered before completion run
//! during the completing call; handlers registered afterwards run
//! immediately. [`asyncs`] builds new results from existing ones.
//!
//! ```
//! use vigil_async::{Async, asyncs};
//!
//! let width = Async::new();
//! let height = Async::new();
//! let area = asyncs::pair(&width, &height).map(|(w, h): &(u32, u32)| w * h);
//!
//! width.succeed(3);
//! assert!(area.is_pending());
//! height.succeed(4);
//! assert_eq!(area.value(), Some(12));
//! ```

pub mod asyncs;
pub mod deferred;
pub mod failure;

pub use deferred::{AlreadyCompleted, Async, AsyncState};
pub use failure::{Failure, FailureCause};
pub use vigil_core::{Registration, Subscription};
