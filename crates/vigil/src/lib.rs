#![forbid(unsafe_code)]

//! vigil public facade crate.
//!
//! Re-exports the workspace crates under one name. Most users only need the
//! [`prelude`].
//!
//! ```
//! use vigil::prelude::*;
//!
//! let status = ValueProperty::new(String::from("loading"));
//! let request: Async<u32> = Async::new();
//! {
//!     let (ok, failed) = (status.clone(), status.clone());
//!     request.on_result(
//!         move |code| ok.set(format!("status {code}")),
//!         move |failure| failed.set(format!("error: {failure}")),
//!     );
//! }
//! let shouting = properties::map(&status, |s: &String| s.to_uppercase());
//!
//! request.succeed(200);
//! assert_eq!(shouting.get(), "STATUS 200");
//! ```

pub use vigil_core;
#[cfg(feature = "async")]
pub use vigil_async;
#[cfg(feature = "model")]
pub use vigil_model;

pub mod prelude {
    pub use vigil_core::{Listeners, Registration, Subscription};

    #[cfg(feature = "model")]
    pub use vigil_model::{
        BoxedProperty, ConstantProperty, MappedProperty, PropertyChangeEvent, ReadableProperty,
        SelectProperty, ValueProperty, WritableProperty, properties,
    };

    #[cfg(feature = "async")]
    pub use vigil_async::{Async, AsyncState, Failure, asyncs};
}
