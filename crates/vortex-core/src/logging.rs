#![forbid(unsafe_code)]

//! Logging facade.
//!
//! With the `tracing` feature enabled this module re-exports the `tracing`
//! macros. Without it, the same macro names expand to nothing so call
//! sites inside this crate compile unchanged and cost nothing.

#[cfg(feature = "tracing")]
pub use tracing::{debug, error, info, trace, warn};

#[cfg(not(feature = "tracing"))]
mod noop {
    macro_rules! noop_log {
        ($($arg:tt)*) => {};
    }

    pub(crate) use noop_log as debug;
    pub(crate) use noop_log as error;
    pub(crate) use noop_log as info;
    pub(crate) use noop_log as trace;
    pub(crate) use noop_log as warn;
}

#[cfg(not(feature = "tracing"))]
#[allow(unused_imports)]
pub(crate) use noop::{debug, error, info, trace, warn};
