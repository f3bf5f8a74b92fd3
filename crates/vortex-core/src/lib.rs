// Forbid unsafe in production; deny in tests.
#![cfg_attr(not(test), forbid(unsafe_code))]
#![cfg_attr(test, deny(unsafe_code))]

//! Core: geometry, easing, virtual timers, and the image supply.
//!
//! # Role in the vortex
//! `vortex-core` holds the pieces of the vortex animation that carry no
//! orchestration state of their own. Everything here is deterministic and
//! cheap to recompute every frame.
//!
//! # Primary responsibilities
//! - **Geometry**: stack placement on an ellipse, per-slot fan transforms,
//!   and the quadratic flight path from a slot to the screen center.
//! - **Animation**: easing curves shared by portal flights and the
//!   container transition.
//! - **Timers**: a virtual [`timer::Clock`] and owned [`timer::TimerSet`]
//!   registries with bulk cancellation.
//! - **Image supply**: round-robin image references partitioned per stack.
//!
//! # How it fits in the system
//! The orchestrator (`vortex-runtime`) owns all mutable state and drives
//! these primitives from its timer loop. A renderer only ever reads the
//! values they produce.

pub mod animation;
pub mod geometry;
pub mod image_supply;
pub mod logging;
pub mod timer;

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{debug, error, info, trace, warn};
