#![forbid(unsafe_code)]

//! Vortex runtime.
//!
//! The orchestrator behind the vortex animation: N stacks of images placed
//! on an ellipse, each continuously evicting its head into a portal flight
//! toward the center, plus a four-phase collapse/expand machine that spins
//! the whole vortex into a point and back.
//!
//! # Key Components
//!
//! - [`Vortex`] - The orchestrator; owns all state and the virtual clock
//! - [`StackQueues`] - Fixed-depth queues with two-step eviction
//! - [`PortalSpawner`] - Live flight-to-center requests
//! - [`PhaseMachine`] - Guarded `idle → collapsing → collapsed → expanding` cycle
//! - [`LoopScheduler`] - Self-rescheduling per-stack eviction chains
//! - [`BurstFlood`] - Staggered eviction flood launched on collapse
//! - [`VortexConfig`] - Every tuning knob, optionally loaded from TOML/JSON
//! - [`RealtimeDriver`] - Maps wall-clock time onto the virtual clock
//!
//! # How it fits in the system
//! The surrounding page posts [`VortexIntent`]s and listens for
//! [`VortexSignal`]s. A renderer calls [`Vortex::frame`] every frame and
//! reports finished flights back with [`Vortex::complete_portal`]. The
//! runtime never draws anything itself.

pub mod burst;
pub mod config;
pub mod driver;
pub mod entry;
pub mod frame;
pub mod loop_scheduler;
pub mod phase;
pub mod portal;
pub mod signal;
pub mod speed;
pub mod stacks;
pub mod vortex;

pub use burst::{BurstFlood, BurstTask};
pub use config::{ConfigError, InitialPhase, VortexConfig};
pub use driver::RealtimeDriver;
pub use entry::{AnimationPhase, EntryId, ImageEntry};
pub use frame::{ContainerView, Frame, PortalView, SlotView};
pub use loop_scheduler::{LoopScheduler, LoopTask};
pub use phase::{ContainerTransform, Phase, PhaseMachine};
pub use portal::{AnimationRequest, PortalSpawner, RequestId};
pub use signal::{IntentSender, VortexIntent, VortexSignal};
pub use speed::SpeedParams;
pub use stacks::StackQueues;
pub use vortex::{Vortex, VortexError, VortexStats};

pub use vortex_core::image_supply::ImageRef;
