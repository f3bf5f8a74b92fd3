#![forbid(unsafe_code)]

//! Headless vortex driver.
//!
//! Builds a [`vortex_runtime::Vortex`], plays the renderer role (samples
//! frames, reports landed flights, acknowledges presentation hints), fires
//! scripted collapse/expand intents at fixed times, and prints what
//! happened as text or JSON lines.

pub mod cli;
pub mod error;
pub mod logging;
pub mod run;

pub use cli::run_from_env;
pub use error::{Result, SimError};
