#![forbid(unsafe_code)]

//! Portal flight: one image travelling from its slot to the screen center.
//!
//! A [`Flight`] is fully described by its start transform, curve, and
//! duration. Position, scale, and opacity are recomputed from elapsed time
//! on every frame; nothing is pre-baked.
//!
//! # Invariants
//!
//! 1. `sample(0)` equals the start transform at `start_opacity`.
//! 2. `sample(duration)` sits at the origin with `terminal_scale` and zero
//!    opacity.
//! 3. Rotation stays at the start rotation for the whole flight.

use std::time::Duration;

use super::{ease_in_out, progress};
use crate::geometry::{CurveParams, SlotTransform, quadratic_to_center};

/// Parameters of a single flight to the center.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Flight {
    pub start: SlotTransform,
    pub curve: CurveParams,
    pub duration: Duration,
    pub start_opacity: f64,
    pub terminal_scale: f64,
}

/// The sampled state of a flight at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FlightFrame {
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
    pub scale: f64,
    pub opacity: f64,
    /// Linear progress in `[0, 1]`; `1.0` means the flight is over.
    pub progress: f64,
}

impl Flight {
    /// Linear progress after `elapsed`.
    #[inline]
    #[must_use]
    pub fn progress(&self, elapsed: Duration) -> f64 {
        progress(elapsed, self.duration)
    }

    /// Whether the flight has reached the center.
    #[inline]
    #[must_use]
    pub fn is_finished(&self, elapsed: Duration) -> bool {
        self.progress(elapsed) >= 1.0
    }

    /// Sample position, scale, and opacity after `elapsed`.
    #[must_use]
    pub fn sample(&self, elapsed: Duration) -> FlightFrame {
        let p = self.progress(elapsed);
        let t = ease_in_out(p);
        let (x, y) = quadratic_to_center(t, self.start.x, self.start.y, self.curve);
        FlightFrame {
            x,
            y,
            rotation: self.start.rotation,
            scale: self.start.scale + t * (self.terminal_scale - self.start.scale),
            opacity: self.start_opacity * (1.0 - t),
            progress: p,
        }
    }
}
