#![forbid(unsafe_code)]

//! Easing curves and time-parameterized motion.
//!
//! Portal flights use the quadratic [`ease_in_out`]; the container's
//! collapse/expand transition uses [`CubicBezier`] with the
//! [`CONTAINER_EASING`] control points. A [`Tween`] samples a scalar
//! transition at an arbitrary elapsed time so the renderer never has to
//! track animation state of its own.
//!
//! # Invariants
//!
//! 1. Every easing maps `0.0 -> 0.0` and `1.0 -> 1.0`; inputs are clamped
//!    to `[0.0, 1.0]` first.
//! 2. Progress of a zero-length duration is `1.0` (already complete).

use std::time::Duration;

pub mod flight;

pub use flight::{Flight, FlightFrame};

/// An easing function mapping linear progress to eased progress.
pub type EasingFn = fn(f64) -> f64;

/// Identity easing.
#[inline]
#[must_use]
pub fn linear(t: f64) -> f64 {
    t.clamp(0.0, 1.0)
}

/// Quadratic ease-in-out: accelerates through the first half, decelerates
/// through the second.
#[inline]
#[must_use]
pub fn ease_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        2.0 * t * t
    } else {
        -1.0 + (4.0 - 2.0 * t) * t
    }
}

/// Linear progress of `elapsed` through `duration`, clamped to `[0, 1]`.
#[inline]
#[must_use]
pub fn progress(elapsed: Duration, duration: Duration) -> f64 {
    if duration.is_zero() {
        return 1.0;
    }
    (elapsed.as_secs_f64() / duration.as_secs_f64()).min(1.0)
}

// ---------------------------------------------------------------------------
// Cubic bezier
// ---------------------------------------------------------------------------

/// A CSS-style cubic bezier timing curve through `(0,0)` and `(1,1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicBezier {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
}

/// Timing curve of the container spin/scale/opacity transition.
pub const CONTAINER_EASING: CubicBezier = CubicBezier::new(0.2, 0.8, 0.2, 1.0);

const NEWTON_ITERATIONS: usize = 8;
const BISECTION_ITERATIONS: usize = 32;
const SOLVE_EPSILON: f64 = 1e-7;

impl CubicBezier {
    /// Create a curve from its two inner control points.
    ///
    /// `x1` and `x2` are expected in `[0, 1]` so the curve stays a function
    /// of time; they are clamped when sampled.
    #[must_use]
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    fn coefficients(p1: f64, p2: f64) -> (f64, f64, f64) {
        let c = 3.0 * p1;
        let b = 3.0 * (p2 - p1) - c;
        let a = 1.0 - c - b;
        (a, b, c)
    }

    fn sample_axis(p1: f64, p2: f64, s: f64) -> f64 {
        let (a, b, c) = Self::coefficients(p1, p2);
        ((a * s + b) * s + c) * s
    }

    fn slope_x(&self, s: f64) -> f64 {
        let (a, b, c) = Self::coefficients(self.x1.clamp(0.0, 1.0), self.x2.clamp(0.0, 1.0));
        (3.0 * a * s + 2.0 * b) * s + c
    }

    /// Find the curve parameter whose x coordinate equals `x`.
    fn solve_x(&self, x: f64) -> f64 {
        let (x1, x2) = (self.x1.clamp(0.0, 1.0), self.x2.clamp(0.0, 1.0));

        let mut s = x;
        for _ in 0..NEWTON_ITERATIONS {
            let err = Self::sample_axis(x1, x2, s) - x;
            if err.abs() < SOLVE_EPSILON {
                return s;
            }
            let slope = self.slope_x(s);
            if slope.abs() < 1e-6 {
                break;
            }
            s -= err / slope;
        }

        // Newton stalled on a flat segment; fall back to bisection.
        let (mut lo, mut hi) = (0.0, 1.0);
        s = x;
        for _ in 0..BISECTION_ITERATIONS {
            let value = Self::sample_axis(x1, x2, s);
            if (value - x).abs() < SOLVE_EPSILON {
                break;
            }
            if value < x {
                lo = s;
            } else {
                hi = s;
            }
            s = (lo + hi) / 2.0;
        }
        s
    }

    /// Eased value at linear progress `t`.
    #[must_use]
    pub fn ease(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        if t == 0.0 || t == 1.0 {
            return t;
        }
        let s = self.solve_x(t);
        Self::sample_axis(self.y1, self.y2, s)
    }
}

// ---------------------------------------------------------------------------
// Tween
// ---------------------------------------------------------------------------

/// A scalar transition from `from` to `to` over `duration`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tween {
    pub from: f64,
    pub to: f64,
    pub duration: Duration,
    pub easing: CubicBezier,
}

impl Tween {
    /// A tween that already sits at `value`.
    #[must_use]
    pub fn settled(value: f64) -> Self {
        Self {
            from: value,
            to: value,
            duration: Duration::ZERO,
            easing: CONTAINER_EASING,
        }
    }

    /// Value after `elapsed` time.
    #[must_use]
    pub fn sample(&self, elapsed: Duration) -> f64 {
        let p = progress(elapsed, self.duration);
        if p >= 1.0 {
            return self.to;
        }
        self.from + (self.to - self.from) * self.easing.ease(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ease_in_out_endpoints_and_midpoint() {
        assert_eq!(ease_in_out(0.0), 0.0);
        assert_eq!(ease_in_out(1.0), 1.0);
        assert!((ease_in_out(0.5) - 0.5).abs() < 1e-12);
        assert!(ease_in_out(0.25) < 0.25);
        assert!(ease_in_out(0.75) > 0.75);
    }

    #[test]
    fn ease_in_out_clamps_input() {
        assert_eq!(ease_in_out(-3.0), 0.0);
        assert_eq!(ease_in_out(7.0), 1.0);
    }

    #[test]
    fn progress_of_zero_duration_is_complete() {
        assert_eq!(progress(Duration::ZERO, Duration::ZERO), 1.0);
        assert_eq!(
            progress(Duration::from_millis(50), Duration::from_millis(100)),
            0.5
        );
        assert_eq!(
            progress(Duration::from_millis(500), Duration::from_millis(100)),
            1.0
        );
    }

    #[test]
    fn cubic_bezier_linear_control_points_are_identity() {
        let lin = CubicBezier::new(0.0, 0.0, 1.0, 1.0);
        for i in 0..=10 {
            let t = i as f64 / 10.0;
            assert!((lin.ease(t) - t).abs() < 1e-5, "t={t}");
        }
    }

    #[test]
    fn container_easing_front_loads_motion() {
        assert_eq!(CONTAINER_EASING.ease(0.0), 0.0);
        assert_eq!(CONTAINER_EASING.ease(1.0), 1.0);
        assert!(CONTAINER_EASING.ease(0.2) > 0.5);
    }

    #[test]
    fn cubic_bezier_is_monotonic_for_container_curve() {
        let mut prev = 0.0;
        for i in 0..=100 {
            let v = CONTAINER_EASING.ease(i as f64 / 100.0);
            assert!(v >= prev - 1e-6, "non-monotonic at {i}");
            prev = v;
        }
    }

    #[test]
    fn tween_interpolates_between_endpoints() {
        let tween = Tween {
            from: 0.0,
            to: 720.0,
            duration: Duration::from_millis(700),
            easing: CONTAINER_EASING,
        };
        assert_eq!(tween.sample(Duration::ZERO), 0.0);
        assert_eq!(tween.sample(Duration::from_millis(700)), 720.0);
        assert_eq!(tween.sample(Duration::from_secs(5)), 720.0);
        let mid = tween.sample(Duration::from_millis(350));
        assert!(mid > 360.0 && mid < 720.0);
    }

    #[test]
    fn settled_tween_is_constant() {
        let tween = Tween::settled(0.06);
        assert_eq!(tween.sample(Duration::ZERO), 0.06);
        assert_eq!(tween.sample(Duration::from_secs(1)), 0.06);
    }
}
