#![forbid(unsafe_code)]

//! Geometric primitives for the vortex layout.
//!
//! Stacks sit on an ellipse centered on the screen origin. Each stack fans
//! its slots out along the ellipse tangent, turning every slot toward the
//! center. Evicted heads fly back to the origin along a quadratic curve.
//!
//! # Invariants
//!
//! 1. Every function here is pure: the same inputs give the same transform,
//!    so renderers recompute slot transforms every frame instead of caching
//!    them per entry.
//! 2. Lookups for a stack without a computed position return
//!    [`SlotTransform::NEUTRAL`] instead of panicking.
//! 3. Angles passed in and out are in degrees; trigonometry happens in
//!    radians internally.

use std::f64::consts::FRAC_PI_2;

/// Position, rotation (degrees), and scale of one visual element.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SlotTransform {
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
    pub scale: f64,
}

impl SlotTransform {
    /// Identity placement used before positions exist.
    pub const NEUTRAL: Self = Self {
        x: 0.0,
        y: 0.0,
        rotation: 0.0,
        scale: 1.0,
    };
}

impl Default for SlotTransform {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Control-point parameters for a flight path to the center.
///
/// `strength` pushes the quadratic control point away from the chord
/// midpoint; `offset_angle` (degrees) picks the direction of that push.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CurveParams {
    pub strength: f64,
    pub offset_angle: f64,
}

impl CurveParams {
    #[must_use]
    pub const fn new(strength: f64, offset_angle: f64) -> Self {
        Self {
            strength,
            offset_angle,
        }
    }
}

impl Default for CurveParams {
    fn default() -> Self {
        Self::new(100.0, 0.0)
    }
}

/// Per-stack curve table for the default six-stack layout.
pub const DEFAULT_CURVES: [CurveParams; 6] = [
    CurveParams::new(200.0, -70.0),
    CurveParams::new(300.0, 0.0),
    CurveParams::new(200.0, 0.0),
    CurveParams::new(200.0, 75.0),
    CurveParams::new(300.0, 150.0),
    CurveParams::new(200.0, -70.0),
];

/// Fixed placement of one stack. Assigned once, never mutated.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StackPosition {
    pub x: f64,
    pub y: f64,
    /// Nominal rotation of the stack around the ellipse (degrees).
    pub rotation: f64,
    pub curve: CurveParams,
}

/// Shape parameters of the fanned ellipse layout.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FanLayout {
    pub stack_count: usize,
    pub depth: usize,
    pub radius_x: f64,
    pub radius_y: f64,
    /// Tangential distance between consecutive slots.
    pub fan_spread: f64,
    /// Extra rotation per slot (degrees).
    pub fan_rotation: f64,
    /// Scale of slot 0.
    pub scale_base: f64,
    /// Scale added across the full depth of a stack.
    pub scale_span: f64,
}

impl FanLayout {
    /// Angle of stack `stack_index` around the ellipse, in degrees.
    #[inline]
    #[must_use]
    pub fn stack_angle(&self, stack_index: usize) -> f64 {
        if self.stack_count == 0 {
            return 0.0;
        }
        stack_index as f64 * 360.0 / self.stack_count as f64
    }

    /// Compute the fixed position of every stack.
    ///
    /// Curve parameters are taken from `curves` cyclically; an empty table
    /// falls back to [`CurveParams::default`].
    #[must_use]
    pub fn stack_positions(&self, curves: &[CurveParams]) -> Vec<StackPosition> {
        (0..self.stack_count)
            .map(|i| {
                let angle = self.stack_angle(i);
                let rad = angle.to_radians();
                let curve = if curves.is_empty() {
                    CurveParams::default()
                } else {
                    curves[i % curves.len()]
                };
                StackPosition {
                    x: rad.cos() * self.radius_x,
                    y: rad.sin() * self.radius_y,
                    rotation: angle,
                    curve,
                }
            })
            .collect()
    }

    /// Visual transform of `(stack_index, slot_index)`.
    ///
    /// Slots fan along the tangent of the ellipse, face the center with a
    /// small extra turn per slot, and grow with depth.
    #[must_use]
    pub fn slot_transform(
        &self,
        positions: &[StackPosition],
        stack_index: usize,
        slot_index: usize,
    ) -> SlotTransform {
        let Some(pos) = positions.get(stack_index) else {
            return SlotTransform::NEUTRAL;
        };

        let tangent = self.stack_angle(stack_index).to_radians() + FRAC_PI_2;
        let reach = slot_index as f64 * self.fan_spread;

        let angle_to_center = (-pos.y).atan2(-pos.x).to_degrees();
        let depth_ratio = if self.depth == 0 {
            0.0
        } else {
            slot_index as f64 / self.depth as f64
        };

        SlotTransform {
            x: pos.x + reach * tangent.cos(),
            y: pos.y + reach * tangent.sin(),
            rotation: angle_to_center + slot_index as f64 * self.fan_rotation,
            scale: self.scale_base + depth_ratio * self.scale_span,
        }
    }
}

// ---------------------------------------------------------------------------
// Slot styling
// ---------------------------------------------------------------------------

/// Stacking, fade, and shadow parameters for a resting slot.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SlotStyle {
    /// Translation along the view axis; deeper slots sit further back.
    pub depth_z: f64,
    pub z_index: i32,
    pub opacity: f64,
    pub shadow_strength: f64,
}

/// Opacity of slot 0; deeper slots fade linearly to zero.
pub const SLOT_OPACITY_MAX: f64 = 0.9;
/// Shadow strength of slot 0; deeper slots fade linearly to zero.
pub const SLOT_SHADOW_MAX: f64 = 0.35;

/// Style for `slot_index` within a stack of `depth` slots.
#[must_use]
pub fn slot_style(depth: usize, slot_index: usize) -> SlotStyle {
    let denom = depth.saturating_sub(1).max(1) as f64;
    let ratio = slot_index as f64 / denom;
    SlotStyle {
        depth_z: -(slot_index as f64) * 10.0,
        z_index: 100 - slot_index as i32,
        opacity: SLOT_OPACITY_MAX - ratio * SLOT_OPACITY_MAX,
        shadow_strength: SLOT_SHADOW_MAX * (1.0 - ratio),
    }
}

// ---------------------------------------------------------------------------
// Flight path
// ---------------------------------------------------------------------------

/// Point at parameter `t` on the quadratic curve from `(start_x, start_y)`
/// to the origin.
///
/// The control point sits at the chord midpoint pushed by
/// `curve.strength` in the `curve.offset_angle` direction.
#[must_use]
pub fn quadratic_to_center(t: f64, start_x: f64, start_y: f64, curve: CurveParams) -> (f64, f64) {
    let offset = curve.offset_angle.to_radians();
    let cx = start_x / 2.0 + curve.strength * offset.cos();
    let cy = start_y / 2.0 + curve.strength * offset.sin();

    let inv = 1.0 - t;
    let x = inv * inv * start_x + 2.0 * inv * t * cx;
    let y = inv * inv * start_y + 2.0 * inv * t * cy;
    (x, y)
}
