#![forbid(unsafe_code)]

//! Portal animation spawner.
//!
//! Every eviction launches one [`AnimationRequest`]: a snapshot of the
//! evicted entry flying from its slot to the screen center. The renderer
//! samples live requests every frame and reports completion back through
//! [`PortalSpawner::complete`]. A reset discards the whole collection with
//! [`PortalSpawner::clear`]; no completion is owed for discarded requests.
//!
//! # Invariants
//!
//! 1. Request ids are unique for the spawner's lifetime and never reused.
//! 2. Requests are kept in spawn order.
//! 3. Completing an unknown or already-completed id is a no-op.

use std::fmt;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use vortex_core::animation::{Flight, FlightFrame};
use vortex_core::geometry::{CurveParams, SlotTransform};

use crate::config::PortalConfig;
use crate::entry::{AnimationPhase, ImageEntry};

/// Identity of one portal flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct RequestId(u64);

impl RequestId {
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "portal-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Styling
// ---------------------------------------------------------------------------

/// One drop-shadow layer. Offsets and blur are in pixels, `alpha` is the
/// shadow color's opacity.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ShadowLayer {
    pub offset_x: f64,
    pub offset_y: f64,
    pub blur: f64,
    pub alpha: f64,
}

/// Shadow stack for a given strength: top, right, left, and a soft floor.
#[must_use]
pub fn shadow_layers(strength: f64) -> [ShadowLayer; 4] {
    [
        ShadowLayer {
            offset_x: 0.0,
            offset_y: -8.0,
            blur: 16.0,
            alpha: strength,
        },
        ShadowLayer {
            offset_x: 10.0,
            offset_y: 0.0,
            blur: 18.0,
            alpha: strength * 0.7,
        },
        ShadowLayer {
            offset_x: -10.0,
            offset_y: 0.0,
            blur: 18.0,
            alpha: strength * 0.7,
        },
        ShadowLayer {
            offset_x: 0.0,
            offset_y: 14.0,
            blur: 30.0,
            alpha: strength * 0.25,
        },
    ]
}

/// How a portal composites over the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum BlendMode {
    Normal,
    #[default]
    Overlay,
}

/// Presentation style attached to every request.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PortalStyle {
    pub shadows: [ShadowLayer; 4],
    pub border_radius_px: f64,
    pub blend_mode: BlendMode,
}

impl PortalStyle {
    #[must_use]
    pub fn from_config(config: &PortalConfig) -> Self {
        Self {
            shadows: shadow_layers(config.shadow_strength),
            border_radius_px: config.border_radius_px,
            blend_mode: BlendMode::Overlay,
        }
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// One in-flight flight to the center.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AnimationRequest {
    pub id: RequestId,
    /// Snapshot of the evicted entry, phase `moving-to-center`.
    pub entry: ImageEntry,
    pub flight: Flight,
    pub z_index: i32,
    /// Clock time at spawn.
    pub spawned_at: Duration,
    pub style: PortalStyle,
}

impl AnimationRequest {
    /// Sample the flight at clock time `now`.
    #[must_use]
    pub fn sample(&self, now: Duration) -> FlightFrame {
        self.flight.sample(now.saturating_sub(self.spawned_at))
    }

    /// Whether the flight has reached the center at clock time `now`.
    #[must_use]
    pub fn is_finished(&self, now: Duration) -> bool {
        self.flight
            .is_finished(now.saturating_sub(self.spawned_at))
    }

    /// Clock time at which the flight lands.
    #[must_use]
    pub fn lands_at(&self) -> Duration {
        self.spawned_at.saturating_add(self.flight.duration)
    }
}

/// Owner of the live request collection.
#[derive(Debug, Clone)]
pub struct PortalSpawner {
    requests: Vec<AnimationRequest>,
    next_id: u64,
    start_opacity: f64,
    terminal_scale: f64,
    style: PortalStyle,
}

impl PortalSpawner {
    #[must_use]
    pub fn new(config: &PortalConfig) -> Self {
        Self {
            requests: Vec::new(),
            next_id: 0,
            start_opacity: config.start_opacity,
            terminal_scale: config.terminal_scale,
            style: PortalStyle::from_config(config),
        }
    }

    /// Append a request for `entry` flying from `from` over `duration`.
    pub fn spawn(
        &mut self,
        entry: &ImageEntry,
        from: SlotTransform,
        duration: Duration,
        curve: CurveParams,
        z_index: i32,
        now: Duration,
    ) -> RequestId {
        let id = RequestId(self.next_id);
        self.next_id += 1;

        let mut snapshot = entry.clone();
        snapshot.animation_phase = AnimationPhase::MovingToCenter;

        tracing::trace!(
            target: "vortex.portal",
            request = %id,
            entry = %snapshot.id,
            duration_ms = duration.as_millis() as u64,
            z_index,
            "portal spawned"
        );

        self.requests.push(AnimationRequest {
            id,
            entry: snapshot,
            flight: Flight {
                start: from,
                curve,
                duration,
                start_opacity: self.start_opacity,
                terminal_scale: self.terminal_scale,
            },
            z_index,
            spawned_at: now,
            style: self.style.clone(),
        });
        id
    }

    /// Remove a finished request. Returns whether it was live.
    pub fn complete(&mut self, id: RequestId) -> bool {
        let Some(pos) = self.requests.iter().position(|r| r.id == id) else {
            return false;
        };
        self.requests.remove(pos);
        tracing::trace!(target: "vortex.portal", request = %id, "portal completed");
        true
    }

    /// Discard every live request. Returns how many were discarded.
    pub fn clear(&mut self) -> usize {
        let discarded = self.requests.len();
        self.requests.clear();
        if discarded > 0 {
            tracing::debug!(target: "vortex.portal", discarded, "portal requests cleared");
        }
        discarded
    }

    /// Ids of requests whose flight has landed at `now`.
    pub fn finished(&self, now: Duration) -> impl Iterator<Item = RequestId> + '_ {
        self.requests
            .iter()
            .filter(move |r| r.is_finished(now))
            .map(|r| r.id)
    }

    /// Live requests, oldest first.
    #[must_use]
    pub fn requests(&self) -> &[AnimationRequest] {
        &self.requests
    }

    #[must_use]
    pub fn get(&self, id: RequestId) -> Option<&AnimationRequest> {
        self.requests.iter().find(|r| r.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Total requests ever spawned.
    #[must_use]
    pub fn spawned(&self) -> u64 {
        self.next_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntryId;
    use vortex_core::image_supply::ImageRef;

    const MS: fn(u64) -> Duration = Duration::from_millis;

    fn entry() -> ImageEntry {
        let mut e = ImageEntry::new(EntryId { stack: 2, seq: 7 }, ImageRef::new("a.jpg"));
        e.is_leaving = true;
        e.is_animating = true;
        e
    }

    fn from() -> SlotTransform {
        SlotTransform {
            x: -250.0,
            y: 600.0,
            rotation: 45.0,
            scale: 0.7,
        }
    }

    #[test]
    fn spawn_snapshots_entry_moving_to_center() {
        let mut p = PortalSpawner::new(&PortalConfig::default());
        let id = p.spawn(&entry(), from(), MS(1500), CurveParams::new(200.0, 0.0), 100, MS(40));
        let req = p.get(id).unwrap();
        assert_eq!(req.entry.animation_phase, AnimationPhase::MovingToCenter);
        assert_eq!(req.entry.id, EntryId { stack: 2, seq: 7 });
        assert_eq!(req.flight.start_opacity, 0.9);
        assert_eq!(req.flight.terminal_scale, 0.3);
        assert_eq!(req.z_index, 100);
        assert_eq!(req.lands_at(), MS(1540));
        assert_eq!(req.style.border_radius_px, 12.0);
        assert_eq!(req.style.blend_mode, BlendMode::Overlay);
    }

    #[test]
    fn ids_are_never_reused() {
        let mut p = PortalSpawner::new(&PortalConfig::default());
        let a = p.spawn(&entry(), from(), MS(10), CurveParams::default(), 100, MS(0));
        assert!(p.complete(a));
        let b = p.spawn(&entry(), from(), MS(10), CurveParams::default(), 100, MS(0));
        assert_ne!(a, b);
        p.clear();
        let c = p.spawn(&entry(), from(), MS(10), CurveParams::default(), 100, MS(0));
        assert_ne!(b, c);
        assert_eq!(p.spawned(), 3);
    }

    #[test]
    fn complete_unknown_is_noop() {
        let mut p = PortalSpawner::new(&PortalConfig::default());
        let a = p.spawn(&entry(), from(), MS(10), CurveParams::default(), 100, MS(0));
        assert!(p.complete(a));
        assert!(!p.complete(a));
        assert!(p.is_empty());
    }

    #[test]
    fn sample_uses_spawn_time() {
        let mut p = PortalSpawner::new(&PortalConfig::default());
        let id = p.spawn(&entry(), from(), MS(200), CurveParams::default(), 120, MS(1000));
        let req = p.get(id).unwrap();
        let start = req.sample(MS(1000));
        assert_eq!(start.x, -250.0);
        assert_eq!(start.opacity, 0.9);
        // Before spawn time the flight sits at its start.
        assert_eq!(req.sample(MS(500)).progress, 0.0);
        let end = req.sample(MS(1200));
        assert_eq!(end.progress, 1.0);
        assert!(end.opacity.abs() < 1e-12);
    }

    #[test]
    fn finished_lists_landed_requests() {
        let mut p = PortalSpawner::new(&PortalConfig::default());
        let short = p.spawn(&entry(), from(), MS(100), CurveParams::default(), 100, MS(0));
        let long = p.spawn(&entry(), from(), MS(300), CurveParams::default(), 100, MS(0));
        let done: Vec<_> = p.finished(MS(150)).collect();
        assert_eq!(done, vec![short]);
        let done: Vec<_> = p.finished(MS(300)).collect();
        assert_eq!(done, vec![short, long]);
    }

    #[test]
    fn shadow_layers_scale_with_strength() {
        let layers = shadow_layers(0.35);
        assert_eq!(layers[0].alpha, 0.35);
        assert!((layers[1].alpha - 0.245).abs() < 1e-12);
        assert_eq!(layers[1].alpha, layers[2].alpha);
        assert!((layers[3].alpha - 0.0875).abs() < 1e-12);
        assert!(shadow_layers(0.0).iter().all(|l| l.alpha == 0.0));
    }

    #[test]
    fn clear_counts_discarded() {
        let mut p = PortalSpawner::new(&PortalConfig::default());
        for _ in 0..5 {
            p.spawn(&entry(), from(), MS(10), CurveParams::default(), 100, MS(0));
        }
        assert_eq!(p.clear(), 5);
        assert_eq!(p.clear(), 0);
    }
}
