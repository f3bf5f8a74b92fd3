#![forbid(unsafe_code)]

//! Collapse/expand phase machine.
//!
//! ```text
//!   idle ──collapse──▶ collapsing ──(transition)──▶ collapsed
//!    ▲                     │                            │
//!    │                   expand                       expand
//!    │                     ▼                            ▼
//!    └──(transition)── expanding ◀──────────────────────┘
//!                          │
//!                       collapse ──▶ collapsing
//! ```
//!
//! | Current | Event | Accepted when | Next |
//! |---|---|---|---|
//! | idle, expanding | collapse | phase ∉ {collapsing, collapsed} | collapsing |
//! | collapsing | settle | | collapsed |
//! | collapsing, collapsed | expand | phase ∉ {expanding, idle} | expanding |
//! | expanding | settle | | idle |
//!
//! The guards are deliberately asymmetric: a collapse may interrupt an
//! expansion and an expand may interrupt a collapse, but neither event
//! re-enters its own transition or fires against the state it leads to.
//!
//! The machine only owns the phase, the container transform, and its
//! settle timer. The orchestrator applies the side effects of each
//! accepted transition (speed boost, loop suppression, normalization).
//!
//! # Invariants
//!
//! 1. At most one settle timer is pending. An accepted transition cancels
//!    the settle timer of the transition it supersedes.
//! 2. A rejected event changes nothing and schedules nothing.
//! 3. Both transitions share one fixed duration, independent of boost.

use std::fmt;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use vortex_core::animation::{CONTAINER_EASING, Tween};
use vortex_core::timer::{Clock, DueKey, TimerId, TimerSet};

use crate::config::{InitialPhase, TransitionConfig};

/// The four phases of the vortex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Phase {
    #[default]
    Idle,
    Collapsing,
    Collapsed,
    Expanding,
}

impl Phase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Collapsing => "collapsing",
            Self::Collapsed => "collapsed",
            Self::Expanding => "expanding",
        }
    }

    /// Whether a transition is running.
    #[must_use]
    pub const fn is_transitioning(self) -> bool {
        matches!(self, Self::Collapsing | Self::Expanding)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settle point of a running transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseTimer {
    CollapseSettled,
    ExpandSettled,
}

/// Global transform applied to the whole vortex container.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContainerTransform {
    /// Accumulated spin, degrees.
    pub rotation: f64,
    pub scale: f64,
    pub opacity: f64,
}

impl ContainerTransform {
    /// Fully expanded and visible.
    pub const EXPANDED: Self = Self {
        rotation: 0.0,
        scale: 1.0,
        opacity: 1.0,
    };
}

#[derive(Debug, Clone, Copy)]
struct ContainerTweens {
    rotation: Tween,
    scale: Tween,
    opacity: Tween,
    started_at: Duration,
}

impl ContainerTweens {
    fn settled(t: ContainerTransform) -> Self {
        Self {
            rotation: Tween::settled(t.rotation),
            scale: Tween::settled(t.scale),
            opacity: Tween::settled(t.opacity),
            started_at: Duration::ZERO,
        }
    }

    fn sample(&self, now: Duration) -> ContainerTransform {
        let elapsed = now.saturating_sub(self.started_at);
        ContainerTransform {
            rotation: self.rotation.sample(elapsed),
            scale: self.scale.sample(elapsed),
            opacity: self.opacity.sample(elapsed),
        }
    }

    fn retarget(&mut self, now: Duration, to: ContainerTransform, duration: Duration) {
        let from = self.sample(now);
        let tween = |from: f64, to: f64| Tween {
            from,
            to,
            duration,
            easing: CONTAINER_EASING,
        };
        self.rotation = tween(from.rotation, to.rotation);
        self.scale = tween(from.scale, to.scale);
        self.opacity = tween(from.opacity, to.opacity);
        self.started_at = now;
    }
}

/// Phase state plus the container transition it drives.
#[derive(Debug)]
pub struct PhaseMachine {
    phase: Phase,
    duration: Duration,
    spin_deg: f64,
    collapsed_scale: f64,
    /// Rotation the current transition heads to.
    spin_target: f64,
    container: ContainerTweens,
    timers: TimerSet<PhaseTimer>,
    pending: Option<TimerId>,
}

impl PhaseMachine {
    #[must_use]
    pub fn new(config: &TransitionConfig, initial: InitialPhase) -> Self {
        let (phase, start) = match initial {
            InitialPhase::Idle => (Phase::Idle, ContainerTransform::EXPANDED),
            InitialPhase::Collapsed => (
                Phase::Collapsed,
                ContainerTransform {
                    rotation: config.spin_deg,
                    scale: config.collapsed_scale,
                    opacity: 0.0,
                },
            ),
        };
        Self {
            phase,
            duration: Duration::from_millis(config.duration_ms),
            spin_deg: config.spin_deg,
            collapsed_scale: config.collapsed_scale,
            spin_target: start.rotation,
            container: ContainerTweens::settled(start),
            timers: TimerSet::new("phase"),
            pending: None,
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Shared transition duration.
    #[must_use]
    pub fn transition_duration(&self) -> Duration {
        self.duration
    }

    /// Whether the container accepts pointer input.
    #[must_use]
    pub fn is_interactive(&self) -> bool {
        self.phase != Phase::Collapsed
    }

    /// Container transform at clock time `now`.
    #[must_use]
    pub fn container_at(&self, now: Duration) -> ContainerTransform {
        self.container.sample(now)
    }

    /// Whether a collapse would be accepted now.
    #[must_use]
    pub fn can_collapse(&self) -> bool {
        !matches!(self.phase, Phase::Collapsing | Phase::Collapsed)
    }

    /// Whether an expand would be accepted now.
    #[must_use]
    pub fn can_expand(&self) -> bool {
        !matches!(self.phase, Phase::Expanding | Phase::Idle)
    }

    /// Enter `collapsing` if the guard allows it.
    pub fn request_collapse(&mut self, clock: &mut Clock) -> bool {
        if !self.can_collapse() {
            tracing::debug!(
                target: "vortex.phase",
                phase = %self.phase,
                "collapse ignored"
            );
            return false;
        }
        self.spin_target += self.spin_deg;
        let target = ContainerTransform {
            rotation: self.spin_target,
            scale: self.collapsed_scale,
            opacity: 0.0,
        };
        self.begin(clock, Phase::Collapsing, target, PhaseTimer::CollapseSettled);
        true
    }

    /// Enter `expanding` if the guard allows it.
    pub fn request_expand(&mut self, clock: &mut Clock) -> bool {
        if !self.can_expand() {
            tracing::debug!(
                target: "vortex.phase",
                phase = %self.phase,
                "expand ignored"
            );
            return false;
        }
        self.spin_target -= self.spin_deg;
        let target = ContainerTransform {
            rotation: self.spin_target,
            scale: 1.0,
            opacity: 1.0,
        };
        self.begin(clock, Phase::Expanding, target, PhaseTimer::ExpandSettled);
        true
    }

    fn begin(
        &mut self,
        clock: &mut Clock,
        next: Phase,
        target: ContainerTransform,
        settle: PhaseTimer,
    ) {
        if let Some(stale) = self.pending.take() {
            self.timers.cancel(stale);
        }
        let from = self.phase;
        self.phase = next;
        self.container.retarget(clock.now(), target, self.duration);
        self.pending = Some(self.timers.schedule(clock, self.duration, settle));
        tracing::info!(
            target: "vortex.phase",
            from = %from,
            to = %next,
            duration_ms = self.duration.as_millis() as u64,
            "phase transition"
        );
    }

    /// Key of the pending settle timer.
    #[must_use]
    pub fn next_due(&self) -> Option<DueKey> {
        self.timers.next_due()
    }

    /// Fire the settle timer if due; returns the phase entered.
    pub fn fire_due(&mut self, now: Duration) -> Option<Phase> {
        let (id, timer) = self.timers.pop_due(now)?;
        if self.pending == Some(id) {
            self.pending = None;
        }
        let next = match (timer, self.phase) {
            (PhaseTimer::CollapseSettled, Phase::Collapsing) => Phase::Collapsed,
            (PhaseTimer::ExpandSettled, Phase::Expanding) => Phase::Idle,
            (timer, phase) => {
                tracing::warn!(
                    target: "vortex.phase",
                    ?timer,
                    phase = %phase,
                    "settle timer does not match phase"
                );
                return None;
            }
        };
        tracing::info!(
            target: "vortex.phase",
            from = %self.phase,
            to = %next,
            "phase settled"
        );
        self.phase = next;
        Some(next)
    }

    /// Cancel the pending settle timer.
    pub fn cancel(&mut self) -> usize {
        self.pending = None;
        self.timers.cancel_all()
    }

    /// Number of pending settle timers (0 or 1).
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }
}
