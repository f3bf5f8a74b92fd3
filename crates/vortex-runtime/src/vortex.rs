#![forbid(unsafe_code)]

//! The vortex orchestrator.
//!
//! [`Vortex`] owns every piece of mutable state: stacks, speed, portal
//! requests, the phase machine, the loop session, and the burst flood. It
//! runs on a virtual [`Clock`] that only moves inside [`Vortex::advance`],
//! so a test or a frame loop decides exactly when timers fire.
//!
//! # Event flow
//!
//! ```text
//! intent ─▶ PhaseMachine ─┬─▶ SpeedParams (boost)
//!                         ├─▶ BurstFlood (accepted collapse)
//!                         └─▶ LoopScheduler suppression + normalize (accepted expand)
//! LoopScheduler / BurstFlood ─▶ StackQueues::evict_head ─▶ PortalSpawner::spawn
//! renderer ◀─ Vortex::frame()      renderer ─▶ complete_portal / acknowledge_hints
//! ```
//!
//! # Invariants
//!
//! 1. Timers fire in `(deadline, seq)` order across the phase, loop, and
//!    burst sets.
//! 2. An accepted expand cancels loop and burst timers, normalizes the
//!    stacks, and clears portal requests before it returns.
//! 3. [`Vortex::shutdown`] cancels every timer before it returns;
//!    afterwards intents and advances are no-ops.
//!
//! # Failure Modes
//!
//! Construction fails on an invalid config or an empty image pool. Nothing
//! after construction fails: unusable input degrades to a logged no-op.

use std::fmt;
use std::sync::mpsc;
use std::time::Duration;

use vortex_core::image_supply::{ImageRef, ImageSupply, SupplyError};
use vortex_core::timer::{Clock, DueKey};

use crate::burst::{BurstFlood, BurstTask};
use crate::config::{ConfigError, InitialPhase, VortexConfig};
use crate::frame::{ContainerView, Frame, portal_views, slot_views};
use crate::loop_scheduler::{LoopScheduler, LoopTask};
use crate::phase::{Phase, PhaseMachine};
use crate::portal::{PortalSpawner, RequestId};
use crate::signal::{IntentSender, SignalOutlet, VortexIntent, VortexSignal};
use crate::speed::SpeedParams;
use crate::stacks::StackQueues;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a [`Vortex`] could not be built.
#[derive(Debug)]
pub enum VortexError {
    Config(ConfigError),
    Supply(SupplyError),
}

impl fmt::Display for VortexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Supply(e) => write!(f, "unusable image supply: {e}"),
        }
    }
}

impl std::error::Error for VortexError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Supply(e) => Some(e),
        }
    }
}

impl From<ConfigError> for VortexError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<SupplyError> for VortexError {
    fn from(e: SupplyError) -> Self {
        Self::Supply(e)
    }
}

// ---------------------------------------------------------------------------
// Counters
// ---------------------------------------------------------------------------

/// Running totals, mostly for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VortexStats {
    /// Loop cycles that fired (including no-op evictions).
    pub loop_cycles: u64,
    /// Burst shots that fired (including no-op evictions).
    pub burst_shots: u64,
    /// Completions that rotated a stack.
    pub completions: u64,
    /// Completions ignored because a normalization superseded them.
    pub stale_completions: u64,
    /// Intents accepted by the phase machine.
    pub accepted_intents: u64,
    /// Intents rejected by a guard.
    pub ignored_intents: u64,
}

/// Shortest delay between an expand settling and the restarted loop's
/// first cycle.
const SETTLE_LEAD_MIN: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy)]
enum Due {
    Phase,
    Loop,
    Burst,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Vortex {
    config: VortexConfig,
    clock: Clock,
    stacks: StackQueues,
    speed: SpeedParams,
    portals: PortalSpawner,
    phase: PhaseMachine,
    looper: LoopScheduler,
    burst: BurstFlood,
    intent_tx: mpsc::Sender<VortexIntent>,
    intent_rx: mpsc::Receiver<VortexIntent>,
    signals: SignalOutlet,
    ready: bool,
    shut_down: bool,
    stats: VortexStats,
}

impl Vortex {
    /// Build an orchestrator and the receiver for its signals.
    ///
    /// Stacks stay empty until [`initialize`](Self::initialize).
    pub fn new(
        config: VortexConfig,
        pool: Vec<ImageRef>,
    ) -> Result<(Self, mpsc::Receiver<VortexSignal>), VortexError> {
        let config = config.validated()?;
        let supply = ImageSupply::new(pool, config.stack_count)?;
        let stacks = StackQueues::new(config.fan_layout(), config.layout.curves.clone(), supply);

        let suppressed = config.initial_phase == InitialPhase::Collapsed;
        let (intent_tx, intent_rx) = mpsc::channel();
        let (signal_tx, signal_rx) = mpsc::channel();

        let vortex = Self {
            clock: Clock::new(),
            stacks,
            speed: SpeedParams::new(&config.speed),
            portals: PortalSpawner::new(&config.portal),
            phase: PhaseMachine::new(&config.transition, config.initial_phase),
            looper: LoopScheduler::new(config.loop_stagger(), suppressed),
            burst: BurstFlood::new(&config.burst),
            intent_tx,
            intent_rx,
            signals: SignalOutlet::new(signal_tx),
            ready: false,
            shut_down: false,
            stats: VortexStats::default(),
            config,
        };
        Ok((vortex, signal_rx))
    }

    /// Populate the stacks, emit `Ready` the first time, and start the loop
    /// unless it is suppressed.
    ///
    /// Calling this again cancels loop and burst timers, discards portal
    /// requests, and repopulates every stack.
    pub fn initialize(&mut self) {
        if self.shut_down {
            tracing::warn!(target: "vortex.phase", "initialize after shutdown ignored");
            return;
        }
        self.looper.stop();
        self.burst.cancel();
        self.portals.clear();
        self.stacks.initialize();

        if !self.ready {
            self.ready = true;
            self.signals.emit(VortexSignal::Ready);
        }
        self.looper.start(&mut self.clock, self.stacks.stack_count());
    }

    /// Handle one intent immediately. Returns whether the phase machine
    /// accepted it.
    pub fn dispatch(&mut self, intent: VortexIntent) -> bool {
        if self.shut_down {
            return false;
        }
        let accepted = match intent {
            VortexIntent::Collapse { boost } => self.collapse(boost),
            VortexIntent::Expand { boost } => self.expand(boost),
        };
        if accepted {
            self.stats.accepted_intents += 1;
        } else {
            self.stats.ignored_intents += 1;
        }
        accepted
    }

    fn collapse(&mut self, boost: Option<f64>) -> bool {
        if !self.phase.request_collapse(&mut self.clock) {
            return false;
        }
        self.speed.boost(boost);
        if self.stacks.is_initialized() {
            self.burst.trigger(&mut self.clock, self.stacks.stack_count());
        }
        true
    }

    fn expand(&mut self, boost: Option<f64>) -> bool {
        if !self.phase.request_expand(&mut self.clock) {
            return false;
        }
        let cancelled = self.looper.suppress() + self.burst.cancel();
        self.stacks.normalize_hard();
        let discarded = self.portals.clear();
        self.speed.boost(boost);
        tracing::debug!(
            target: "vortex.loop",
            cancelled,
            discarded,
            "expand reset loop and burst state"
        );
        true
    }

    /// Handle for posting intents from elsewhere; they are applied at the
    /// start of the next advance.
    #[must_use]
    pub fn intent_sender(&self) -> IntentSender {
        IntentSender::new(self.intent_tx.clone())
    }

    /// Move the clock forward by `dt`, firing every timer that falls due.
    pub fn advance(&mut self, dt: Duration) {
        if self.shut_down {
            return;
        }
        while let Ok(intent) = self.intent_rx.try_recv() {
            self.dispatch(intent);
        }

        let target = self.clock.now().saturating_add(dt);
        while let Some((key, due)) = self.next_due() {
            if key.deadline > target {
                break;
            }
            self.clock.advance_to(key.deadline);
            self.fire(due);
        }
        self.clock.advance_to(target);
    }

    /// Move the clock forward to absolute time `t`. Earlier times only
    /// drain intents.
    pub fn advance_to(&mut self, t: Duration) {
        self.advance(t.saturating_sub(self.clock.now()));
    }

    fn next_due(&self) -> Option<(DueKey, Due)> {
        [
            self.phase.next_due().map(|k| (k, Due::Phase)),
            self.looper.next_due().map(|k| (k, Due::Loop)),
            self.burst.next_due().map(|k| (k, Due::Burst)),
        ]
        .into_iter()
        .flatten()
        .min_by_key(|(k, _)| *k)
    }

    fn fire(&mut self, due: Due) {
        let now = self.clock.now();
        match due {
            Due::Phase => {
                if let Some(settled) = self.phase.fire_due(now) {
                    self.on_settled(settled);
                }
            }
            Due::Loop => {
                if let Some(task) = self.looper.pop_due(now) {
                    self.on_loop(task);
                }
            }
            Due::Burst => {
                if let Some(task) = self.burst.pop_due(now) {
                    self.on_burst(task);
                }
            }
        }
    }

    fn on_settled(&mut self, phase: Phase) {
        match phase {
            Phase::Collapsed => self.signals.emit(VortexSignal::DoneCollapsing),
            Phase::Idle => {
                self.speed.reset();
                self.looper.resume();
                if self.stacks.is_initialized() {
                    // No flight may exist at the settle instant itself.
                    let lead = self.speed.delay().max(SETTLE_LEAD_MIN);
                    self.looper.start_after(&mut self.clock, self.stacks.stack_count(), lead);
                }
                self.signals.emit(VortexSignal::DoneExpanding);
            }
            Phase::Collapsing | Phase::Expanding => {}
        }
    }

    fn on_loop(&mut self, task: LoopTask) {
        match task {
            LoopTask::Cycle { stack } => {
                if self.looper.is_suppressed() {
                    return;
                }
                self.stats.loop_cycles += 1;
                let duration = self.speed.duration();
                let z_index = self.config.portal.loop_z_index;
                self.evict(stack, true, duration, z_index);
                let epoch = self.stacks.epoch();
                self.looper
                    .schedule_completion(&mut self.clock, stack, epoch, duration);
            }
            LoopTask::Complete { stack, epoch } => {
                self.complete(stack, epoch);
                let delay = self.speed.delay();
                self.looper.schedule_next_cycle(&mut self.clock, stack, delay);
            }
        }
    }

    fn on_burst(&mut self, task: BurstTask) {
        match task {
            BurstTask::Shot { stack, .. } => {
                self.stats.burst_shots += 1;
                let duration = self.burst.flight_duration();
                let z_index = self.config.portal.burst_z_index;
                if self.evict(stack, false, duration, z_index).is_some() {
                    let epoch = self.stacks.epoch();
                    self.burst.schedule_landing(&mut self.clock, stack, epoch);
                }
            }
            BurstTask::Land { stack, epoch } => self.complete(stack, epoch),
        }
    }

    fn evict(
        &mut self,
        stack: usize,
        promote_next: bool,
        duration: Duration,
        z_index: i32,
    ) -> Option<RequestId> {
        let from = self.stacks.slot_transform(stack, 0);
        let curve = self.stacks.position(stack)?.curve;
        let entry = self.stacks.evict_head(stack, promote_next)?;
        let now = self.clock.now();
        Some(
            self.portals
                .spawn(&entry, from, duration, curve, z_index, now),
        )
    }

    fn complete(&mut self, stack: usize, epoch: u64) {
        if self.stacks.complete_eviction(stack, epoch).is_some() {
            self.stats.completions += 1;
        } else {
            self.stats.stale_completions += 1;
        }
    }

    /// Snapshot for the renderer at the current clock time.
    #[must_use]
    pub fn frame(&self) -> Frame {
        let now = self.clock.now();
        Frame {
            now,
            phase: self.phase.phase(),
            container: ContainerView {
                transform: self.phase.container_at(now),
                transition: self.phase.transition_duration(),
                interactive: self.phase.is_interactive(),
            },
            slots: slot_views(&self.stacks),
            portals: portal_views(&self.portals, now),
        }
    }

    /// Renderer callback: a portal flight finished. Returns `false` for
    /// unknown ids.
    pub fn complete_portal(&mut self, id: RequestId) -> bool {
        self.portals.complete(id)
    }

    /// Renderer callback: `just_added` and `just_promoted` were consumed.
    pub fn acknowledge_hints(&mut self) {
        self.stacks.acknowledge_hints();
    }

    /// Cancel every timer and discard portal requests. Later intents and
    /// advances are ignored.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        let cancelled = self.phase.cancel() + self.looper.stop() + self.burst.cancel();
        let discarded = self.portals.clear();
        self.shut_down = true;
        tracing::info!(
            target: "vortex.phase",
            cancelled,
            discarded,
            "vortex shut down"
        );
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase.phase()
    }

    #[must_use]
    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    #[must_use]
    pub fn speed(&self) -> &SpeedParams {
        &self.speed
    }

    #[must_use]
    pub fn stacks(&self) -> &StackQueues {
        &self.stacks
    }

    #[must_use]
    pub fn portals(&self) -> &PortalSpawner {
        &self.portals
    }

    #[must_use]
    pub fn config(&self) -> &VortexConfig {
        &self.config
    }

    #[must_use]
    pub fn stats(&self) -> VortexStats {
        self.stats
    }

    #[must_use]
    pub fn is_loop_suppressed(&self) -> bool {
        self.looper.is_suppressed()
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Pending tasks across the phase, loop, and burst timer sets.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.phase.pending_timers() + self.looper.pending() + self.burst.pending()
    }

    /// Pending burst shots (excluding landings).
    #[must_use]
    pub fn pending_burst_shots(&self) -> usize {
        self.burst.pending_shots()
    }

    /// Clock time of the next due timer, if any.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.next_due().map(|(k, _)| k.deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: fn(u64) -> Duration = Duration::from_millis;

    fn pool(n: usize) -> Vec<ImageRef> {
        (0..n).map(|i| ImageRef::new(format!("img/{i}.jpg"))).collect()
    }

    fn vortex() -> (Vortex, mpsc::Receiver<VortexSignal>) {
        Vortex::new(VortexConfig::default(), pool(60)).unwrap()
    }

    #[test]
    fn empty_pool_is_rejected() {
        let err = Vortex::new(VortexConfig::default(), Vec::new()).unwrap_err();
        assert!(matches!(err, VortexError::Supply(SupplyError::EmptyPool)));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = VortexConfig {
            stack_count: 0,
            ..VortexConfig::default()
        };
        let err = Vortex::new(config, pool(10)).unwrap_err();
        assert!(matches!(err, VortexError::Config(_)));
        assert!(err.to_string().contains("stack_count"));
    }

    #[test]
    fn ready_once() {
        let (mut v, rx) = vortex();
        assert!(!v.is_ready());
        v.initialize();
        v.initialize();
        assert!(v.is_ready());
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![VortexSignal::Ready]);
    }

    #[test]
    fn loop_starts_on_initialize() {
        let (mut v, _rx) = vortex();
        v.initialize();
        assert_eq!(v.pending_timers(), 6);
        v.advance(MS(0));
        assert_eq!(v.portals().len(), 1);
        assert!(v.stacks().stack(0).unwrap()[0].is_leaving);
        v.advance(MS(1000));
        assert_eq!(v.portals().len(), 6);
    }

    #[test]
    fn loop_cycle_rotates_and_rearms() {
        let (mut v, _rx) = vortex();
        v.initialize();
        let second = v.stacks().stack(0).unwrap()[1].id;
        v.advance(MS(1500));
        let stack = v.stacks().stack(0).unwrap();
        assert_eq!(stack[0].id, second);
        assert!(stack[9].just_added);
        // Next cycle of stack 0 fires after the base delay.
        v.advance(MS(10));
        assert_eq!(v.stats().loop_cycles, 7);
        assert!(v.stacks().stack(0).unwrap()[0].is_leaving);
    }

    #[test]
    fn intents_via_sender_apply_on_advance() {
        let (mut v, _rx) = vortex();
        v.initialize();
        let tx = v.intent_sender();
        assert!(tx.collapse(Some(10.0)));
        assert_eq!(v.phase(), Phase::Idle);
        v.advance(MS(0));
        assert_eq!(v.phase(), Phase::Collapsing);
    }

    #[test]
    fn shutdown_cancels_everything() {
        let (mut v, rx) = vortex();
        v.initialize();
        v.dispatch(VortexIntent::collapse());
        v.advance(MS(100));
        v.shutdown();
        assert_eq!(v.pending_timers(), 0);
        assert!(v.portals().is_empty());
        assert!(!v.dispatch(VortexIntent::expand()));
        v.advance(MS(10_000));
        assert_eq!(v.now(), MS(100));
        assert_eq!(v.phase(), Phase::Collapsing);
        assert!(rx.try_iter().all(|s| s == VortexSignal::Ready));
    }

    #[test]
    fn collapse_before_initialize_schedules_no_burst() {
        let (mut v, _rx) = vortex();
        assert!(v.dispatch(VortexIntent::collapse()));
        assert_eq!(v.phase(), Phase::Collapsing);
        assert_eq!(v.pending_burst_shots(), 0);
        // Only the settle timer is pending.
        assert_eq!(v.pending_timers(), 1);
        v.advance(MS(1000));
        assert_eq!(v.stats().burst_shots, 0);
        assert_eq!(v.phase(), Phase::Collapsed);
    }

    #[test]
    fn expand_settle_restarts_loop_after_base_delay() {
        let (mut v, _rx) = vortex();
        v.initialize();
        v.dispatch(VortexIntent::collapse());
        v.advance(MS(700));
        v.dispatch(VortexIntent::expand());
        v.advance(MS(700));
        assert_eq!(v.phase(), Phase::Idle);
        assert!(v.portals().is_empty());
        assert_eq!(v.next_deadline(), Some(MS(1410)));
        v.advance(MS(10));
        assert_eq!(v.portals().len(), 1);
    }

    #[test]
    fn next_deadline_tracks_earliest_timer() {
        let (mut v, _rx) = vortex();
        assert_eq!(v.next_deadline(), None);
        v.initialize();
        assert_eq!(v.next_deadline(), Some(MS(0)));
    }
}
