#![forbid(unsafe_code)]

//! Continuous per-stack eviction loop.
//!
//! A loop *session* is one [`TimerSet`] holding every pending cycle and
//! completion of every stack. Starting a session staggers the first cycle
//! of stack `i` by `i * stagger`. Each cycle evicts the head, and its
//! completion re-arms the next cycle after the current inter-eviction
//! delay:
//!
//! ```text
//! Cycle{s} ──(flight duration)──▶ Complete{s} ──(delay)──▶ Cycle{s} ...
//! ```
//!
//! # Invariants
//!
//! 1. Suppressing the loop drops the session: no cycle or completion of
//!    that session fires afterwards.
//! 2. Every re-arm point checks the suppression flag through
//!    [`TimerSet::schedule_if`], so a chain link that observes suppression
//!    ends the chain.
//! 3. At most one session exists at a time; starting a new one drops the
//!    previous one.

use std::time::Duration;

use vortex_core::timer::{Clock, DueKey, TimerId, TimerSet};

/// One step of a stack's loop chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopTask {
    /// Evict the head of `stack` and launch its flight.
    Cycle { stack: usize },
    /// Flight landed: rotate `stack` and re-arm.
    Complete { stack: usize, epoch: u64 },
}

#[derive(Debug)]
pub struct LoopScheduler {
    suppressed: bool,
    stagger: Duration,
    session: Option<TimerSet<LoopTask>>,
    sessions: u64,
}

impl LoopScheduler {
    #[must_use]
    pub fn new(stagger: Duration, suppressed: bool) -> Self {
        Self {
            suppressed,
            stagger,
            session: None,
            sessions: 0,
        }
    }

    /// Start a fresh session for `stack_count` stacks.
    ///
    /// Returns `false` and schedules nothing while suppressed.
    pub fn start(&mut self, clock: &mut Clock, stack_count: usize) -> bool {
        self.start_after(clock, stack_count, Duration::ZERO)
    }

    /// Like [`start`](Self::start), with every cycle shifted by `lead`.
    pub fn start_after(&mut self, clock: &mut Clock, stack_count: usize, lead: Duration) -> bool {
        self.stop();
        if self.suppressed {
            tracing::debug!(target: "vortex.loop", "loop start skipped: suppressed");
            return false;
        }
        let mut set = TimerSet::new("loop");
        let mut offset = lead;
        for stack in 0..stack_count {
            set.schedule(clock, offset, LoopTask::Cycle { stack });
            offset = offset.saturating_add(self.stagger);
        }
        self.session = Some(set);
        self.sessions += 1;
        tracing::debug!(
            target: "vortex.loop",
            stacks = stack_count,
            lead_ms = u64::try_from(lead.as_millis()).unwrap_or(u64::MAX),
            session = self.sessions,
            "loop session started"
        );
        true
    }

    /// Assert suppression and drop the session. Returns the number of
    /// cancelled tasks.
    pub fn suppress(&mut self) -> usize {
        self.suppressed = true;
        let cancelled = self.stop();
        tracing::debug!(target: "vortex.loop", cancelled, "loop suppressed");
        cancelled
    }

    /// Lift suppression. The caller starts a new session.
    pub fn resume(&mut self) {
        self.suppressed = false;
    }

    /// Drop the session without touching the suppression flag. Returns the
    /// number of cancelled tasks.
    pub fn stop(&mut self) -> usize {
        match self.session.take() {
            Some(mut set) => set.cancel_all(),
            None => 0,
        }
    }

    #[must_use]
    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    /// Whether a session is live.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    /// Number of sessions started so far.
    #[must_use]
    pub fn sessions(&self) -> u64 {
        self.sessions
    }

    #[must_use]
    pub fn next_due(&self) -> Option<DueKey> {
        self.session.as_ref()?.next_due()
    }

    pub fn pop_due(&mut self, now: Duration) -> Option<LoopTask> {
        let session = self.session.as_mut()?;
        session.pop_due(now).map(|(_, task)| task)
    }

    /// Schedule the completion of a cycle that just evicted.
    pub fn schedule_completion(
        &mut self,
        clock: &mut Clock,
        stack: usize,
        epoch: u64,
        duration: Duration,
    ) -> Option<TimerId> {
        let suppressed = self.suppressed;
        let session = self.session.as_mut()?;
        session.schedule_if(clock, duration, LoopTask::Complete { stack, epoch }, || {
            !suppressed
        })
    }

    /// Re-arm the next cycle of `stack` after `delay`.
    pub fn schedule_next_cycle(
        &mut self,
        clock: &mut Clock,
        stack: usize,
        delay: Duration,
    ) -> Option<TimerId> {
        let suppressed = self.suppressed;
        let session = self.session.as_mut()?;
        session.schedule_if(clock, delay, LoopTask::Cycle { stack }, || !suppressed)
    }

    /// Number of pending tasks in the live session.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.session.as_ref().map_or(0, TimerSet::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: fn(u64) -> Duration = Duration::from_millis;

    fn drain(s: &mut LoopScheduler, now: Duration) -> Vec<LoopTask> {
        let mut out = Vec::new();
        while let Some(t) = s.pop_due(now) {
            out.push(t);
        }
        out
    }

    #[test]
    fn start_staggers_stacks() {
        let mut clock = Clock::new();
        let mut s = LoopScheduler::new(MS(200), false);
        assert!(s.start(&mut clock, 6));
        assert_eq!(s.pending(), 6);
        assert_eq!(drain(&mut s, MS(0)), vec![LoopTask::Cycle { stack: 0 }]);
        assert_eq!(
            drain(&mut s, MS(400)),
            vec![LoopTask::Cycle { stack: 1 }, LoopTask::Cycle { stack: 2 }]
        );
        assert_eq!(drain(&mut s, MS(1000)).len(), 3);
    }

    #[test]
    fn start_after_shifts_every_cycle() {
        let mut clock = Clock::new();
        let mut s = LoopScheduler::new(MS(200), false);
        assert!(s.start_after(&mut clock, 3, MS(10)));
        assert!(drain(&mut s, MS(9)).is_empty());
        assert_eq!(drain(&mut s, MS(10)), vec![LoopTask::Cycle { stack: 0 }]);
        assert_eq!(drain(&mut s, MS(410)).len(), 2);
    }

    #[test]
    fn suppressed_start_schedules_nothing() {
        let mut clock = Clock::new();
        let mut s = LoopScheduler::new(MS(200), true);
        assert!(!s.start(&mut clock, 6));
        assert!(!s.is_running());
        assert_eq!(s.pending(), 0);
    }

    #[test]
    fn suppress_cancels_everything() {
        let mut clock = Clock::new();
        let mut s = LoopScheduler::new(MS(200), false);
        s.start(&mut clock, 6);
        s.schedule_completion(&mut clock, 0, 1, MS(50));
        assert_eq!(s.suppress(), 7);
        assert!(drain(&mut s, MS(10_000)).is_empty());
        assert!(s.schedule_next_cycle(&mut clock, 0, MS(1)).is_none());
    }

    #[test]
    fn rearm_respects_suppression() {
        let mut clock = Clock::new();
        let mut s = LoopScheduler::new(MS(200), false);
        s.start(&mut clock, 1);
        assert!(s.schedule_next_cycle(&mut clock, 0, MS(10)).is_some());
        s.suppressed = true;
        assert!(s.schedule_next_cycle(&mut clock, 0, MS(10)).is_none());
        assert!(s.schedule_completion(&mut clock, 0, 0, MS(10)).is_none());
    }

    #[test]
    fn restart_replaces_session() {
        let mut clock = Clock::new();
        let mut s = LoopScheduler::new(MS(200), false);
        s.start(&mut clock, 6);
        clock.advance_to(MS(100));
        s.start(&mut clock, 2);
        assert_eq!(s.pending(), 2);
        assert_eq!(s.sessions(), 2);
        assert_eq!(s.next_due().map(|k| k.deadline), Some(MS(100)));
    }

    #[test]
    fn resume_then_start() {
        let mut clock = Clock::new();
        let mut s = LoopScheduler::new(MS(200), true);
        s.resume();
        assert!(s.start(&mut clock, 3));
        assert!(!s.is_suppressed());
    }
}
