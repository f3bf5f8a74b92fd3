#![forbid(unsafe_code)]

//! Virtual clock and owned timer registries.
//!
//! The vortex schedules every piece of work (loop cycles, eviction
//! completions, burst shots, phase settle points) as a task in a
//! [`TimerSet`]. Each component owns its own set; bulk cancellation is a
//! call to [`TimerSet::cancel_all`] or simply dropping the set.
//!
//! Time comes from a [`Clock`] that only moves when the owner advances it,
//! so tests drive the whole orchestrator deterministically.
//!
//! # Usage
//!
//! ```
//! use std::time::Duration;
//! use vortex_core::timer::{Clock, TimerSet};
//!
//! let mut clock = Clock::new();
//! let mut timers = TimerSet::new("example");
//! timers.schedule(&mut clock, Duration::from_millis(20), "late");
//! timers.schedule(&mut clock, Duration::from_millis(10), "early");
//!
//! clock.advance_to(Duration::from_millis(25));
//! assert_eq!(timers.pop_due(clock.now()).map(|(_, t)| t), Some("early"));
//! assert_eq!(timers.pop_due(clock.now()).map(|(_, t)| t), Some("late"));
//! assert!(timers.pop_due(clock.now()).is_none());
//! ```
//!
//! # Invariants
//!
//! 1. Tasks fire in `(deadline, seq)` order. Sequence numbers come from the
//!    shared [`Clock`], so equal deadlines across different sets still fire
//!    in scheduling order.
//! 2. A cancelled task never fires; cancelling twice is a no-op.
//! 3. The clock never moves backwards.
//! 4. Dropping a set discards every pending task.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use crate::logging::trace;

/// Virtual monotonic time plus the global scheduling sequence.
#[derive(Debug, Clone, Default)]
pub struct Clock {
    now: Duration,
    next_seq: u64,
}

impl Clock {
    /// A clock at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    #[inline]
    #[must_use]
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Move the clock forward to `t`. Earlier instants are ignored.
    pub fn advance_to(&mut self, t: Duration) {
        if t > self.now {
            self.now = t;
        }
    }

    fn issue(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}

/// Handle to one scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    /// Raw sequence number, unique across all sets sharing a clock.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Ordering key of a pending task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DueKey {
    pub deadline: Duration,
    pub seq: u64,
}

/// An owned registry of pending tasks of type `T`.
#[derive(Debug)]
pub struct TimerSet<T> {
    label: &'static str,
    queue: BTreeMap<DueKey, T>,
    deadlines: HashMap<TimerId, Duration>,
}

impl<T> TimerSet<T> {
    /// Create an empty set. `label` only appears in logs.
    #[must_use]
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            queue: BTreeMap::new(),
            deadlines: HashMap::new(),
        }
    }

    /// Schedule `task` to fire `delay` after the clock's current time.
    pub fn schedule(&mut self, clock: &mut Clock, delay: Duration, task: T) -> TimerId {
        let seq = clock.issue();
        let deadline = clock.now().saturating_add(delay);
        let id = TimerId(seq);
        self.queue.insert(DueKey { deadline, seq }, task);
        self.deadlines.insert(id, deadline);
        id
    }

    /// Re-arm point of a self-rescheduling chain.
    ///
    /// `still_active` is evaluated first; when it reports `false` nothing is
    /// scheduled and the chain ends here.
    pub fn schedule_if(
        &mut self,
        clock: &mut Clock,
        delay: Duration,
        task: T,
        still_active: impl FnOnce() -> bool,
    ) -> Option<TimerId> {
        if !still_active() {
            trace!(target: "vortex.timer", set = self.label, "re-arm skipped: chain inactive");
            return None;
        }
        Some(self.schedule(clock, delay, task))
    }

    /// Cancel one task. Returns whether it was still pending.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.deadlines.remove(&id) {
            Some(deadline) => self
                .queue
                .remove(&DueKey {
                    deadline,
                    seq: id.0,
                })
                .is_some(),
            None => false,
        }
    }

    /// Cancel every pending task. Returns how many were cancelled.
    pub fn cancel_all(&mut self) -> usize {
        let cancelled = self.queue.len();
        self.queue.clear();
        self.deadlines.clear();
        if cancelled > 0 {
            trace!(target: "vortex.timer", set = self.label, cancelled, "timer set cleared");
        }
        cancelled
    }

    /// Key of the earliest pending task.
    #[must_use]
    pub fn next_due(&self) -> Option<DueKey> {
        self.queue.keys().next().copied()
    }

    /// Remove and return the earliest task if its deadline is at or before
    /// `now`.
    pub fn pop_due(&mut self, now: Duration) -> Option<(TimerId, T)> {
        let key = self.next_due()?;
        if key.deadline > now {
            return None;
        }
        let task = self.queue.remove(&key)?;
        let id = TimerId(key.seq);
        self.deadlines.remove(&id);
        Some((id, task))
    }

    /// Whether `id` is still pending in this set.
    #[must_use]
    pub fn contains(&self, id: TimerId) -> bool {
        self.deadlines.contains_key(&id)
    }

    /// Number of pending tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether no task is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Pending tasks in firing order.
    pub fn pending(&self) -> impl Iterator<Item = (DueKey, &T)> {
        self.queue.iter().map(|(k, t)| (*k, t))
    }

    /// Log label of this set.
    #[must_use]
    pub fn label(&self) -> &'static str {
        self.label
    }
}

impl<T> Drop for TimerSet<T> {
    fn drop(&mut self) {
        if !self.queue.is_empty() {
            trace!(
                target: "vortex.timer",
                set = self.label,
                discarded = self.queue.len(),
                "timer set dropped with pending tasks"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: fn(u64) -> Duration = Duration::from_millis;

    fn drain<T>(set: &mut TimerSet<T>, now: Duration) -> Vec<T> {
        let mut out = Vec::new();
        while let Some((_, task)) = set.pop_due(now) {
            out.push(task);
        }
        out
    }

    #[test]
    fn fires_in_deadline_order() {
        let mut clock = Clock::new();
        let mut set = TimerSet::new("t");
        set.schedule(&mut clock, MS(30), 3);
        set.schedule(&mut clock, MS(10), 1);
        set.schedule(&mut clock, MS(20), 2);
        assert_eq!(drain(&mut set, MS(100)), vec![1, 2, 3]);
    }

    #[test]
    fn equal_deadlines_fire_in_schedule_order() {
        let mut clock = Clock::new();
        let mut set = TimerSet::new("t");
        for i in 0..5 {
            set.schedule(&mut clock, MS(10), i);
        }
        assert_eq!(drain(&mut set, MS(10)), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn not_due_before_deadline() {
        let mut clock = Clock::new();
        let mut set = TimerSet::new("t");
        set.schedule(&mut clock, MS(10), ());
        assert!(set.pop_due(MS(9)).is_none());
        assert!(set.pop_due(MS(10)).is_some());
    }

    #[test]
    fn cancel_removes_single_task() {
        let mut clock = Clock::new();
        let mut set = TimerSet::new("t");
        let a = set.schedule(&mut clock, MS(10), 'a');
        let _b = set.schedule(&mut clock, MS(10), 'b');
        assert!(set.cancel(a));
        assert!(!set.cancel(a));
        assert!(!set.contains(a));
        assert_eq!(drain(&mut set, MS(10)), vec!['b']);
    }

    #[test]
    fn cancel_all_reports_count() {
        let mut clock = Clock::new();
        let mut set = TimerSet::new("t");
        for i in 0..4 {
            set.schedule(&mut clock, MS(i), i);
        }
        assert_eq!(set.cancel_all(), 4);
        assert!(set.is_empty());
        assert_eq!(set.cancel_all(), 0);
    }

    #[test]
    fn schedule_if_respects_predicate() {
        let mut clock = Clock::new();
        let mut set = TimerSet::new("t");
        assert!(set.schedule_if(&mut clock, MS(5), 1, || false).is_none());
        assert!(set.is_empty());
        assert!(set.schedule_if(&mut clock, MS(5), 2, || true).is_some());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn sequence_is_shared_across_sets() {
        let mut clock = Clock::new();
        let mut a = TimerSet::new("a");
        let mut b = TimerSet::new("b");
        a.schedule(&mut clock, MS(10), ());
        b.schedule(&mut clock, MS(10), ());
        let ka = a.next_due().unwrap();
        let kb = b.next_due().unwrap();
        assert!(ka < kb);
    }

    #[test]
    fn delays_are_relative_to_clock() {
        let mut clock = Clock::new();
        clock.advance_to(MS(100));
        let mut set = TimerSet::new("t");
        set.schedule(&mut clock, MS(5), ());
        assert_eq!(set.next_due().unwrap().deadline, MS(105));
    }

    #[test]
    fn clock_is_monotonic() {
        let mut clock = Clock::new();
        clock.advance_to(MS(50));
        clock.advance_to(MS(20));
        assert_eq!(clock.now(), MS(50));
    }
}
