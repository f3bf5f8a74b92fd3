#![forbid(unsafe_code)]

//! Burst flood: a high-volume eviction burst launched on collapse.
//!
//! A flood schedules `items_per_stack` shots for every stack, shot
//! `(stack, item)` firing at
//!
//! ```text
//! stack * stagger + item * step
//! ```
//!
//! after the trigger. Each shot evicts the stack head with a short, fixed
//! flight duration, and its landing rotates the stack.
//!
//! Shots and landings live in separate timer sets. A new flood cancels
//! only the pending shots of the previous one, so landings already in the
//! air still restore their stacks. [`BurstFlood::cancel`] drops both.

use std::time::Duration;

use vortex_core::timer::{Clock, DueKey, TimerSet};

use crate::config::BurstConfig;

/// A due burst task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BurstTask {
    /// Evict the head of `stack`; `item` is the shot's index in its stack.
    Shot { stack: usize, item: usize },
    /// A burst flight from `stack` landed.
    Land { stack: usize, epoch: u64 },
}

#[derive(Debug)]
pub struct BurstFlood {
    items_per_stack: usize,
    step: Duration,
    stagger: Duration,
    flight: Duration,
    shots: TimerSet<BurstTask>,
    landings: TimerSet<BurstTask>,
    floods: u64,
}

impl BurstFlood {
    #[must_use]
    pub fn new(config: &BurstConfig) -> Self {
        Self {
            items_per_stack: config.items_per_stack,
            step: Duration::from_millis(config.step_ms),
            stagger: Duration::from_millis(config.stagger_ms),
            flight: Duration::from_millis(config.flight_ms),
            shots: TimerSet::new("burst.shots"),
            landings: TimerSet::new("burst.landings"),
            floods: 0,
        }
    }

    /// Delay of shot `(stack, item)` after the trigger.
    #[must_use]
    pub fn burst_offset(&self, stack: usize, item: usize) -> Duration {
        let stack = u32::try_from(stack).unwrap_or(u32::MAX);
        let item = u32::try_from(item).unwrap_or(u32::MAX);
        self.stagger
            .saturating_mul(stack)
            .saturating_add(self.step.saturating_mul(item))
    }

    /// Flight duration of every burst shot.
    #[must_use]
    pub fn flight_duration(&self) -> Duration {
        self.flight
    }

    /// Launch a flood over `stack_count` stacks. Pending shots of a
    /// previous flood are cancelled first. Returns the number of shots
    /// scheduled.
    pub fn trigger(&mut self, clock: &mut Clock, stack_count: usize) -> usize {
        let replaced = self.shots.cancel_all();
        for stack in 0..stack_count {
            for item in 0..self.items_per_stack {
                let delay = self.burst_offset(stack, item);
                self.shots
                    .schedule(clock, delay, BurstTask::Shot { stack, item });
            }
        }
        self.floods += 1;
        let scheduled = self.shots.len();
        tracing::debug!(
            target: "vortex.burst",
            flood = self.floods,
            scheduled,
            replaced,
            "burst flood scheduled"
        );
        scheduled
    }

    /// Schedule the landing of a shot that just evicted.
    pub fn schedule_landing(&mut self, clock: &mut Clock, stack: usize, epoch: u64) {
        self.landings
            .schedule(clock, self.flight, BurstTask::Land { stack, epoch });
    }

    /// Cancel pending shots and landings. Returns the number cancelled.
    pub fn cancel(&mut self) -> usize {
        let cancelled = self.shots.cancel_all() + self.landings.cancel_all();
        if cancelled > 0 {
            tracing::debug!(target: "vortex.burst", cancelled, "burst flood cancelled");
        }
        cancelled
    }

    #[must_use]
    pub fn next_due(&self) -> Option<DueKey> {
        match (self.shots.next_due(), self.landings.next_due()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Pop the earliest due task across shots and landings.
    pub fn pop_due(&mut self, now: Duration) -> Option<BurstTask> {
        let shot = self.shots.next_due();
        let land = self.landings.next_due();
        let from_shots = match (shot, land) {
            (Some(a), Some(b)) => a < b,
            (Some(_), None) => true,
            (None, _) => false,
        };
        let set = if from_shots {
            &mut self.shots
        } else {
            &mut self.landings
        };
        set.pop_due(now).map(|(_, task)| task)
    }

    #[must_use]
    pub fn pending_shots(&self) -> usize {
        self.shots.len()
    }

    #[must_use]
    pub fn pending_landings(&self) -> usize {
        self.landings.len()
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.shots.len() + self.landings.len()
    }

    /// Number of floods triggered so far.
    #[must_use]
    pub fn floods(&self) -> u64 {
        self.floods
    }
}
