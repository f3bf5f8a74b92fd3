#![forbid(unsafe_code)]

//! Stack queue manager: N fixed-position queues of K image entries.
//!
//! Eviction is a two-step operation. [`StackQueues::evict_head`] marks the
//! head as leaving so the static pass hides it while its portal flight
//! plays; [`StackQueues::complete_eviction`] later drops the head and
//! appends a fresh entry at the tail.
//!
//! # Invariants
//!
//! 1. Outside the window between `evict_head` and `complete_eviction`,
//!    every stack holds exactly K entries. `complete_eviction` pads a short
//!    stack back to K.
//! 2. Only the head (slot 0) is ever evicted; new entries only enter at
//!    the tail.
//! 3. [`StackQueues::normalize_hard`] is idempotent and starts a new epoch.
//!    Completions carry the epoch they were scheduled in; a completion from
//!    an older epoch is a no-op, so an in-flight eviction can never
//!    reintroduce stale state after a reset.
//!
//! # Failure Modes
//!
//! - Evicting from an empty or unknown stack returns `None`.
//! - Slot transforms requested before initialization are neutral.

use std::collections::VecDeque;

use vortex_core::geometry::{CurveParams, FanLayout, SlotTransform, StackPosition};
use vortex_core::image_supply::ImageSupply;

use crate::entry::{EntryId, ImageEntry};

/// Owner of every stack, the image supply, and the stack positions.
#[derive(Debug, Clone)]
pub struct StackQueues {
    layout: FanLayout,
    curves: Vec<CurveParams>,
    supply: ImageSupply,
    stacks: Vec<VecDeque<ImageEntry>>,
    positions: Vec<StackPosition>,
    next_seq: u64,
    epoch: u64,
}

impl StackQueues {
    /// An uninitialized manager: no stacks, no positions.
    #[must_use]
    pub fn new(layout: FanLayout, curves: Vec<CurveParams>, supply: ImageSupply) -> Self {
        Self {
            layout,
            curves,
            supply,
            stacks: Vec::new(),
            positions: Vec::new(),
            next_seq: 0,
            epoch: 0,
        }
    }

    /// Populate every stack with K fresh entries and compute positions.
    ///
    /// Calling this again replaces all stacks and starts a new epoch.
    pub fn initialize(&mut self) {
        let (count, depth) = (self.layout.stack_count, self.layout.depth);
        let mut stacks = Vec::with_capacity(count);
        for si in 0..count {
            let stack: VecDeque<ImageEntry> = (0..depth).map(|_| self.mint(si)).collect();
            stacks.push(stack);
        }
        self.stacks = stacks;
        self.positions = self.layout.stack_positions(&self.curves);
        self.epoch += 1;
        tracing::debug!(
            target: "vortex.stacks",
            stacks = count,
            depth,
            epoch = self.epoch,
            "stacks initialized"
        );
    }

    /// Whether both stacks and positions exist.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        !self.stacks.is_empty() && !self.positions.is_empty()
    }

    /// A fresh entry for `stack_index`, drawing the next image.
    fn mint(&mut self, stack_index: usize) -> ImageEntry {
        let id = EntryId {
            stack: stack_index,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        ImageEntry::new(id, self.supply.next_image(stack_index))
    }

    /// Mark the head of `stack_index` as leaving and return a snapshot.
    ///
    /// With `promote_next`, the entry behind the head is flagged
    /// `just_promoted`. The head stays in the queue until
    /// [`complete_eviction`](Self::complete_eviction).
    pub fn evict_head(&mut self, stack_index: usize, promote_next: bool) -> Option<ImageEntry> {
        let stack = self.stacks.get_mut(stack_index)?;
        let head = stack.front_mut()?;
        head.is_leaving = true;
        head.is_animating = true;
        let snapshot = head.clone();
        if promote_next && let Some(next) = stack.get_mut(1) {
            next.just_promoted = true;
        }
        Some(snapshot)
    }

    /// Drop the head of `stack_index` and append a fresh entry.
    ///
    /// Returns the new tail's id, or `None` when `epoch` is stale or the
    /// stack does not exist.
    pub fn complete_eviction(&mut self, stack_index: usize, epoch: u64) -> Option<EntryId> {
        if epoch != self.epoch {
            tracing::debug!(
                target: "vortex.stacks",
                stack = stack_index,
                stale_epoch = epoch,
                epoch = self.epoch,
                "stale eviction completion ignored"
            );
            return None;
        }
        if stack_index >= self.stacks.len() {
            return None;
        }

        let mut fresh = self.mint(stack_index);
        fresh.just_added = true;
        let id = fresh.id;

        let depth = self.layout.depth;
        let stack = &mut self.stacks[stack_index];
        stack.pop_front();
        stack.push_back(fresh);

        if stack.len() < depth {
            let missing = depth - stack.len();
            tracing::warn!(
                target: "vortex.stacks",
                stack = stack_index,
                missing,
                "stack short after eviction, padding"
            );
            for _ in 0..missing {
                let pad = self.mint(stack_index);
                self.stacks[stack_index].push_back(pad);
            }
        }
        Some(id)
    }

    /// Truncate or pad every stack to exactly K and clear every flag.
    ///
    /// Starts a new epoch so pending completions become no-ops.
    pub fn normalize_hard(&mut self) {
        let depth = self.layout.depth;
        let mut padded = 0usize;
        for si in 0..self.stacks.len() {
            self.stacks[si].truncate(depth);
            for entry in self.stacks[si].iter_mut() {
                entry.reset_flags();
            }
            while self.stacks[si].len() < depth {
                let pad = self.mint(si);
                self.stacks[si].push_back(pad);
                padded += 1;
            }
        }
        self.epoch += 1;
        tracing::debug!(
            target: "vortex.stacks",
            epoch = self.epoch,
            padded,
            "stacks normalized"
        );
    }

    /// Clear `just_added` and `just_promoted` on every entry.
    pub fn acknowledge_hints(&mut self) {
        for entry in self.stacks.iter_mut().flatten() {
            entry.just_added = false;
            entry.just_promoted = false;
        }
    }

    /// Visual transform of `(stack_index, slot_index)`.
    #[must_use]
    pub fn slot_transform(&self, stack_index: usize, slot_index: usize) -> SlotTransform {
        self.layout
            .slot_transform(&self.positions, stack_index, slot_index)
    }

    /// Current normalization epoch.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// All stacks, head first.
    #[must_use]
    pub fn stacks(&self) -> &[VecDeque<ImageEntry>] {
        &self.stacks
    }

    /// One stack, head first.
    #[must_use]
    pub fn stack(&self, stack_index: usize) -> Option<&VecDeque<ImageEntry>> {
        self.stacks.get(stack_index)
    }

    /// Mutable access to one stack.
    pub fn stack_mut(&mut self, stack_index: usize) -> Option<&mut VecDeque<ImageEntry>> {
        self.stacks.get_mut(stack_index)
    }

    /// Fixed stack positions (empty before initialization).
    #[must_use]
    pub fn positions(&self) -> &[StackPosition] {
        &self.positions
    }

    /// Position of one stack.
    #[must_use]
    pub fn position(&self, stack_index: usize) -> Option<&StackPosition> {
        self.positions.get(stack_index)
    }

    /// Configured depth K.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.layout.depth
    }

    /// Configured stack count N.
    #[must_use]
    pub fn stack_count(&self) -> usize {
        self.layout.stack_count
    }

    /// Layout used for slot transforms.
    #[must_use]
    pub fn layout(&self) -> &FanLayout {
        &self.layout
    }

    /// Total number of entries minted so far.
    #[must_use]
    pub fn minted(&self) -> u64 {
        self.next_seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vortex_core::geometry::DEFAULT_CURVES;
    use vortex_core::image_supply::ImageRef;

    fn queues(n: usize, k: usize) -> StackQueues {
        let layout = FanLayout {
            stack_count: n,
            depth: k,
            radius_x: 500.0,
            radius_y: 700.0,
            fan_spread: 20.0,
            fan_rotation: 3.0,
            scale_base: 0.7,
            scale_span: 0.7,
        };
        let pool = (0..60).map(|i| ImageRef::new(format!("v/{i}.jpg"))).collect();
        let supply = ImageSupply::new(pool, n).unwrap();
        StackQueues::new(layout, DEFAULT_CURVES.to_vec(), supply)
    }

    fn ready(n: usize, k: usize) -> StackQueues {
        let mut q = queues(n, k);
        q.initialize();
        q
    }

    #[test]
    fn uninitialized_is_soft() {
        let mut q = queues(6, 10);
        assert!(!q.is_initialized());
        assert!(q.evict_head(0, true).is_none());
        assert_eq!(q.slot_transform(2, 3), SlotTransform::NEUTRAL);
        assert!(q.complete_eviction(0, q.epoch()).is_none());
    }

    #[test]
    fn initialize_fills_every_stack() {
        let q = ready(6, 10);
        assert!(q.is_initialized());
        assert_eq!(q.stacks().len(), 6);
        assert!(q.stacks().iter().all(|s| s.len() == 10));
        assert_eq!(q.positions().len(), 6);
        assert_eq!(q.minted(), 60);
        assert!(q.stacks().iter().flatten().all(|e| !e.has_flags()));
    }

    #[test]
    fn initial_images_come_from_each_stack_slice() {
        let q = ready(6, 10);
        // 60 images / 6 stacks = 10 per stack
        let stack2 = q.stack(2).unwrap();
        assert_eq!(stack2[0].image.as_str(), "v/20.jpg");
        assert_eq!(stack2[9].image.as_str(), "v/29.jpg");
    }

    #[test]
    fn evict_marks_head_but_keeps_it() {
        let mut q = ready(6, 10);
        let head_id = q.stack(1).unwrap()[0].id;
        let snap = q.evict_head(1, true).unwrap();
        assert_eq!(snap.id, head_id);
        assert!(snap.is_leaving && snap.is_animating);
        let stack = q.stack(1).unwrap();
        assert_eq!(stack.len(), 10);
        assert!(stack[0].is_leaving);
        assert!(stack[1].just_promoted);
    }

    #[test]
    fn evict_without_promotion() {
        let mut q = ready(6, 10);
        q.evict_head(0, false);
        assert!(!q.stack(0).unwrap()[1].just_promoted);
    }

    #[test]
    fn completion_rotates_queue() {
        let mut q = ready(6, 10);
        let second = q.stack(4).unwrap()[1].id;
        q.evict_head(4, true);
        let tail = q.complete_eviction(4, q.epoch()).unwrap();
        let stack = q.stack(4).unwrap();
        assert_eq!(stack.len(), 10);
        assert_eq!(stack[0].id, second);
        assert_eq!(stack[9].id, tail);
        assert!(stack[9].just_added);
        assert!(!stack[9].is_leaving);
    }

    #[test]
    fn stale_completion_is_noop() {
        let mut q = ready(6, 10);
        let epoch = q.epoch();
        q.evict_head(0, true);
        q.normalize_hard();
        let before = q.stacks().to_vec();
        assert!(q.complete_eviction(0, epoch).is_none());
        assert_eq!(q.stacks(), &before[..]);
    }

    #[test]
    fn completion_pads_short_stack() {
        let mut q = ready(3, 5);
        q.stack_mut(2).unwrap().truncate(2);
        q.complete_eviction(2, q.epoch()).unwrap();
        assert_eq!(q.stack(2).unwrap().len(), 5);
    }

    #[test]
    fn completion_on_empty_stack_restores_depth() {
        let mut q = ready(3, 5);
        q.stack_mut(0).unwrap().clear();
        assert!(q.evict_head(0, true).is_none());
        q.complete_eviction(0, q.epoch()).unwrap();
        assert_eq!(q.stack(0).unwrap().len(), 5);
    }

    #[test]
    fn normalize_truncates_pads_and_clears() {
        let mut q = ready(3, 5);
        q.evict_head(0, true);
        q.complete_eviction(0, q.epoch());
        q.evict_head(1, true);
        q.stack_mut(2).unwrap().truncate(1);
        let extra = q.stack(0).unwrap()[0].clone();
        q.stack_mut(0).unwrap().push_back(extra);

        q.normalize_hard();
        for stack in q.stacks() {
            assert_eq!(stack.len(), 5);
            assert!(stack.iter().all(|e| !e.has_flags()));
        }
    }

    #[test]
    fn normalize_is_idempotent() {
        let mut q = ready(6, 10);
        q.evict_head(3, true);
        q.stack_mut(5).unwrap().truncate(4);
        q.normalize_hard();
        let once = q.stacks().to_vec();
        q.normalize_hard();
        assert_eq!(q.stacks(), &once[..]);
    }

    #[test]
    fn evicting_a_leaving_head_targets_it_again() {
        let mut q = ready(2, 4);
        let first = q.evict_head(0, false).unwrap();
        let again = q.evict_head(0, false).unwrap();
        assert_eq!(first.id, again.id);
        let epoch = q.epoch();
        q.complete_eviction(0, epoch);
        q.complete_eviction(0, epoch);
        assert_eq!(q.stack(0).unwrap().len(), 4);
    }

    #[test]
    fn acknowledge_clears_hints_only() {
        let mut q = ready(2, 4);
        q.evict_head(0, true);
        q.evict_head(1, true);
        q.complete_eviction(1, q.epoch());
        q.acknowledge_hints();
        assert!(q
            .stacks()
            .iter()
            .flatten()
            .all(|e| !e.just_added && !e.just_promoted));
        assert!(q.stack(0).unwrap()[0].is_leaving);
    }

    #[test]
    fn reinitialize_starts_new_epoch() {
        let mut q = ready(2, 4);
        let epoch = q.epoch();
        q.evict_head(0, true);
        q.initialize();
        assert!(q.epoch() > epoch);
        assert!(q.complete_eviction(0, epoch).is_none());
        assert_eq!(q.minted(), 16);
    }
}
