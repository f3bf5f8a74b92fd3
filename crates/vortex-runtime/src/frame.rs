#![forbid(unsafe_code)]

//! Per-frame read model handed to the renderer.
//!
//! A [`Frame`] is a pure function of orchestrator state and clock time.
//! Slot transforms and portal positions are recomputed on every call;
//! nothing is cached per entry.

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use vortex_core::animation::FlightFrame;
use vortex_core::geometry::{SlotStyle, SlotTransform, slot_style};
use vortex_core::image_supply::ImageRef;

use crate::entry::{AnimationPhase, EntryId};
use crate::phase::{ContainerTransform, Phase};
use crate::portal::{PortalSpawner, RequestId};
use crate::stacks::StackQueues;

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Frame {
    /// Clock time of the snapshot.
    pub now: Duration,
    pub phase: Phase,
    pub container: ContainerView,
    /// Every (stack, slot), stack-major.
    pub slots: Vec<SlotView>,
    /// Live portal flights, oldest first.
    pub portals: Vec<PortalView>,
}

impl Frame {
    /// Slot views of one stack.
    pub fn stack(&self, stack: usize) -> impl Iterator<Item = &SlotView> {
        self.slots.iter().filter(move |s| s.stack == stack)
    }

    /// Slots drawn by the static pass (not leaving).
    pub fn visible_slots(&self) -> impl Iterator<Item = &SlotView> {
        self.slots.iter().filter(|s| !s.is_leaving)
    }
}

/// Container transform plus its transition parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContainerView {
    pub transform: ContainerTransform,
    pub transition: Duration,
    pub interactive: bool,
}

/// One resting slot.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SlotView {
    pub stack: usize,
    pub slot: usize,
    pub entry: EntryId,
    pub image: ImageRef,
    pub transform: SlotTransform,
    pub style: SlotStyle,
    /// Effective opacity: zero while the entry is leaving.
    pub opacity: f64,
    pub just_added: bool,
    pub just_promoted: bool,
    pub is_leaving: bool,
}

/// One portal flight sampled at the frame time.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PortalView {
    pub id: RequestId,
    pub entry: EntryId,
    pub image: ImageRef,
    pub z_index: i32,
    pub sample: FlightFrame,
}

pub(crate) fn slot_views(stacks: &StackQueues) -> Vec<SlotView> {
    let depth = stacks.depth();
    let mut views = Vec::with_capacity(stacks.stack_count() * depth);
    for (si, stack) in stacks.stacks().iter().enumerate() {
        for (slot, entry) in stack.iter().enumerate() {
            let style = slot_style(depth, slot);
            let hidden =
                entry.is_leaving || entry.animation_phase == AnimationPhase::MovingToCenter;
            views.push(SlotView {
                stack: si,
                slot,
                entry: entry.id,
                image: entry.image.clone(),
                transform: stacks.slot_transform(si, slot),
                style,
                opacity: if hidden { 0.0 } else { style.opacity },
                just_added: entry.just_added,
                just_promoted: entry.just_promoted,
                is_leaving: entry.is_leaving,
            });
        }
    }
    views
}

pub(crate) fn portal_views(portals: &PortalSpawner, now: Duration) -> Vec<PortalView> {
    portals
        .requests()
        .iter()
        .map(|r| PortalView {
            id: r.id,
            entry: r.entry.id,
            image: r.entry.image.clone(),
            z_index: r.z_index,
            sample: r.sample(now),
        })
        .collect()
}
