#![forbid(unsafe_code)]

//! Image entries held by the stacks.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use vortex_core::image_supply::ImageRef;

/// Identity of one entry.
///
/// Minted from an orchestrator-wide counter, so identities never repeat
/// even across stacks. An image that re-enters the back of a queue gets a
/// fresh identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EntryId {
    pub stack: usize,
    pub seq: u64,
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "img-{}-", self.stack)?;
        write_base36(f, self.seq)
    }
}

fn write_base36(f: &mut fmt::Formatter<'_>, mut n: u64) -> fmt::Result {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut buf = [0u8; 13];
    let mut i = buf.len();
    loop {
        i -= 1;
        buf[i] = DIGITS[(n % 36) as usize];
        n /= 36;
        if n == 0 {
            break;
        }
    }
    // Only ASCII digits were written.
    f.write_str(std::str::from_utf8(&buf[i..]).map_err(|_| fmt::Error)?)
}

/// Where an entry is in its flight lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum AnimationPhase {
    #[default]
    Idle,
    MovingToCenter,
}

/// One image in a stack plus its transient presentation hints.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ImageEntry {
    pub id: EntryId,
    pub image: ImageRef,
    pub is_animating: bool,
    pub animation_phase: AnimationPhase,
    /// Entered the tail of its stack since the renderer last acknowledged.
    pub just_added: bool,
    /// Moved up into slot 0 since the renderer last acknowledged.
    pub just_promoted: bool,
    /// Flying to the center; hidden from the static pass.
    pub is_leaving: bool,
}

impl ImageEntry {
    /// A fresh entry with every flag cleared.
    #[must_use]
    pub fn new(id: EntryId, image: ImageRef) -> Self {
        Self {
            id,
            image,
            is_animating: false,
            animation_phase: AnimationPhase::Idle,
            just_added: false,
            just_promoted: false,
            is_leaving: false,
        }
    }

    /// Clear every transient flag.
    pub fn reset_flags(&mut self) {
        self.is_animating = false;
        self.animation_phase = AnimationPhase::Idle;
        self.just_added = false;
        self.just_promoted = false;
        self.is_leaving = false;
    }

    /// Whether any transient flag is set.
    #[must_use]
    pub fn has_flags(&self) -> bool {
        self.is_animating
            || self.animation_phase != AnimationPhase::Idle
            || self.just_added
            || self.just_promoted
            || self.is_leaving
    }
}
