#![forbid(unsafe_code)]

//! Wall-clock driver.
//!
//! The orchestrator only knows virtual time. [`RealtimeDriver`] maps
//! elapsed wall-clock time since its creation onto that virtual clock, so
//! a frame loop calls [`RealtimeDriver::tick`] once per frame and reads
//! [`Vortex::frame`] afterwards.

use std::time::Duration;

use web_time::Instant;

use crate::frame::Frame;
use crate::vortex::Vortex;

#[derive(Debug, Clone, Copy)]
pub struct RealtimeDriver {
    origin: Instant,
    /// Largest step applied per tick; longer stalls are skipped rather than
    /// replayed.
    max_step: Duration,
}

impl RealtimeDriver {
    /// Driver anchored at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_step(Duration::from_secs(1))
    }

    #[must_use]
    pub fn with_max_step(max_step: Duration) -> Self {
        Self {
            origin: Instant::now(),
            max_step,
        }
    }

    /// Wall-clock time since the driver was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }

    /// Bring `vortex` up to the current wall-clock time and return the
    /// frame to draw.
    pub fn tick(&mut self, vortex: &mut Vortex) -> Frame {
        let target = self.elapsed();
        let behind = target.saturating_sub(vortex.now());
        if behind > self.max_step {
            let skipped = behind - self.max_step;
            tracing::debug!(
                target: "vortex.loop",
                skipped_ms = skipped.as_millis() as u64,
                "driver stalled, skipping ahead"
            );
            self.origin += skipped;
        }
        vortex.advance(self.elapsed().saturating_sub(vortex.now()).min(self.max_step));
        vortex.frame()
    }
}

impl Default for RealtimeDriver {
    fn default() -> Self {
        Self::new()
    }
}
