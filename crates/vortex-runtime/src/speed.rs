#![forbid(unsafe_code)]

//! Loop speed: flight duration and inter-eviction delay.
//!
//! Both values are shared by every stack. A boost divides the duration
//! linearly and the delay logarithmically, each floored at a configured
//! minimum:
//!
//! ```text
//! duration = max(min_duration, floor(base_duration / boost))
//! delay    = max(min_delay,    floor(base_delay / max(1, log2(boost) + 0.5)))
//! ```
//!
//! Values change mid-flight; a cycle already scheduled keeps the timing it
//! was scheduled with, the next cycle picks up the new one.

use std::time::Duration;

use crate::config::SpeedConfig;

/// Current and base loop timing.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedParams {
    base_duration_ms: u64,
    base_delay_ms: u64,
    min_duration_ms: u64,
    min_delay_ms: u64,
    default_boost: f64,
    duration_ms: u64,
    delay_ms: u64,
    boost: Option<f64>,
}

impl SpeedParams {
    /// Speed at base values.
    #[must_use]
    pub fn new(config: &SpeedConfig) -> Self {
        Self {
            base_duration_ms: config.base_duration_ms,
            base_delay_ms: config.base_delay_ms,
            min_duration_ms: config.min_duration_ms,
            min_delay_ms: config.min_delay_ms,
            default_boost: config.default_boost,
            duration_ms: config.base_duration_ms,
            delay_ms: config.base_delay_ms,
            boost: None,
        }
    }

    /// Flight duration of the next loop cycle.
    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// Pause before the next loop cycle.
    #[must_use]
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Boost currently applied, if any.
    #[must_use]
    pub fn active_boost(&self) -> Option<f64> {
        self.boost
    }

    /// Whether duration and delay sit at their base values.
    #[must_use]
    pub fn is_base(&self) -> bool {
        self.duration_ms == self.base_duration_ms && self.delay_ms == self.base_delay_ms
    }

    /// Resolve a requested boost: `None` and unusable factors (non-finite
    /// or not positive) become the default boost.
    #[must_use]
    pub fn resolve_boost(&self, requested: Option<f64>) -> f64 {
        match requested {
            Some(b) if b.is_finite() && b > 0.0 => b,
            Some(b) => {
                tracing::warn!(
                    target: "vortex.speed",
                    requested = b,
                    fallback = self.default_boost,
                    "unusable boost factor, using default"
                );
                self.default_boost
            }
            None => self.default_boost,
        }
    }

    /// Apply a boost and return the factor actually used.
    pub fn boost(&mut self, requested: Option<f64>) -> f64 {
        let boost = self.resolve_boost(requested);

        let duration = (self.base_duration_ms as f64 / boost).floor();
        self.duration_ms = clamp_ms(duration).max(self.min_duration_ms);

        let divisor = (boost.log2() + 0.5).max(1.0);
        let delay = (self.base_delay_ms as f64 / divisor).floor();
        self.delay_ms = clamp_ms(delay).max(self.min_delay_ms);

        self.boost = Some(boost);
        tracing::debug!(
            target: "vortex.speed",
            boost,
            duration_ms = self.duration_ms,
            delay_ms = self.delay_ms,
            "speed boosted"
        );
        boost
    }

    /// Return to base values.
    pub fn reset(&mut self) {
        self.duration_ms = self.base_duration_ms;
        self.delay_ms = self.base_delay_ms;
        self.boost = None;
    }
}

fn clamp_ms(ms: f64) -> u64 {
    if ms.is_nan() || ms <= 0.0 {
        0
    } else if ms >= u64::MAX as f64 {
        u64::MAX
    } else {
        ms as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn speed() -> SpeedParams {
        SpeedParams::new(&SpeedConfig::default())
    }

    #[test]
    fn starts_at_base() {
        let s = speed();
        assert_eq!(s.duration(), Duration::from_millis(1500));
        assert_eq!(s.delay(), Duration::from_millis(10));
        assert!(s.is_base());
        assert_eq!(s.active_boost(), None);
    }

    #[test]
    fn default_boost_hits_duration_floor() {
        let mut s = speed();
        assert_eq!(s.boost(None), 10.0);
        // 1500 / 10 = 150 < 180
        assert_eq!(s.duration(), Duration::from_millis(180));
        // 10 / (log2(10) + 0.5) = 2.61 -> 2
        assert_eq!(s.delay(), Duration::from_millis(2));
        assert!(!s.is_base());
    }

    #[test]
    fn mild_boost_divides_duration() {
        let mut s = speed();
        s.boost(Some(4.0));
        assert_eq!(s.duration(), Duration::from_millis(375));
        // 10 / 2.5 = 4
        assert_eq!(s.delay(), Duration::from_millis(4));
    }

    #[test]
    fn boost_below_one_slows_down() {
        let mut s = speed();
        s.boost(Some(0.5));
        assert_eq!(s.duration(), Duration::from_millis(3000));
        // log2(0.5) + 0.5 < 1, so the divisor is 1
        assert_eq!(s.delay(), Duration::from_millis(10));
    }

    #[test]
    fn unusable_boost_falls_back_to_default() {
        let mut s = speed();
        assert_eq!(s.boost(Some(0.0)), 10.0);
        assert_eq!(s.boost(Some(f64::NAN)), 10.0);
        assert_eq!(s.boost(Some(-3.0)), 10.0);
        assert_eq!(s.boost(Some(f64::INFINITY)), 10.0);
        assert_eq!(s.duration(), Duration::from_millis(180));
    }

    #[test]
    fn reset_restores_base() {
        let mut s = speed();
        s.boost(Some(10.0));
        s.reset();
        assert!(s.is_base());
        assert_eq!(s.active_boost(), None);
    }
}
