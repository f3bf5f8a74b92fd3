#![forbid(unsafe_code)]

//! Tuning knobs for the vortex orchestrator.
//!
//! Every timing, layout, and styling constant lives in one
//! [`VortexConfig`]. The defaults reproduce the stock vortex: six stacks of
//! ten images, 1.5 s flights, 700 ms collapse/expand transitions, and a
//! 14-image burst per stack on collapse.
//!
//! A config is fixed for the lifetime of the [`Vortex`](crate::Vortex) that
//! receives it. Changing any value changes the look and pace of the
//! animation, never its correctness invariants.
//!
//! # Loading
//!
//! ```toml
//! # vortex.toml
//! stack_count = 8
//!
//! [burst]
//! items_per_stack = 20
//! ```
//!
//! ```rust,ignore
//! let config = VortexConfig::from_toml_file("vortex.toml")?;
//! let config = VortexConfig::from_json_str(json)?;
//! ```
//!
//! Missing fields take their defaults. Loaded configs are validated before
//! they are returned.

#[cfg(feature = "config-file")]
use std::path::Path;
use std::fmt;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use vortex_core::geometry::{CurveParams, DEFAULT_CURVES, FanLayout};

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Number of stacks around the ellipse.
pub const STACK_COUNT: usize = 6;
/// Entries per stack.
pub const STACK_DEPTH: usize = 10;
/// Loop flight duration at rest.
pub const BASE_DURATION_MS: u64 = 1500;
/// Pause between a completed eviction and the next one, at rest.
pub const BASE_DELAY_MS: u64 = 10;
/// Floor for boosted flight duration.
pub const MIN_BOOSTED_DURATION_MS: u64 = 180;
/// Floor for boosted inter-eviction delay.
pub const MIN_BOOSTED_DELAY_MS: u64 = 2;
/// Boost applied when an intent carries none.
pub const DEFAULT_BOOST: f64 = 10.0;
/// Start offset between consecutive stacks when a loop session begins.
pub const LOOP_STAGGER_MS: u64 = 200;
/// Duration of both the collapse and the expand transition.
pub const TRANSITION_MS: u64 = 700;
/// Container rotation added by a collapse and removed by an expand.
pub const TRANSITION_SPIN_DEG: f64 = 720.0;
/// Container scale while collapsed.
pub const COLLAPSED_SCALE: f64 = 0.06;
/// Burst flights launched per stack on collapse.
pub const BURST_ITEMS_PER_STACK: usize = 14;
/// Gap between burst shots within one stack.
pub const BURST_STEP_MS: u64 = 45;
/// Offset between stacks within one burst.
pub const BURST_STAGGER_MS: u64 = 35;
/// Flight duration of a burst shot.
pub const BURST_FLIGHT_MS: u64 = 240;
/// Horizontal ellipse radius when no viewport is known.
pub const RADIUS_X: f64 = 500.0;
/// Vertical ellipse radius when no viewport is known.
pub const RADIUS_Y: f64 = 700.0;
/// Tangential distance between slots.
pub const FAN_SPREAD: f64 = 20.0;
/// Extra rotation per slot, degrees.
pub const FAN_ROTATION: f64 = 3.0;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Everything the orchestrator can be tuned with.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct VortexConfig {
    /// Number of stacks (N).
    pub stack_count: usize,
    /// Entries per stack (K).
    pub stack_depth: usize,
    /// Loop speed and boost parameters.
    pub speed: SpeedConfig,
    /// Per-stack offset when a loop session starts, in milliseconds.
    pub loop_stagger_ms: u64,
    /// Container collapse/expand transition.
    pub transition: TransitionConfig,
    /// Burst flood on collapse.
    pub burst: BurstConfig,
    /// Ellipse and fan layout.
    pub layout: LayoutConfig,
    /// Portal flight styling.
    pub portal: PortalConfig,
    /// Phase the vortex is mounted in.
    pub initial_phase: InitialPhase,
}

impl Default for VortexConfig {
    fn default() -> Self {
        Self {
            stack_count: STACK_COUNT,
            stack_depth: STACK_DEPTH,
            speed: SpeedConfig::default(),
            loop_stagger_ms: LOOP_STAGGER_MS,
            transition: TransitionConfig::default(),
            burst: BurstConfig::default(),
            layout: LayoutConfig::default(),
            portal: PortalConfig::default(),
            initial_phase: InitialPhase::Idle,
        }
    }
}

/// Phase the vortex starts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum InitialPhase {
    /// Fully expanded with the loop running.
    #[default]
    Idle,
    /// Already collapsed and hidden, loop suppressed until an expand.
    Collapsed,
}

/// Loop speed parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SpeedConfig {
    pub base_duration_ms: u64,
    pub base_delay_ms: u64,
    pub min_duration_ms: u64,
    pub min_delay_ms: u64,
    pub default_boost: f64,
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            base_duration_ms: BASE_DURATION_MS,
            base_delay_ms: BASE_DELAY_MS,
            min_duration_ms: MIN_BOOSTED_DURATION_MS,
            min_delay_ms: MIN_BOOSTED_DELAY_MS,
            default_boost: DEFAULT_BOOST,
        }
    }
}

/// Container transition parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TransitionConfig {
    pub duration_ms: u64,
    pub spin_deg: f64,
    pub collapsed_scale: f64,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            duration_ms: TRANSITION_MS,
            spin_deg: TRANSITION_SPIN_DEG,
            collapsed_scale: COLLAPSED_SCALE,
        }
    }
}

/// Burst flood parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BurstConfig {
    pub items_per_stack: usize,
    pub step_ms: u64,
    pub stagger_ms: u64,
    pub flight_ms: u64,
}

impl Default for BurstConfig {
    fn default() -> Self {
        Self {
            items_per_stack: BURST_ITEMS_PER_STACK,
            step_ms: BURST_STEP_MS,
            stagger_ms: BURST_STAGGER_MS,
            flight_ms: BURST_FLIGHT_MS,
        }
    }
}

/// Ellipse and fan layout parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LayoutConfig {
    pub radius_x: f64,
    pub radius_y: f64,
    pub fan_spread: f64,
    pub fan_rotation: f64,
    pub slot_scale_base: f64,
    pub slot_scale_span: f64,
    /// Flight curve per stack, applied cyclically.
    pub curves: Vec<CurveParams>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            radius_x: RADIUS_X,
            radius_y: RADIUS_Y,
            fan_spread: FAN_SPREAD,
            fan_rotation: FAN_ROTATION,
            slot_scale_base: 0.7,
            slot_scale_span: 0.7,
            curves: DEFAULT_CURVES.to_vec(),
        }
    }
}

impl LayoutConfig {
    /// Layout whose ellipse is sized to a `width` x `height` viewport.
    #[must_use]
    pub fn for_viewport(width: f64, height: f64) -> Self {
        Self {
            radius_x: width * 0.45,
            radius_y: height * 0.55,
            ..Self::default()
        }
    }
}

/// Portal flight styling.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PortalConfig {
    pub loop_z_index: i32,
    pub burst_z_index: i32,
    pub start_opacity: f64,
    pub terminal_scale: f64,
    pub border_radius_px: f64,
    pub shadow_strength: f64,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            loop_z_index: 100,
            burst_z_index: 120,
            start_opacity: 0.9,
            terminal_scale: 0.3,
            border_radius_px: 12.0,
            shadow_strength: 0.35,
        }
    }
}

// ---------------------------------------------------------------------------
// Derived values
// ---------------------------------------------------------------------------

impl VortexConfig {
    /// Fan layout for this config.
    #[must_use]
    pub fn fan_layout(&self) -> FanLayout {
        FanLayout {
            stack_count: self.stack_count,
            depth: self.stack_depth,
            radius_x: self.layout.radius_x,
            radius_y: self.layout.radius_y,
            fan_spread: self.layout.fan_spread,
            fan_rotation: self.layout.fan_rotation,
            scale_base: self.layout.slot_scale_base,
            scale_span: self.layout.slot_scale_span,
        }
    }

    /// Shared collapse/expand transition duration.
    #[must_use]
    pub fn transition_duration(&self) -> Duration {
        Duration::from_millis(self.transition.duration_ms)
    }

    /// Offset between stacks when a loop session starts.
    #[must_use]
    pub fn loop_stagger(&self) -> Duration {
        Duration::from_millis(self.loop_stagger_ms)
    }

    /// Validate all parameters are within acceptable ranges.
    ///
    /// Returns a list of violations. An empty list means the config is
    /// valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.stack_count == 0 {
            errors.push("stack_count must be > 0".into());
        }
        if self.stack_depth == 0 {
            errors.push("stack_depth must be > 0".into());
        }
        if self.speed.base_duration_ms == 0 {
            errors.push("speed.base_duration_ms must be > 0".into());
        }
        if self.speed.min_duration_ms == 0 {
            errors.push("speed.min_duration_ms must be > 0".into());
        }
        if !(self.speed.default_boost.is_finite() && self.speed.default_boost > 0.0) {
            errors.push(format!(
                "speed.default_boost must be finite and > 0, got {}",
                self.speed.default_boost
            ));
        }
        if self.transition.duration_ms == 0 {
            errors.push("transition.duration_ms must be > 0".into());
        }
        if !(self.transition.collapsed_scale >= 0.0 && self.transition.collapsed_scale <= 1.0) {
            errors.push(format!(
                "transition.collapsed_scale must be in [0, 1], got {}",
                self.transition.collapsed_scale
            ));
        }
        if self.burst.items_per_stack > 0 && self.burst.flight_ms == 0 {
            errors.push("burst.flight_ms must be > 0 when bursts are enabled".into());
        }
        if !(self.portal.start_opacity >= 0.0 && self.portal.start_opacity <= 1.0) {
            errors.push(format!(
                "portal.start_opacity must be in [0, 1], got {}",
                self.portal.start_opacity
            ));
        }
        if !(self.layout.radius_x.is_finite() && self.layout.radius_y.is_finite()) {
            errors.push("layout radii must be finite".into());
        }

        errors
    }

    /// Return `self` if valid, otherwise the list of violations.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

#[cfg(feature = "config-file")]
impl VortexConfig {
    /// Load from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(ConfigError::Toml)?;
        config.validated()
    }

    /// Load from a TOML file on disk.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s).map_err(ConfigError::Json)?;
        config.validated()
    }

    /// Load from a JSON file on disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json_str(&content)
    }

    /// Load from a file, picking the format from its extension
    /// (`.json` for JSON, anything else for TOML).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_file(path),
            _ => Self::from_toml_file(path),
        }
    }

    /// Serialize to a pretty TOML string.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::TomlSer)
    }
}

/// Errors from loading or validating a [`VortexConfig`].
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "config-file")]
    Toml(toml::de::Error),
    /// TOML serialization error.
    #[cfg(feature = "config-file")]
    TomlSer(toml::ser::Error),
    /// JSON parse error.
    #[cfg(feature = "config-file")]
    Json(serde_json::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "config-file")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            #[cfg(feature = "config-file")]
            Self::TomlSer(e) => write!(f, "TOML serialization error: {e}"),
            #[cfg(feature = "config-file")]
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => {
                write!(f, "invalid vortex config: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "config-file")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "config-file")]
            Self::TomlSer(e) => Some(e),
            #[cfg(feature = "config-file")]
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}
