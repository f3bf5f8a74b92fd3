#![forbid(unsafe_code)]

//! Scripted simulation runs.
//!
//! The run steps a [`Vortex`] frame by frame on its virtual clock. Between
//! frames it stops exactly at every scripted intent time, so intent
//! timing never depends on the frame interval. Each frame plays the
//! renderer: landed flights are reported back and presentation hints are
//! acknowledged.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::mpsc::Receiver;
use std::time::Duration;

use clap::{Args, ValueEnum};
use serde::Serialize;
use vortex_runtime::config::LayoutConfig;
use vortex_runtime::{
    ImageRef, Phase, Vortex, VortexConfig, VortexIntent, VortexSignal, VortexStats,
};

use crate::error::{Result, SimError};

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// TOML or JSON config file (format picked by extension).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Length of the run on the virtual clock.
    #[arg(long = "duration-ms", default_value_t = 3000)]
    pub duration_ms: u64,

    /// Renderer frame interval.
    #[arg(long = "frame-ms", default_value_t = 16)]
    pub frame_ms: u64,

    /// Dispatch a collapse at this time (repeatable).
    #[arg(long = "collapse-at", value_name = "MS")]
    pub collapse_at: Vec<u64>,

    /// Dispatch an expand at this time (repeatable).
    #[arg(long = "expand-at", value_name = "MS")]
    pub expand_at: Vec<u64>,

    /// Boost factor carried by every scripted intent.
    #[arg(long)]
    pub boost: Option<f64>,

    /// Size of the synthetic image pool.
    #[arg(long, default_value_t = 60)]
    pub images: usize,

    /// Path prefix of synthetic image references.
    #[arg(long = "image-prefix", default_value = "/images/vortex")]
    pub image_prefix: String,

    /// Size the ellipse to a WIDTHxHEIGHT viewport.
    #[arg(long, value_name = "WIDTHxHEIGHT")]
    pub viewport: Option<Viewport>,

    /// Print one summary line per frame.
    #[arg(long)]
    pub frames: bool,

    /// Emit JSON lines instead of text.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Args)]
pub struct PrintConfigArgs {
    /// TOML or JSON config file; defaults when absent.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = ConfigFormat::Toml)]
    pub format: ConfigFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    Toml,
    Json,
}

/// Viewport size used to derive the ellipse radii.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl FromStr for Viewport {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got `{s}`"))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v > 0.0)
                .ok_or_else(|| format!("invalid viewport dimension `{v}`"))
        };
        Ok(Self {
            width: parse(w)?,
            height: parse(h)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Output records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum Record {
    Signal {
        t_ms: u64,
        signal: VortexSignal,
    },
    Intent {
        t_ms: u64,
        intent: VortexIntent,
        accepted: bool,
    },
    Frame(FrameSummary),
    Summary(RunSummary),
}

/// Condensed view of one frame.
#[derive(Debug, Clone, Serialize)]
pub struct FrameSummary {
    pub t_ms: u64,
    pub phase: Phase,
    pub rotation: f64,
    pub scale: f64,
    pub opacity: f64,
    pub visible_slots: usize,
    pub portals: usize,
}

/// End-of-run totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub t_ms: u64,
    pub phase: Phase,
    pub stats: VortexStats,
    pub minted: u64,
    pub live_portals: usize,
    pub completed_portals: u64,
    pub signals: Vec<VortexSignal>,
}

struct Emitter<'a, W: Write> {
    out: &'a mut W,
    json: bool,
}

impl<W: Write> Emitter<'_, W> {
    fn emit(&mut self, record: &Record) -> Result<()> {
        if self.json {
            serde_json::to_writer(&mut *self.out, record)?;
            writeln!(self.out)?;
            return Ok(());
        }
        match record {
            Record::Signal { t_ms, signal } => {
                writeln!(self.out, "{t_ms:>7}ms  signal  {}", signal.as_str())?;
            }
            Record::Intent {
                t_ms,
                intent,
                accepted,
            } => {
                let name = match intent {
                    VortexIntent::Collapse { .. } => "collapse",
                    VortexIntent::Expand { .. } => "expand",
                };
                let verdict = if *accepted { "accepted" } else { "ignored" };
                writeln!(self.out, "{t_ms:>7}ms  intent  {name} {verdict}")?;
            }
            Record::Frame(f) => {
                writeln!(
                    self.out,
                    "{:>7}ms  frame   {:<10} spin={:>7.1} scale={:.3} opacity={:.3} slots={} portals={}",
                    f.t_ms, f.phase, f.rotation, f.scale, f.opacity, f.visible_slots, f.portals
                )?;
            }
            Record::Summary(s) => {
                writeln!(
                    self.out,
                    "{:>7}ms  done    phase={} loop_cycles={} burst_shots={} completions={} minted={} live_portals={}",
                    s.t_ms,
                    s.phase,
                    s.stats.loop_cycles,
                    s.stats.burst_shots,
                    s.stats.completions,
                    s.minted,
                    s.live_portals
                )?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn load_config(path: Option<&Path>) -> Result<VortexConfig> {
    let Some(path) = path else {
        return Ok(VortexConfig::default());
    };
    if !path.exists() {
        return Err(SimError::MissingPath {
            path: path.to_path_buf(),
        });
    }
    Ok(VortexConfig::from_file(path)?)
}

pub fn print_config<W: Write>(args: &PrintConfigArgs, out: &mut W) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    match args.format {
        ConfigFormat::Toml => write!(out, "{}", config.to_toml_string()?)?,
        ConfigFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&config)?)?,
    }
    Ok(())
}

fn build_script(args: &RunArgs) -> Result<Vec<(Duration, VortexIntent)>> {
    let collapses = args
        .collapse_at
        .iter()
        .map(|&ms| (ms, VortexIntent::Collapse { boost: args.boost }));
    let expands = args
        .expand_at
        .iter()
        .map(|&ms| (ms, VortexIntent::Expand { boost: args.boost }));

    let mut script = Vec::with_capacity(args.collapse_at.len() + args.expand_at.len());
    for (ms, intent) in collapses.chain(expands) {
        if ms > args.duration_ms {
            return Err(SimError::invalid(format!(
                "intent at {ms}ms is after the end of the run ({}ms)",
                args.duration_ms
            )));
        }
        script.push((Duration::from_millis(ms), intent));
    }
    // Stable: at equal times collapses precede expands.
    script.sort_by_key(|(at, _)| *at);
    Ok(script)
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

fn drain_signals<W: Write>(
    rx: &Receiver<VortexSignal>,
    now: Duration,
    seen: &mut Vec<VortexSignal>,
    emitter: &mut Emitter<'_, W>,
) -> Result<()> {
    for signal in rx.try_iter() {
        seen.push(signal);
        emitter.emit(&Record::Signal {
            t_ms: millis(now),
            signal,
        })?;
    }
    Ok(())
}

/// Run one scripted session and return its totals.
pub fn simulate<W: Write>(args: &RunArgs, out: &mut W) -> Result<RunSummary> {
    if args.frame_ms == 0 {
        return Err(SimError::invalid("--frame-ms must be > 0"));
    }
    let mut config = load_config(args.config.as_deref())?;
    if let Some(viewport) = args.viewport {
        let sized = LayoutConfig::for_viewport(viewport.width, viewport.height);
        config.layout.radius_x = sized.radius_x;
        config.layout.radius_y = sized.radius_y;
    }
    let script = build_script(args)?;

    let pool = (0..args.images)
        .map(|i| ImageRef::new(format!("{}/{i:03}.jpg", args.image_prefix)))
        .collect();
    let (mut vortex, signals) = Vortex::new(config, pool)?;
    tracing::debug!(
        target: "vortex_sim",
        duration_ms = args.duration_ms,
        frame_ms = args.frame_ms,
        intents = script.len(),
        "simulation started"
    );
    let mut emitter = Emitter {
        out,
        json: args.json,
    };
    let mut seen = Vec::new();

    vortex.initialize();
    drain_signals(&signals, vortex.now(), &mut seen, &mut emitter)?;

    let end = Duration::from_millis(args.duration_ms);
    let frame_step = Duration::from_millis(args.frame_ms);
    let mut next_frame = Duration::ZERO;
    let mut script = script.into_iter().peekable();
    let mut completed_portals = 0u64;

    loop {
        // Stopping at each task deadline timestamps signals exactly.
        let mut stop = next_frame;
        if let Some((at, _)) = script.peek() {
            stop = stop.min(*at);
        }
        if let Some(deadline) = vortex.next_deadline().filter(|d| *d > vortex.now()) {
            stop = stop.min(deadline);
        }
        if stop > end {
            break;
        }
        vortex.advance_to(stop);
        drain_signals(&signals, vortex.now(), &mut seen, &mut emitter)?;

        let now = vortex.now();
        while let Some((_, intent)) = script.next_if(|(at, _)| *at <= now) {
            let accepted = vortex.dispatch(intent);
            emitter.emit(&Record::Intent {
                t_ms: millis(now),
                intent,
                accepted,
            })?;
        }

        if next_frame <= now {
            let landed: Vec<_> = vortex.portals().finished(now).collect();
            for id in landed {
                if vortex.complete_portal(id) {
                    completed_portals += 1;
                }
            }
            vortex.acknowledge_hints();

            if args.frames {
                let frame = vortex.frame();
                emitter.emit(&Record::Frame(FrameSummary {
                    t_ms: millis(now),
                    phase: frame.phase,
                    rotation: frame.container.transform.rotation,
                    scale: frame.container.transform.scale,
                    opacity: frame.container.transform.opacity,
                    visible_slots: frame.visible_slots().count(),
                    portals: frame.portals.len(),
                }))?;
            }
            next_frame = next_frame.saturating_add(frame_step);
        }
    }

    vortex.advance_to(end);
    drain_signals(&signals, vortex.now(), &mut seen, &mut emitter)?;

    let summary = RunSummary {
        t_ms: millis(end),
        phase: vortex.phase(),
        stats: vortex.stats(),
        minted: vortex.stacks().minted(),
        live_portals: vortex.portals().len(),
        completed_portals,
        signals: seen,
    };
    vortex.shutdown();
    tracing::info!(
        target: "vortex_sim",
        phase = %summary.phase,
        loop_cycles = summary.stats.loop_cycles,
        burst_shots = summary.stats.burst_shots,
        signals = summary.signals.len(),
        "simulation finished"
    );
    emitter.emit(&Record::Summary(summary.clone()))?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> RunArgs {
        RunArgs {
            config: None,
            duration_ms: 2000,
            frame_ms: 16,
            collapse_at: Vec::new(),
            expand_at: Vec::new(),
            boost: None,
            images: 60,
            image_prefix: "img".into(),
            viewport: None,
            frames: false,
            json: false,
        }
    }

    #[test]
    fn viewport_parses() {
        assert_eq!(
            "1280x720".parse::<Viewport>(),
            Ok(Viewport {
                width: 1280.0,
                height: 720.0
            })
        );
        assert!("1280".parse::<Viewport>().is_err());
        assert!("0x720".parse::<Viewport>().is_err());
        assert!("ax1".parse::<Viewport>().is_err());
    }

    #[test]
    fn script_sorts_and_keeps_collapse_first_on_ties() {
        let mut a = args();
        a.collapse_at = vec![500, 100];
        a.expand_at = vec![100];
        let script = build_script(&a).unwrap();
        let times: Vec<_> = script.iter().map(|(t, _)| millis(*t)).collect();
        assert_eq!(times, vec![100, 100, 500]);
        assert!(matches!(script[0].1, VortexIntent::Collapse { .. }));
        assert!(matches!(script[1].1, VortexIntent::Expand { .. }));
    }

    #[test]
    fn intent_after_end_is_rejected() {
        let mut a = args();
        a.expand_at = vec![2001];
        assert!(matches!(
            build_script(&a),
            Err(SimError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn idle_run_only_signals_ready() {
        let mut out = Vec::new();
        let summary = simulate(&args(), &mut out).unwrap();
        assert_eq!(summary.signals, vec![VortexSignal::Ready]);
        assert_eq!(summary.phase, Phase::Idle);
        assert!(summary.completed_portals > 0);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("signal  ready"));
        assert!(text.contains("done    phase=idle"));
    }

    #[test]
    fn collapse_and_expand_round_trip() {
        let mut a = args();
        a.collapse_at = vec![100];
        a.expand_at = vec![900];
        a.boost = Some(10.0);
        let mut out = Vec::new();
        let summary = simulate(&a, &mut out).unwrap();
        assert_eq!(
            summary.signals,
            vec![
                VortexSignal::Ready,
                VortexSignal::DoneCollapsing,
                VortexSignal::DoneExpanding
            ]
        );
        assert_eq!(summary.phase, Phase::Idle);
        assert!(summary.stats.burst_shots > 0);
        assert_eq!(summary.stats.accepted_intents, 2);
    }

    #[test]
    fn missing_config_is_reported() {
        let mut a = args();
        a.config = Some(PathBuf::from("/definitely/not/here.toml"));
        let err = simulate(&a, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, SimError::MissingPath { .. }));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn empty_pool_is_a_vortex_error() {
        let mut a = args();
        a.images = 0;
        let err = simulate(&a, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, SimError::Vortex(_)));
    }
}
