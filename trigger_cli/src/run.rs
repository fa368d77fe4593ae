//! Decoder runs: config mapping, simulated hardware assembly and reports.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use eyre::{Result, WrapErr};
use serde_json::{Value, json};
use trigger_config::{Config, EdgePolarity, Pattern, SparkMode, Speed, TraceInput};
use trigger_core::logger::TOOTH_LOG_SIZE;
use trigger_core::{EdgePump, PumpStats, SharedToothLog, Trigger};
use trigger_hardware::{SimulatedInputs, SimulatedWheel};
use trigger_traits::{Edge, TriggerInput};

/// Edges that may queue between the source and the pump thread.
const EDGE_QUEUE: usize = 256;
/// Sent edges between RPM refreshes from the main loop.
const RPM_EVERY: usize = 8;
pub const SELF_CHECK_RPM: u32 = 1_000;
const SELF_CHECK_REVS: u32 = 10;

/// Outcome of one decoder run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub pattern: &'static str,
    pub teeth: u16,
    pub rpm: u16,
    pub revolution_us: u32,
    pub crank_angle: i16,
    pub sync: &'static str,
    pub tooth: u16,
    pub sync_losses: u32,
    pub dispatched: u64,
    pub accepted: u64,
    pub tooth_log_entries: usize,
    pub end_teeth: Vec<EndToothRow>,
    pub interrupted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndToothRow {
    pub channel: u8,
    pub angle: i16,
    pub tooth: u16,
}

impl RunReport {
    pub fn to_json(&self) -> Value {
        json!({
            "pattern": self.pattern,
            "teeth": self.teeth,
            "rpm": self.rpm,
            "revolution_us": self.revolution_us,
            "crank_angle": self.crank_angle,
            "sync": self.sync,
            "tooth": self.tooth,
            "sync_losses": self.sync_losses,
            "edges_dispatched": self.dispatched,
            "edges_accepted": self.accepted,
            "tooth_log_entries": self.tooth_log_entries,
            "end_teeth": end_teeth_json(&self.end_teeth),
            "interrupted": self.interrupted,
        })
    }

    pub fn render(&self) -> String {
        let mut out = format!(
            "{} {}-tooth wheel: {} rpm ({} us/rev), crank angle {} deg\nsync {} at tooth {}, {} sync losses\nedges {} dispatched, {} accepted, {} logged",
            self.pattern,
            self.teeth,
            self.rpm,
            self.revolution_us,
            self.crank_angle,
            self.sync,
            self.tooth,
            self.sync_losses,
            self.dispatched,
            self.accepted,
            self.tooth_log_entries,
        );
        for row in &self.end_teeth {
            out.push('\n');
            out.push_str(&row.render());
        }
        if self.interrupted {
            out.push_str("\ninterrupted before the end of the edge train");
        }
        out
    }
}

impl EndToothRow {
    pub fn render(&self) -> String {
        format!(
            "channel {}: end angle {} deg -> tooth {}",
            self.channel, self.angle, self.tooth
        )
    }
}

pub fn end_teeth_json(rows: &[EndToothRow]) -> Value {
    Value::Array(
        rows.iter()
            .map(|r| json!({ "channel": r.channel, "angle": r.angle, "tooth": r.tooth }))
            .collect(),
    )
}

fn pattern_name(cfg: &Config) -> &'static str {
    match cfg.wheel.pattern {
        Pattern::MissingTooth => "missing-tooth",
        Pattern::DualWheel => "dual-wheel",
    }
}

fn build(cfg: &Config) -> Result<(Arc<Trigger>, SharedToothLog)> {
    let log = SharedToothLog::new(TOOTH_LOG_SIZE);
    let trigger = Trigger::builder()
        .apply_config(cfg)
        .with_inputs(SimulatedInputs::new())
        .with_logger(log.clone())
        .build()?;
    Ok((Arc::new(trigger), log))
}

/// Simulated wheel matching the configured pattern.
pub fn wheel_for(cfg: &Config) -> Result<SimulatedWheel> {
    let w = &cfg.wheel;
    match (w.pattern, w.speed) {
        (Pattern::MissingTooth, Speed::Crank) => {
            let needs_cam = cfg.engine.spark_mode == SparkMode::Sequential
                || cfg.engine.inj_sequential
                || cfg.vvt.enabled;
            Ok(SimulatedWheel::missing_tooth(w.teeth, w.missing_teeth).with_cam(needs_cam))
        }
        (Pattern::MissingTooth, Speed::Cam) => {
            eyre::bail!("simulation supports crank-speed missing-tooth wheels only")
        }
        (Pattern::DualWheel, speed) => Ok(SimulatedWheel::dual_wheel(w.teeth, speed == Speed::Cam)),
    }
}

/// Level an input is left at by an edge its configured polarity accepts.
fn accepted_level(cfg: &Config, input: TriggerInput) -> bool {
    let polarity = match input {
        TriggerInput::Primary => cfg.wheel.edge,
        TriggerInput::Secondary => cfg.secondary.edge,
        TriggerInput::Tertiary => cfg.secondary.tertiary_edge,
    };
    polarity != EdgePolarity::Falling
}

/// Simulated and recorded trains hold real edges only, so an edge without a
/// captured level carries the one its input's polarity accepts.
fn with_accepted_level(cfg: &Config, edge: Edge) -> Edge {
    match edge.level {
        Some(_) => edge,
        None => edge.with_level(accepted_level(cfg, edge.input)),
    }
}

/// Feed `edges` through an edge pump and report the final state.
fn drive(
    cfg: &Config,
    trigger: &Arc<Trigger>,
    log: &SharedToothLog,
    edges: &[Edge],
    shutdown: &AtomicBool,
) -> Result<RunReport> {
    let pump = EdgePump::spawn(Arc::clone(trigger), EDGE_QUEUE);
    let mut last = 0;
    let mut interrupted = false;
    for (i, &edge) in edges.iter().enumerate() {
        if shutdown.load(Ordering::Relaxed) {
            tracing::warn!(sent = i, total = edges.len(), "interrupted, stopping edge source");
            interrupted = true;
            break;
        }
        pump.send(with_accepted_level(cfg, edge))?;
        last = edge.time_us;
        if i % RPM_EVERY == 0 {
            trigger.rpm();
        }
    }
    let stats = pump.finish();
    tracing::info!(
        dispatched = stats.dispatched,
        accepted = stats.accepted,
        "edge train drained"
    );
    Ok(report(cfg, trigger, log, stats, last, interrupted))
}

fn report(
    cfg: &Config,
    trigger: &Trigger,
    log: &SharedToothLog,
    stats: PumpStats,
    last_edge_us: u32,
    interrupted: bool,
) -> RunReport {
    let rpm = trigger.rpm();
    let snap = trigger.snapshot();
    RunReport {
        pattern: pattern_name(cfg),
        teeth: cfg.wheel.teeth,
        rpm,
        revolution_us: snap.revolution_time,
        crank_angle: trigger.crank_angle_at(last_edge_us),
        sync: trigger.sync_state().as_str(),
        tooth: snap.tooth_current_count,
        sync_losses: snap.sync_loss_counter,
        dispatched: stats.dispatched,
        accepted: stats.accepted,
        tooth_log_entries: log.len(),
        end_teeth: end_rows(trigger),
        interrupted,
    }
}

fn end_rows(trigger: &Trigger) -> Vec<EndToothRow> {
    trigger
        .end_teeth()
        .iter()
        .map(|(channel, e)| EndToothRow {
            channel,
            angle: e.end_angle,
            tooth: e.end_tooth,
        })
        .collect()
}

pub fn simulate(
    cfg: &Config,
    rpm: u32,
    revs: u32,
    noise_every: Option<u32>,
    angles: &[i16],
    shutdown: &AtomicBool,
) -> Result<RunReport> {
    let (trigger, log) = build(cfg)?;
    if !angles.is_empty() {
        trigger.set_end_teeth(angles)?;
    }
    let mut wheel = wheel_for(cfg)?.with_rpm(rpm);
    if let Some(n) = noise_every {
        wheel = wheel.with_noise_every(n);
    }
    let edges = wheel.edges(revs)?;
    tracing::info!(rpm, revs, edges = edges.len(), shape = ?wheel.shape(), "simulating");
    drive(cfg, &trigger, &log, &edges, shutdown)
}

pub fn replay(cfg: &Config, trace: &Path, shutdown: &AtomicBool) -> Result<RunReport> {
    let rows = trigger_config::load_edge_trace_csv(trace)
        .wrap_err_with(|| format!("load edge trace {}", trace.display()))?;
    let edges: Vec<Edge> = rows
        .iter()
        .map(|r| Edge::new(input_of(r.input), r.time_us))
        .collect();
    tracing::info!(edges = edges.len(), trace = %trace.display(), "replaying");
    let (trigger, log) = build(cfg)?;
    drive(cfg, &trigger, &log, &edges, shutdown)
}

fn input_of(input: TraceInput) -> TriggerInput {
    match input {
        TraceInput::Primary => TriggerInput::Primary,
        TraceInput::Secondary => TriggerInput::Secondary,
        TraceInput::Tertiary => TriggerInput::Tertiary,
    }
}

pub fn end_teeth(cfg: &Config, angles: &[i16]) -> Result<Vec<EndToothRow>> {
    let (trigger, _) = build(cfg)?;
    trigger.set_end_teeth(angles)?;
    Ok(end_rows(&trigger))
}

/// Simulate the configured wheel at a low steady speed and require full
/// decoding: sync, no losses, RPM within 1 %.
pub fn self_check(cfg: &Config) -> Result<RunReport> {
    let idle = AtomicBool::new(false);
    let report = simulate(cfg, SELF_CHECK_RPM, SELF_CHECK_REVS, None, &[], &idle)?;
    if report.sync == "none" {
        eyre::bail!("self-check failed: decoder never found sync");
    }
    if report.sync_losses != 0 {
        eyre::bail!(
            "self-check failed: {} sync losses on a clean wheel",
            report.sync_losses
        );
    }
    let err = u32::from(report.rpm).abs_diff(SELF_CHECK_RPM);
    if err * 100 > SELF_CHECK_RPM {
        eyre::bail!(
            "self-check failed: decoded {} rpm, expected {SELF_CHECK_RPM}",
            report.rpm
        );
    }
    Ok(report)
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub struct WatchPins {
    pub primary: u8,
    pub secondary: Option<u8>,
    pub tertiary: Option<u8>,
}

/// Poll GPIO levels and feed every transition to the decoder until `shutdown`.
///
/// Each edge carries the level it was polled at, so the polarity gate judges
/// it by that level even when the pump handles it after the next transition.
/// The mirror serves the live reads: cam polling and composite log levels.
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub fn watch(
    cfg: &Config,
    pins: WatchPins,
    every: std::time::Duration,
    shutdown: &AtomicBool,
) -> Result<RunReport> {
    use std::time::Instant;
    use trigger_hardware::GpioInputs;
    use trigger_traits::TriggerInputs;
    use trigger_traits::clock::{Clock, MonotonicClock};

    const INPUTS: [TriggerInput; 3] = [
        TriggerInput::Primary,
        TriggerInput::Secondary,
        TriggerInput::Tertiary,
    ];

    let gpio = GpioInputs::new(pins.primary, pins.secondary, pins.tertiary)?;
    let mirror = SimulatedInputs::new();
    let log = SharedToothLog::new(TOOTH_LOG_SIZE);
    let trigger = Arc::new(
        Trigger::builder()
            .apply_config(cfg)
            .with_inputs(mirror.clone())
            .with_logger(log.clone())
            .build()?,
    );
    let clock = MonotonicClock::new();
    let pump = EdgePump::spawn(Arc::clone(&trigger), EDGE_QUEUE);

    let mut levels = INPUTS.map(|i| gpio.is_high(i));
    for (&input, &high) in INPUTS.iter().zip(&levels) {
        mirror.set(input, high);
    }
    let mut last_report = Instant::now();
    let mut now = clock.micros();
    while !shutdown.load(Ordering::Relaxed) {
        now = clock.micros();
        for (slot, &input) in levels.iter_mut().zip(&INPUTS) {
            let high = gpio.is_high(input);
            if high != *slot {
                *slot = high;
                mirror.set(input, high);
                pump.send(Edge::new(input, now).with_level(high))?;
            }
        }
        if last_report.elapsed() >= every {
            last_report = Instant::now();
            trigger.check_stall(now);
            let rpm = trigger.rpm();
            tracing::info!(
                rpm,
                sync = trigger.sync_state().as_str(),
                tooth = trigger.snapshot().tooth_current_count,
                edges = pump.dispatched(),
                "watching"
            );
        }
        std::hint::spin_loop();
    }
    let stats = pump.finish();
    Ok(report(cfg, &trigger, &log, stats, now, false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_maps_to_a_cam_less_36_1() {
        let cfg = Config::default();
        let w = wheel_for(&cfg).expect("crank wheel");
        let edges = w.edges(2).expect("valid");
        assert_eq!(edges.len(), 70);
    }

    #[test]
    fn sequential_missing_tooth_gets_a_cam_pulse() {
        let mut cfg = Config::default();
        cfg.engine.spark_mode = SparkMode::Sequential;
        let edges = wheel_for(&cfg).expect("crank wheel").edges(2).expect("valid");
        let cams = edges
            .iter()
            .filter(|e| e.input == TriggerInput::Secondary)
            .count();
        assert_eq!(cams, 1);
    }

    #[test]
    fn cam_speed_missing_tooth_is_not_simulated() {
        let mut cfg = Config::default();
        cfg.wheel.speed = Speed::Cam;
        assert!(wheel_for(&cfg).is_err());
    }

    #[test]
    fn falling_edges_decode_like_rising_ones() {
        let mut cfg = Config::default();
        cfg.wheel.edge = EdgePolarity::Falling;
        let idle = AtomicBool::new(false);
        let report = simulate(&cfg, 1_000, 10, None, &[], &idle).expect("falling 36-1");
        assert_eq!(report.sync, "full");
        assert_eq!(report.accepted, report.dispatched);
        assert!(self_check(&cfg).is_ok());
    }

    #[test]
    fn recorded_levels_are_kept() {
        let mut cfg = Config::default();
        cfg.wheel.edge = EdgePolarity::Falling;
        let high = Edge::new(TriggerInput::Primary, 10).with_level(true);
        assert_eq!(with_accepted_level(&cfg, high).level, Some(true));
        let bare = Edge::new(TriggerInput::Primary, 10);
        assert_eq!(with_accepted_level(&cfg, bare).level, Some(false));
        let cam = Edge::new(TriggerInput::Secondary, 10);
        assert_eq!(with_accepted_level(&cfg, cam).level, Some(true));
    }

    #[test]
    fn default_wheel_passes_self_check() {
        let report = self_check(&Config::default()).expect("clean 36-1");
        assert_eq!(report.sync_losses, 0);
        assert!(!report.interrupted);
        assert_eq!(report.dispatched, 350);
    }
}
