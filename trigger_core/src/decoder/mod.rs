//! Wheel-pattern decoders.
//!
//! Every pattern follows the same template: filter the edge, advance the
//! count, run the pattern's sync heuristic, then let the per-tooth corrector
//! look at the new tooth. Patterns only supply their own policy (gap
//! detection, secondary confirmation rule, geometry); the shared steps live
//! here.

mod dual_wheel;
mod missing_tooth;

pub use dual_wheel::DualWheel;
pub use missing_tooth::MissingTooth;

use trigger_traits::{OutputScheduler, TriggerInputs};

use crate::config::{DecoderCfg, SparkMode, Strokes, VvtMode, WheelPattern};
use crate::fixed_point::angle_filter;
use crate::per_tooth::check_per_tooth_timing;
use crate::state::{DecoderRuntimeState, Shared};
use crate::status::EdgeOutcome;
use crate::timing::RevolutionTiming;
use crate::util::{MICROS_PER_DEG_1_RPM, MIN_RPM};

/// Constants derived once from the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// Degrees between adjacent tooth slots.
    pub tooth_angle: u16,
    /// Physical teeth per pattern cycle.
    pub actual_teeth: u16,
    /// Longest legal gap between primary teeth before the engine counts as stopped (µs).
    pub max_stall_time: u32,
    /// Primary filter threshold after a reset (µs).
    pub primary_filter: u32,
    /// Secondary filter threshold after a reset (µs).
    pub secondary_filter: u32,
    /// The count distinguishes both halves of the 720° cycle on its own.
    pub is_sequential: bool,
    /// A cam input is expected.
    pub has_secondary: bool,
}

/// Stall timeout for `slots` tooth slots at the minimum supported RPM.
#[inline]
pub(crate) fn stall_time(tooth_angle: u16, slots: u32) -> u32 {
    (MICROS_PER_DEG_1_RPM / MIN_RPM) * u32::from(tooth_angle) * slots
}

/// The handful of fields a crank-angle query needs, copied in one critical section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AngleSnapshot {
    pub tooth_current_count: u16,
    pub last_tooth_time: u32,
    pub revolution_one: bool,
    pub timing: RevolutionTiming,
}

impl AngleSnapshot {
    pub(crate) fn of(shared: &Shared) -> Self {
        Self {
            tooth_current_count: shared.state.tooth_current_count,
            last_tooth_time: shared.state.last_tooth_time,
            revolution_one: shared.state.revolution_one,
            timing: shared.timing,
        }
    }
}

/// Everything an edge handler may touch.
pub(crate) struct EdgeCtx<'a> {
    pub now: u32,
    pub cfg: &'a DecoderCfg,
    pub shared: &'a mut Shared,
    pub inputs: &'a dyn TriggerInputs,
    pub outputs: &'a mut dyn OutputScheduler,
}

/// Uniform decoder contract.
pub(crate) trait PatternDecoder {
    fn geometry(&self) -> &Geometry;
    fn primary_edge(&self, cx: &mut EdgeCtx<'_>) -> EdgeOutcome;
    fn secondary_edge(&self, cx: &mut EdgeCtx<'_>) -> EdgeOutcome;
    fn tertiary_edge(&self, cx: &mut EdgeCtx<'_>) -> EdgeOutcome {
        let angle = self.crank_angle(cx.cfg, &AngleSnapshot::of(cx.shared), cx.now);
        capture_tertiary(cx, angle)
    }
    fn rpm(&self, cfg: &DecoderCfg, shared: &mut Shared) -> u16;
    fn crank_angle(&self, cfg: &DecoderCfg, snap: &AngleSnapshot, now: u32) -> i16;
    fn end_tooth(&self, cfg: &DecoderCfg, end_angle: i16) -> u16;
}

/// The active decoder, chosen once from the configured pattern.
#[derive(Debug, Clone)]
pub(crate) enum Decoder {
    MissingTooth(MissingTooth),
    DualWheel(DualWheel),
}

macro_rules! dispatch {
    ($self:ident, $d:ident => $e:expr) => {
        match $self {
            Decoder::MissingTooth($d) => $e,
            Decoder::DualWheel($d) => $e,
        }
    };
}

impl Decoder {
    pub fn new(cfg: &DecoderCfg) -> Self {
        match cfg.wheel.pattern {
            WheelPattern::MissingTooth => Self::MissingTooth(MissingTooth::new(cfg)),
            WheelPattern::DualWheel => Self::DualWheel(DualWheel::new(cfg)),
        }
    }

    /// Reset runtime state to unsynchronized with the initial filter thresholds.
    pub fn setup(&self, state: &mut DecoderRuntimeState) {
        let g = self.geometry();
        state.reset(g.primary_filter, g.secondary_filter);
    }

    pub fn geometry(&self) -> &Geometry {
        dispatch!(self, d => d.geometry())
    }

    pub fn primary_edge(&self, cx: &mut EdgeCtx<'_>) -> EdgeOutcome {
        dispatch!(self, d => d.primary_edge(cx))
    }

    pub fn secondary_edge(&self, cx: &mut EdgeCtx<'_>) -> EdgeOutcome {
        dispatch!(self, d => d.secondary_edge(cx))
    }

    pub fn tertiary_edge(&self, cx: &mut EdgeCtx<'_>) -> EdgeOutcome {
        dispatch!(self, d => d.tertiary_edge(cx))
    }

    pub fn rpm(&self, cfg: &DecoderCfg, shared: &mut Shared) -> u16 {
        dispatch!(self, d => d.rpm(cfg, shared))
    }

    pub fn crank_angle(&self, cfg: &DecoderCfg, snap: &AngleSnapshot, now: u32) -> i16 {
        dispatch!(self, d => d.crank_angle(cfg, snap, now))
    }

    pub fn end_tooth(&self, cfg: &DecoderCfg, end_angle: i16) -> u16 {
        dispatch!(self, d => d.end_tooth(cfg, end_angle))
    }
}

// ── Shared template steps ────────────────────────────────────────────────────

/// Angle of the last seen tooth relative to TDC, before any extrapolation.
#[inline]
pub(crate) fn tooth_position(count: u16, tooth_angle: u16, base_angle_offset: i16) -> i32 {
    (i32::from(count) - 1) * i32::from(tooth_angle) + i32::from(base_angle_offset)
}

/// Bring an angle into the engine's reporting range: `[0, 720)` on a
/// four-stroke, `[0, 360)` on a two-stroke. Both signs fold the same way.
#[inline]
pub(crate) fn fold_crank_angle(angle: i64, engine_cycle: i32) -> i16 {
    angle.rem_euclid(i64::from(engine_cycle.max(1))) as i16
}

/// Tooth position plus the angle turned since that tooth.
#[inline]
pub(crate) fn extrapolate(position: i32, snap: &AngleSnapshot, now: u32) -> i64 {
    let elapsed = now.wrapping_sub(snap.last_tooth_time);
    i64::from(position) + i64::from(snap.timing.time_to_angle(elapsed))
}

/// Degrees covered by the ignition outputs.
#[inline]
pub(crate) fn ignition_angle_max(cfg: &DecoderCfg) -> i32 {
    if cfg.engine.spark_mode == SparkMode::Sequential && cfg.engine.strokes == Strokes::Four {
        720
    } else {
        360
    }
}

/// Hand the just-counted tooth to the per-tooth corrector.
///
/// Sequential spark on a crank-speed wheel numbers the second revolution's
/// teeth `teeth_total + count` and shifts the angle by 360°.
pub(crate) fn per_tooth(cx: &mut EdgeCtx<'_>, tooth_angle: u16, limit_angle: bool) {
    let cfg = cx.cfg;
    let Shared {
        state,
        status,
        end_table,
        ..
    } = &*cx.shared;
    if !cfg.engine.per_tooth_ignition || status.cranking {
        return;
    }
    let count = state.tooth_current_count;
    let mut angle = tooth_position(count, tooth_angle, cfg.wheel.base_angle_offset);
    if limit_angle {
        angle = angle.rem_euclid(ignition_angle_max(cfg));
    }
    let (angle, tooth) = if cfg.engine.spark_mode == SparkMode::Sequential
        && state.revolution_one
        && !cfg.wheel.trigger_speed.is_cam()
    {
        (angle + 360, cfg.wheel.teeth_total.saturating_add(count))
    } else {
        (angle, count)
    };
    check_per_tooth_timing(status, end_table, cx.outputs, angle as i16, tooth);
}

/// Cam phase relative to TDC, in 0.5° units and filtered.
pub(crate) fn cam_angle_sample(cfg: &DecoderCfg, crank_angle: i16, cl0_duty_angle: i16, prior: i16) -> i16 {
    let mut a = i32::from(crank_angle);
    while a > 360 {
        a -= 360;
    }
    a -= i32::from(cfg.wheel.base_angle_offset);
    if cfg.vvt.mode == VvtMode::ClosedLoop {
        a -= i32::from(cl0_duty_angle);
    }
    angle_filter((a << 1) as i16, cfg.vvt.angle_filter, prior)
}

/// VVT1 sample; only taken on the first revolution of the cycle.
pub(crate) fn record_vvt1(cx: &mut EdgeCtx<'_>, crank_angle: i16) {
    let cfg = cx.cfg;
    if cfg.vvt.enabled && cx.shared.state.revolution_one {
        let st = &mut cx.shared.status;
        st.vvt1_angle = cam_angle_sample(cfg, crank_angle, cfg.vvt.cl0_duty_angle, st.vvt1_angle);
    }
}

/// Tertiary input: VVT2 capture only, filtered at 25 % of the last gap.
pub(crate) fn capture_tertiary(cx: &mut EdgeCtx<'_>, crank_angle: i16) -> EdgeOutcome {
    let now = cx.now;
    let cfg = cx.cfg;
    let th = &mut cx.shared.state.tertiary;
    let mut gap = now.wrapping_sub(th.last_tooth_time);
    if th.last_tooth_time == 0 {
        gap = 0;
        th.last_tooth_time = now;
    }
    if gap < th.filter_time {
        return EdgeOutcome::Filtered;
    }
    th.tooth_count = th.tooth_count.wrapping_add(1);
    th.filter_time = gap >> 2;
    th.last_minus_one_tooth_time = th.last_tooth_time;
    th.last_tooth_time = now;
    if cfg.vvt.enabled {
        let st = &mut cx.shared.status;
        st.vvt2_angle =
            cam_angle_sample(cfg, crank_angle, cfg.vvt.vvt2_cl0_duty_angle, st.vvt2_angle);
    }
    EdgeOutcome::Accepted
}
