//! Dual wheel: an even primary wheel plus a secondary wheel with one tooth
//! that marks the last primary tooth of the cycle.

use tracing::{debug, warn};

use super::{
    AngleSnapshot, EdgeCtx, Geometry, PatternDecoder, extrapolate, fold_crank_angle, per_tooth,
    stall_time, tooth_position,
};
use crate::config::{DecoderCfg, SparkMode};
use crate::end_tooth::{clamp_to_tooth_count, raw_end_tooth};
use crate::filter::{next_filter_time, passes};
use crate::rpm::{cranking_rpm, std_rpm};
use crate::state::Shared;
use crate::status::EdgeOutcome;
use crate::util::{MICROS_PER_SEC, min_tooth_gap_us};

/// Time the virtual tooth before a fresh sync is placed back from the secondary edge,
/// as if the engine were turning at 10 RPM.
const SYNC_BACKDATE_US: u32 = 6_000_000;

/// Counts wrapped with no confirmation after start revolution 2 count as a sync loss.
const CONFIRMATION_GRACE_REVOLUTIONS: u32 = 2;

#[derive(Debug, Clone)]
pub struct DualWheel {
    geo: Geometry,
    /// Primary wraps allowed between two secondary confirmations.
    confirmation_window: u8,
}

impl DualWheel {
    pub fn new(cfg: &DecoderCfg) -> Self {
        let w = &cfg.wheel;
        let max_rpm = cfg.engine.max_rpm;
        let tooth_angle = w.tooth_angle();
        let per_sec_x2 = u32::from(max_rpm / 60) * 2;
        let confirmation_window = if !w.trigger_speed.is_cam() && w.secondary_speed.is_cam() {
            2
        } else {
            1
        };
        Self {
            geo: Geometry {
                tooth_angle,
                actual_teeth: w.teeth_total,
                max_stall_time: stall_time(tooth_angle, 1),
                primary_filter: min_tooth_gap_us(max_rpm, w.teeth_total),
                secondary_filter: (MICROS_PER_SEC / per_sec_x2.max(1)) / 2,
                is_sequential: true,
                has_secondary: true,
            },
            confirmation_window,
        }
    }
}

impl PatternDecoder for DualWheel {
    fn geometry(&self) -> &Geometry {
        &self.geo
    }

    fn primary_edge(&self, cx: &mut EdgeCtx<'_>) -> EdgeOutcome {
        let now = cx.now;
        let cfg = cx.cfg;
        let teeth = cfg.wheel.teeth_total;
        let st = &mut cx.shared.state;

        let Some(gap) = passes(now, st.last_tooth_time, st.current_filter_time) else {
            return EdgeOutcome::Filtered;
        };
        st.tooth_current_count = st.tooth_current_count.saturating_add(1);
        st.valid_trigger = true;
        st.shift_tooth_times(now);

        if st.has_sync {
            if st.tooth_current_count == 1 || st.tooth_current_count > teeth {
                st.tooth_current_count = 1;
                st.revolution_one = !st.revolution_one;
                st.shift_tooth_one_times(now);
                let step = if cfg.wheel.trigger_speed.is_cam() { 2 } else { 1 };
                st.start_revolutions = st.start_revolutions.saturating_add(step);

                st.wraps_since_confirmation = st.wraps_since_confirmation.saturating_add(1);
                if st.wraps_since_confirmation > self.confirmation_window
                    && st.start_revolutions > CONFIRMATION_GRACE_REVOLUTIONS
                {
                    st.sync_loss_counter = st.sync_loss_counter.saturating_add(1);
                    warn!(
                        wraps = st.wraps_since_confirmation,
                        losses = st.sync_loss_counter,
                        "secondary confirmation missed"
                    );
                }
            }
            st.current_filter_time = next_filter_time(cfg.wheel.filter_level, gap);
        }

        per_tooth(cx, self.geo.tooth_angle, false);
        EdgeOutcome::Accepted
    }

    fn secondary_edge(&self, cx: &mut EdgeCtx<'_>) -> EdgeOutcome {
        let now = cx.now;
        let cfg = cx.cfg;
        let teeth = cfg.wheel.teeth_total;
        let revolution_time = cx.shared.timing.revolution_time;
        let st = &mut cx.shared.state;

        let Some(gap) = passes(now, st.secondary.last_tooth_time, st.secondary.filter_time) else {
            // Relax to half a revolution so a speed change cannot lock the cam out.
            st.secondary.filter_time = revolution_time >> 1;
            return EdgeOutcome::Filtered;
        };
        st.secondary.last_tooth_time = now;
        st.secondary.filter_time = gap >> 2;

        if !st.has_sync || st.start_revolutions <= u32::from(cfg.engine.stg_cycles) {
            st.last_tooth_time = now;
            st.last_minus_one_tooth_time =
                now.saturating_sub(SYNC_BACKDATE_US / u32::from(teeth.max(1)));
            st.tooth_current_count = teeth;
            st.current_filter_time = 0;
            if !st.has_sync {
                debug!(teeth, "secondary tooth seen, sync acquired");
            }
            st.has_sync = true;
            st.half_sync = false;
        } else {
            if st.tooth_current_count != teeth
                && st.start_revolutions > CONFIRMATION_GRACE_REVOLUTIONS
            {
                st.sync_loss_counter = st.sync_loss_counter.saturating_add(1);
                warn!(
                    tooth = st.tooth_current_count,
                    expected = teeth,
                    losses = st.sync_loss_counter,
                    "tooth count disagrees with secondary"
                );
            }
            if cfg.engine.use_resync {
                st.tooth_current_count = teeth;
            }
        }

        st.wraps_since_confirmation = 0;
        st.revolution_one = true;
        st.secondary.tooth_count = st.secondary.tooth_count.wrapping_add(1);
        EdgeOutcome::Accepted
    }

    fn rpm(&self, cfg: &DecoderCfg, shared: &mut Shared) -> u16 {
        if !shared.state.has_sync {
            return 0;
        }
        let cam = cfg.wheel.trigger_speed.is_cam();
        if shared.status.rpm < cfg.engine.crank_rpm {
            cranking_rpm(shared, &cfg.engine, cfg.wheel.teeth_total, cam)
        } else {
            std_rpm(shared, &cfg.engine, cam)
        }
    }

    fn crank_angle(&self, cfg: &DecoderCfg, snap: &AngleSnapshot, now: u32) -> i16 {
        // Count 0 only before the first tooth after a reset.
        let count = match snap.tooth_current_count {
            0 => cfg.wheel.teeth_total,
            n => n,
        };
        let mut position =
            tooth_position(count, self.geo.tooth_angle, cfg.wheel.base_angle_offset);
        if snap.revolution_one && !cfg.wheel.trigger_speed.is_cam() {
            position += 360;
        }
        fold_crank_angle(
            extrapolate(position, snap, now),
            cfg.engine.engine_cycle_degrees(),
        )
    }

    fn end_tooth(&self, cfg: &DecoderCfg, end_angle: i16) -> u16 {
        let w = &cfg.wheel;
        let sequential_crank =
            cfg.engine.spark_mode == SparkMode::Sequential && !w.trigger_speed.is_cam();
        let adder = if sequential_crank {
            w.teeth_total
        } else {
            0
        };
        clamp_to_tooth_count(
            raw_end_tooth(end_angle, w.base_angle_offset, self.geo.tooth_angle),
            w.teeth_total,
            adder,
        )
    }
}
