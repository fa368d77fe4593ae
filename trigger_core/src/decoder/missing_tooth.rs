//! Missing-tooth wheel (36-1, 60-2, 12-1, ...).
//!
//! Tooth #1 is the first tooth after the gap. The gap is found by comparing
//! each gap with the one before it; an optional cam input decides which half
//! of the 720° cycle the crank is in.

use tracing::debug;

use super::{
    AngleSnapshot, EdgeCtx, Geometry, PatternDecoder, extrapolate, fold_crank_angle, per_tooth,
    record_vvt1, stall_time, tooth_position,
};
use crate::config::{DecoderCfg, SecondaryPattern, SparkMode, Strokes};
use crate::end_tooth::{
    END_TOOTH_MARGIN_ABOVE_TEETH, clamp_to_actual_teeth, clamp_to_tooth_count, raw_end_tooth,
};
use crate::filter::{next_filter_time, passes};
use crate::rpm::{cranking_rpm, std_rpm};
use crate::state::Shared;
use crate::status::EdgeOutcome;
use crate::util::{GAP_SEARCH_RPM, MICROS_PER_MIN, MICROS_PER_SEC, min_tooth_gap_us};

use trigger_traits::TriggerInput;

#[derive(Debug, Clone)]
pub struct MissingTooth {
    geo: Geometry,
}

impl MissingTooth {
    pub fn new(cfg: &DecoderCfg) -> Self {
        let w = &cfg.wheel;
        let max_rpm = cfg.engine.max_rpm;
        let tooth_angle = w.tooth_angle();
        let secondary_filter = if w.secondary_pattern == SecondaryPattern::FourMinusOne {
            MICROS_PER_MIN / u32::from(max_rpm.max(1)) / 4 / 2
        } else {
            MICROS_PER_SEC / u32::from(max_rpm / 60).max(1)
        };
        let crank = !w.trigger_speed.is_cam();
        Self {
            geo: Geometry {
                tooth_angle,
                actual_teeth: w.actual_teeth(),
                max_stall_time: stall_time(tooth_angle, u32::from(w.missing_teeth) + 1),
                primary_filter: min_tooth_gap_us(max_rpm, w.teeth_total),
                secondary_filter,
                is_sequential: !crank,
                has_secondary: crank && (cfg.engine.sequential() || cfg.vvt.enabled),
            },
        }
    }

    /// Smallest gap that counts as the missing-tooth gap.
    #[inline]
    fn target_gap(cfg: &DecoderCfg, last_gap: u32) -> u32 {
        let last = u64::from(last_gap);
        let target = if cfg.wheel.missing_teeth == 1 {
            last * u64::from(cfg.wheel.gap_ratio_percent) / 100
        } else {
            last * u64::from(cfg.wheel.missing_teeth)
        };
        u32::try_from(target).unwrap_or(u32::MAX)
    }

    /// Teeth addressable per channel beyond one wheel turn.
    fn tooth_adder(cfg: &DecoderCfg) -> u16 {
        let e = &cfg.engine;
        let spark_needs_cycle = matches!(e.spark_mode, SparkMode::Sequential | SparkMode::Single);
        if spark_needs_cycle && !cfg.wheel.trigger_speed.is_cam() && e.strokes == Strokes::Four {
            cfg.wheel.teeth_total
        } else {
            0
        }
    }
}

impl PatternDecoder for MissingTooth {
    fn geometry(&self) -> &Geometry {
        &self.geo
    }

    fn primary_edge(&self, cx: &mut EdgeCtx<'_>) -> EdgeOutcome {
        let now = cx.now;
        let cfg = cx.cfg;
        let w = &cfg.wheel;
        let actual = self.geo.actual_teeth;
        let rpm = cx.shared.status.rpm;
        let st = &mut cx.shared.state;

        let Some(gap) = passes(now, st.last_tooth_time, st.current_filter_time) else {
            return EdgeOutcome::Filtered;
        };
        st.tooth_current_count = st.tooth_current_count.saturating_add(1);
        st.valid_trigger = true;

        if st.last_tooth_time > 0 && st.last_minus_one_tooth_time > 0 {
            let mut is_missing_tooth = false;

            // Past 2000 RPM with sync, the gap can only be in the last quarter.
            if !st.has_sync
                || rpm < GAP_SEARCH_RPM
                || u32::from(st.tooth_current_count) >= (3 * u32::from(actual)) >> 2
            {
                let last_gap = st.last_tooth_time.wrapping_sub(st.last_minus_one_tooth_time);
                let target = Self::target_gap(cfg, last_gap);

                if gap > target || st.tooth_current_count > actual {
                    is_missing_tooth = true;
                    if st.tooth_current_count < actual && st.has_sync {
                        // Gap arrived early: teeth were lost, retry on the next revolution.
                        st.has_sync = false;
                        st.half_sync = false;
                        st.sync_loss_counter = st.sync_loss_counter.saturating_add(1);
                        st.shift_tooth_times(now);
                        debug!(
                            tooth = st.tooth_current_count,
                            losses = st.sync_loss_counter,
                            "missing tooth seen early, sync lost"
                        );
                    } else {
                        let had_sync = st.has_any_sync();
                        if had_sync {
                            let step = if w.trigger_speed.is_cam() { 2 } else { 1 };
                            st.start_revolutions = st.start_revolutions.saturating_add(step);
                        } else {
                            st.start_revolutions = 0;
                        }

                        st.tooth_current_count = 1;
                        st.revolution_one = if w.secondary_pattern == SecondaryPattern::Poll {
                            cx.inputs.is_high(TriggerInput::Secondary) == w.poll_level_high
                        } else {
                            !st.revolution_one
                        };
                        st.shift_tooth_one_times(now);

                        // Sequential fuel or spark needs the cam before full sync,
                        // unless the wheel itself covers the whole cycle.
                        let cycle_known = st.secondary.tooth_count > 0
                            || w.trigger_speed.is_cam()
                            || w.secondary_pattern == SecondaryPattern::Poll
                            || cfg.engine.strokes == Strokes::Two;
                        if !cfg.engine.sequential() || cycle_known {
                            st.has_sync = true;
                            st.half_sync = false;
                        } else if !st.has_sync {
                            st.half_sync = true;
                        }

                        if matches!(
                            w.secondary_pattern,
                            SecondaryPattern::Single | SecondaryPattern::Toyota3
                        ) {
                            st.secondary.tooth_count = 0;
                        }

                        // A wildly intermittent signal must not leave the filter stuck high.
                        st.current_filter_time = 0;
                        st.shift_tooth_times(now);
                        st.tooth_angle_correct = false;

                        if !had_sync {
                            debug!(
                                full = st.has_sync,
                                half = st.half_sync,
                                "missing tooth found, sync acquired"
                            );
                        }
                    }
                }
            }

            if !is_missing_tooth {
                st.current_filter_time = next_filter_time(w.filter_level, gap);
                st.shift_tooth_times(now);
                st.tooth_angle_correct = true;
            }
        } else {
            // Startup: not enough teeth seen to compare gaps.
            st.shift_tooth_times(now);
        }

        per_tooth(cx, self.geo.tooth_angle, true);
        EdgeOutcome::Accepted
    }

    fn secondary_edge(&self, cx: &mut EdgeCtx<'_>) -> EdgeOutcome {
        let now = cx.now;
        let cfg = cx.cfg;
        let st = &mut cx.shared.state;
        let sec = &mut st.secondary;

        let mut gap = now.wrapping_sub(sec.last_tooth_time);
        if sec.last_tooth_time == 0 {
            gap = 0;
            sec.last_tooth_time = now;
        }
        if gap < sec.filter_time {
            return EdgeOutcome::Filtered;
        }

        let mut record = false;
        match cfg.wheel.secondary_pattern {
            SecondaryPattern::FourMinusOne => {
                let last_gap = sec
                    .last_tooth_time
                    .wrapping_sub(sec.last_minus_one_tooth_time);
                let target = (3 * u64::from(last_gap)) >> 1;
                sec.last_minus_one_tooth_time = sec.last_tooth_time;
                if u64::from(gap) >= target || sec.tooth_count > 3 {
                    sec.tooth_count = 1;
                    st.revolution_one = true;
                    sec.filter_time = 0;
                    record = true;
                } else {
                    // Only regular teeth set the filter, never the gap.
                    sec.filter_time = gap >> 2;
                    sec.tooth_count = sec.tooth_count.saturating_add(1);
                }
            }
            SecondaryPattern::Poll => {
                // Level is sampled at tooth #1 instead; only the VVT angle is taken here.
                sec.filter_time = gap >> 1;
                record = true;
            }
            SecondaryPattern::Single => {
                st.revolution_one = true;
                sec.filter_time = gap >> 1;
                sec.tooth_count = sec.tooth_count.saturating_add(1);
                record = true;
            }
            SecondaryPattern::Toyota3 => {
                // One tooth in the first crank turn, two in the second.
                sec.tooth_count = sec.tooth_count.saturating_add(1);
                if sec.tooth_count == 2 {
                    st.revolution_one = true;
                    record = true;
                }
                sec.filter_time = gap >> 2;
            }
        }
        sec.last_tooth_time = now;

        if record {
            let angle = self.crank_angle(cfg, &AngleSnapshot::of(cx.shared), now);
            record_vvt1(cx, angle);
        }
        EdgeOutcome::Accepted
    }

    fn rpm(&self, cfg: &DecoderCfg, shared: &mut Shared) -> u16 {
        let cam = cfg.wheel.trigger_speed.is_cam();
        if shared.status.rpm < cfg.engine.crank_rpm {
            // The gap distorts the last-tooth interval at tooth #1.
            if shared.state.tooth_current_count != 1 {
                cranking_rpm(shared, &cfg.engine, cfg.wheel.teeth_total, cam)
            } else {
                shared.status.rpm
            }
        } else {
            std_rpm(shared, &cfg.engine, cam)
        }
    }

    fn crank_angle(&self, cfg: &DecoderCfg, snap: &AngleSnapshot, now: u32) -> i16 {
        let mut position = tooth_position(
            snap.tooth_current_count,
            self.geo.tooth_angle,
            cfg.wheel.base_angle_offset,
        );
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
        let adder = Self::tooth_adder(cfg);
        let mut tooth = raw_end_tooth(end_angle, w.base_angle_offset, self.geo.tooth_angle);
        if w.teeth_total > END_TOOTH_MARGIN_ABOVE_TEETH {
            tooth -= 1;
        }
        clamp_to_actual_teeth(
            clamp_to_tooth_count(tooth, w.teeth_total, adder),
            w.teeth_total,
            self.geo.actual_teeth,
            adder,
        )
    }
}
