//! RPM estimation.
//!
//! - Standard: full tooth-#1 to tooth-#1 interval, halved for cam-speed wheels.
//! - Cranking: last tooth gap scaled by the total tooth count. Noisier but
//!   responds within a tooth while the engine is slow.
//!
//! Both reject any result at or above `max_rpm` and keep the previous value.

use crate::config::EngineCfg;
use crate::fixed_point::udiv_round_closest;
use crate::state::Shared;
use crate::util::MICROS_PER_MIN;

/// RPM for a revolution time, or `previous` if the result is implausible.
#[inline]
pub fn rpm_from_revolution_time(revolution_time: u32, max_rpm: u16, previous: u16) -> u16 {
    if revolution_time == 0 {
        return previous;
    }
    let rpm = udiv_round_closest(u64::from(MICROS_PER_MIN), u64::from(revolution_time));
    if rpm >= u64::from(max_rpm) {
        previous
    } else {
        rpm as u16
    }
}

/// Cranking: below the cranking band with no completed start revolutions yet.
#[inline]
pub(crate) fn is_cranking(shared: &Shared, engine: &EngineCfg) -> bool {
    shared.status.rpm < engine.crank_rpm && shared.state.start_revolutions == 0
}

/// Standard estimator over the last two tooth-#1 timestamps.
pub(crate) fn std_rpm(shared: &mut Shared, engine: &EngineCfg, cam_teeth: bool) -> u16 {
    let st = shared.state;
    let updated = st.has_any_sync()
        && !is_cranking(shared, engine)
        && st.tooth_one_minus_one_time != 0
        && st.tooth_one_time > st.tooth_one_minus_one_time
        && shared.timing.set_revolution_time(
            (st.tooth_one_time - st.tooth_one_minus_one_time) >> u32::from(cam_teeth),
        );
    if updated {
        rpm_from_revolution_time(
            shared.timing.revolution_time,
            engine.max_rpm,
            shared.status.rpm,
        )
    } else {
        shared.status.rpm
    }
}

/// Per-tooth estimator for evenly spaced wheels. `total_teeth` counts missing slots.
pub(crate) fn cranking_rpm(
    shared: &mut Shared,
    engine: &EngineCfg,
    total_teeth: u16,
    cam_teeth: bool,
) -> u16 {
    let st = shared.state;
    if st.start_revolutions >= u32::from(engine.stg_cycles)
        && st.has_any_sync()
        && st.last_minus_one_tooth_time > 0
        && st.last_tooth_time > st.last_minus_one_tooth_time
    {
        let gap = u64::from(st.last_tooth_time - st.last_minus_one_tooth_time);
        let rev = (gap * u64::from(total_teeth)) >> u32::from(cam_teeth);
        let rev = u32::try_from(rev).unwrap_or(u32::MAX);
        if shared.timing.set_revolution_time(rev) {
            return rpm_from_revolution_time(
                shared.timing.revolution_time,
                engine.max_rpm,
                shared.status.rpm,
            );
        }
    }
    shared.status.rpm
}
