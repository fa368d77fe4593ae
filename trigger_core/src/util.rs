//! Time constants shared by the decoders and the RPM estimator.

/// Number of microseconds in one second.
pub const MICROS_PER_SEC: u32 = 1_000_000;
/// Number of microseconds in one minute.
pub const MICROS_PER_MIN: u32 = 60_000_000;
/// Microseconds per crank degree at 1 RPM, rounded.
pub const MICROS_PER_DEG_1_RPM: u32 = 166_667;
/// Lowest speed the decoders are sized for; also bounds the stall timeout.
pub const MIN_RPM: u32 = 50;
/// Default upper RPM clamp.
pub const DEFAULT_MAX_RPM: u16 = 18_000;
/// Default cranking band ceiling.
pub const DEFAULT_CRANK_RPM: u16 = 400;
/// Highest configurable `max_rpm`; above this degrees-per-µs no longer fits UQ1.15.
pub const MAX_SUPPORTED_RPM: u16 = 30_000;
/// Per-tooth RPM tracking switches off missing-tooth search above this speed
/// outside the last quarter of the wheel.
pub const GAP_SEARCH_RPM: u16 = 2_000;

/// Shortest legal gap between two primary teeth at `max_rpm` (µs).
#[inline]
pub fn min_tooth_gap_us(max_rpm: u16, teeth: u16) -> u32 {
    let per_sec = u32::from(max_rpm / 60) * u32::from(teeth);
    MICROS_PER_SEC / per_sec.max(1)
}
