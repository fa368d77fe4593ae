//! Adaptive noise filter for evenly spaced teeth.

use crate::config::FilterLevel;

/// Minimum gap the *next* edge must have, derived from the gap just seen.
#[inline]
pub fn next_filter_time(level: FilterLevel, gap: u32) -> u32 {
    match level {
        FilterLevel::Off => 0,
        FilterLevel::Light => gap >> 2,
        FilterLevel::Medium => gap >> 1,
        FilterLevel::Aggressive => ((u64::from(gap) * 3) >> 2) as u32,
    }
}

/// Gap since `last` when it clears `threshold`; `None` means the edge is noise.
#[inline]
pub fn passes(now: u32, last: u32, threshold: u32) -> Option<u32> {
    let gap = now.wrapping_sub(last);
    (gap >= threshold).then_some(gap)
}
