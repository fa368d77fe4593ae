//! Revolution timing and the fixed-point angle/time conversions built on it.

use crate::fixed_point::{DEG_PER_US_SHIFT, US_PER_DEG_SHIFT, rshift_round, udiv_round_closest};

/// Time of one crank revolution plus its two fixed-point derivatives.
///
/// The derivatives are only ever recomputed together by
/// [`RevolutionTiming::set_revolution_time`]; zero in every field means the
/// engine speed is unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RevolutionTiming {
    /// µs per 360°.
    pub revolution_time: u32,
    /// UQ24.8 µs per degree.
    pub us_per_degree: u32,
    /// UQ1.15 degrees per µs.
    pub degrees_per_us: u16,
}

impl RevolutionTiming {
    /// Replace the revolution time and recompute both derivatives.
    ///
    /// Returns `false` (and touches nothing) when `new_time` equals the
    /// current value.
    pub fn set_revolution_time(&mut self, new_time: u32) -> bool {
        if new_time == self.revolution_time {
            return false;
        }
        if new_time == 0 {
            *self = Self::default();
            return true;
        }
        self.revolution_time = new_time;
        let rev = u64::from(new_time);
        let mpd = udiv_round_closest(rev << US_PER_DEG_SHIFT, 360);
        self.us_per_degree = u32::try_from(mpd).unwrap_or(u32::MAX);
        let dpm = udiv_round_closest(360u64 << DEG_PER_US_SHIFT, rev);
        self.degrees_per_us = u16::try_from(dpm).unwrap_or(u16::MAX);
        true
    }

    /// Forget the current speed.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Microseconds the crank needs to turn `angle` degrees at the current speed.
    #[inline]
    pub fn angle_to_time(&self, angle: u16) -> u32 {
        let us = rshift_round(
            u64::from(angle) * u64::from(self.us_per_degree),
            US_PER_DEG_SHIFT,
        );
        u32::try_from(us).unwrap_or(u32::MAX)
    }

    /// Degrees the crank turns in `time_us` at the current speed.
    #[inline]
    pub fn time_to_angle(&self, time_us: u32) -> u32 {
        let deg = rshift_round(
            u64::from(time_us) * u64::from(self.degrees_per_us),
            DEG_PER_US_SHIFT,
        );
        u32::try_from(deg).unwrap_or(u32::MAX)
    }
}
