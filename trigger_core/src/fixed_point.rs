//! Fixed-point helpers for the angle/time and RPM arithmetic.
//!
//! Two formats are used throughout:
//! - UQ24.8 microseconds-per-degree (`US_PER_DEG_SHIFT`)
//! - UQ1.15 degrees-per-microsecond (`DEG_PER_US_SHIFT`)
//!
//! All right shifts round to nearest; truncating here shows up as a
//! systematic angle lag at low RPM.

/// Fractional bits of the microseconds-per-degree constant.
pub const US_PER_DEG_SHIFT: u32 = 8;
/// Fractional bits of the degrees-per-microsecond constant.
pub const DEG_PER_US_SHIFT: u32 = 15;

/// Right shift by `shift` bits, rounding half up.
#[inline]
pub const fn rshift_round(n: u64, shift: u32) -> u64 {
    if shift == 0 {
        return n;
    }
    (n + (1u64 << (shift - 1))) >> shift
}

/// Unsigned division rounded to the closest integer (half up).
/// Division by zero yields 0.
#[inline]
pub const fn udiv_round_closest(n: u64, d: u64) -> u64 {
    if d == 0 {
        return 0;
    }
    (n + d / 2) / d
}

/// Exponential smoothing of an angle sample: `(raw*(256-α) + prior*α) >> 8`.
///
/// `alpha` is the weight of the prior value; 0 passes `raw` straight through.
#[inline]
pub fn angle_filter(raw: i16, alpha: u8, prior: i16) -> i16 {
    let a = i32::from(alpha);
    let mixed = i32::from(raw) * (256 - a) + i32::from(prior) * a;
    // The weighted mean of two i16 values always fits back into i16.
    (mixed >> 8) as i16
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 8, 0)]
    #[case(127, 8, 0)]
    #[case(128, 8, 1)]
    #[case(383, 8, 1)]
    #[case(384, 8, 2)]
    #[case(5, 0, 5)]
    fn rshift_round_is_half_up(#[case] n: u64, #[case] s: u32, #[case] want: u64) {
        assert_eq!(rshift_round(n, s), want);
    }

    #[test]
    fn udiv_round_closest_rounds() {
        assert_eq!(udiv_round_closest(60_000_000, 36_000), 1667);
        assert_eq!(udiv_round_closest(10, 4), 3);
        assert_eq!(udiv_round_closest(9, 4), 2);
        assert_eq!(udiv_round_closest(1, 0), 0);
    }

    #[test]
    fn angle_filter_alpha_zero_passes_raw() {
        assert_eq!(angle_filter(123, 0, -400), 123);
    }

    #[test]
    fn angle_filter_converges_towards_raw() {
        let mut v = 0i16;
        for _ in 0..200 {
            v = angle_filter(100, 128, v);
        }
        // floor rounding parks the value just below the target
        assert!((99..=100).contains(&v), "v = {v}");
    }

    #[test]
    fn angle_filter_handles_negative_angles() {
        assert_eq!(angle_filter(-60, 0, 0), -60);
        let v = angle_filter(-60, 128, -60);
        assert_eq!(v, -60);
    }
}
