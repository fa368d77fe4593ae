//! Ignition end-tooth table.
//!
//! For each ignition channel the tooth after which its end compare should be
//! refined. Recomputed whenever ignition timing changes; read on every
//! accepted primary edge.

/// Upper bound on ignition channels.
pub const MAX_IGNITION_CHANNELS: usize = 8;

/// Wheels with more teeth than this get one tooth of margin for computation latency.
pub const END_TOOTH_MARGIN_ABOVE_TEETH: u16 = 12;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EndTooth {
    /// Crank angle at which the channel's event must end.
    pub end_angle: i16,
    pub end_tooth: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnitionEndTable {
    entries: [EndTooth; MAX_IGNITION_CHANNELS],
    channels: u8,
}

impl IgnitionEndTable {
    /// Number of populated channels.
    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Entry for a 1-based channel number.
    pub fn get(&self, channel: u8) -> Option<EndTooth> {
        if channel == 0 || channel > self.channels {
            return None;
        }
        self.entries.get(usize::from(channel - 1)).copied()
    }

    /// `(channel, entry)` pairs for the populated channels.
    pub fn iter(&self) -> impl Iterator<Item = (u8, EndTooth)> + '_ {
        (1..=self.channels).zip(self.entries.iter().copied())
    }

    pub(crate) fn set(&mut self, entries: &[EndTooth]) {
        let n = entries.len().min(MAX_IGNITION_CHANNELS);
        self.entries = [EndTooth::default(); MAX_IGNITION_CHANNELS];
        self.entries[..n].copy_from_slice(&entries[..n]);
        self.channels = n as u8;
    }
}

/// Shift `value` by one `range` when it falls outside `[min, max]`.
#[inline]
pub fn nudge(min: i32, max: i32, value: i32, range: i32) -> i32 {
    if value < min {
        value + range
    } else if value > max {
        value - range
    } else {
        value
    }
}

/// Wrap a raw tooth number into `[1, teeth_total + adder]`.
#[inline]
pub fn clamp_to_tooth_count(tooth: i32, teeth_total: u16, adder: u16) -> u16 {
    let range = i32::from(teeth_total) + i32::from(adder);
    nudge(1, range, tooth, range).clamp(1, range) as u16
}

/// Teeth in the missing region saturate to the last physical tooth.
#[inline]
pub fn clamp_to_actual_teeth(tooth: u16, teeth_total: u16, actual_teeth: u16, adder: u16) -> u16 {
    let t = if tooth > actual_teeth && tooth <= teeth_total {
        actual_teeth
    } else {
        tooth
    };
    t.min(actual_teeth.saturating_add(adder))
}

/// Raw end tooth: whole teeth from tooth #1 to `end_angle`.
///
/// Division truncates toward zero, it does not floor: -25° on 10° teeth is
/// tooth -2, not -3. [`clamp_to_tooth_count`] then wraps it into range, so
/// an end angle just before tooth #1 lands one tooth later than a floor
/// would put it.
#[inline]
pub fn raw_end_tooth(end_angle: i16, base_angle_offset: i16, tooth_angle: u16) -> i32 {
    (i32::from(end_angle) - i32::from(base_angle_offset)) / i32::from(tooth_angle.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(-3, 36, 0, 33)]
    #[case(0, 36, 0, 36)]
    #[case(37, 36, 0, 1)]
    #[case(40, 36, 36, 40)]
    #[case(73, 36, 36, 1)]
    fn tooth_count_wraps_by_one_range(
        #[case] raw: i32,
        #[case] total: u16,
        #[case] adder: u16,
        #[case] want: u16,
    ) {
        assert_eq!(clamp_to_tooth_count(raw, total, adder), want);
    }

    #[rstest]
    #[case(36, 36, 35, 0, 35)]
    #[case(20, 36, 35, 0, 20)]
    #[case(72, 36, 35, 36, 71)]
    #[case(40, 36, 35, 36, 40)]
    fn missing_region_saturates(
        #[case] tooth: u16,
        #[case] total: u16,
        #[case] actual: u16,
        #[case] adder: u16,
        #[case] want: u16,
    ) {
        assert_eq!(clamp_to_actual_teeth(tooth, total, actual, adder), want);
    }

    #[test]
    fn raw_end_tooth_truncates_towards_zero() {
        assert_eq!(raw_end_tooth(340, 0, 15), 22);
        assert_eq!(raw_end_tooth(-25, 0, 10), -2);
        assert_eq!(raw_end_tooth(355, 10, 10), 34);
        assert_eq!(raw_end_tooth(5, 30, 10), -2);
        // -2 wraps to the 34th slot, where a floor would give 33
        assert_eq!(clamp_to_tooth_count(raw_end_tooth(-25, 0, 10), 36, 0), 34);
    }

    #[test]
    fn table_exposes_only_populated_channels() {
        let mut t = IgnitionEndTable::default();
        t.set(&[
            EndTooth {
                end_angle: 340,
                end_tooth: 33,
            },
            EndTooth {
                end_angle: 160,
                end_tooth: 15,
            },
        ]);
        assert_eq!(t.channels(), 2);
        assert_eq!(t.get(2).map(|e| e.end_tooth), Some(15));
        assert_eq!(t.get(3), None);
        assert_eq!(t.get(0), None);
        assert_eq!(t.iter().count(), 2);
    }
}
