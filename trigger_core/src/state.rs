//! Mutable decoder state. Only edge handlers write it; queries copy it out
//! under a critical section.

use crate::end_tooth::IgnitionEndTable;
use crate::timing::RevolutionTiming;

/// Timestamps, filter and tooth counter of one cam input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CamTrack {
    pub last_tooth_time: u32,
    pub last_minus_one_tooth_time: u32,
    pub filter_time: u32,
    pub tooth_count: u8,
}

/// Per-decoder runtime state.
///
/// A timestamp of 0 means "not seen yet".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderRuntimeState {
    pub tooth_current_count: u16,
    pub last_tooth_time: u32,
    pub last_minus_one_tooth_time: u32,
    pub tooth_one_time: u32,
    pub tooth_one_minus_one_time: u32,
    /// Second half of the 720° cycle when false.
    pub revolution_one: bool,
    pub has_sync: bool,
    /// Primary count is plausible but the cam has not confirmed the cycle half.
    pub half_sync: bool,
    pub sync_loss_counter: u32,
    pub start_revolutions: u32,
    /// Primary filter threshold (µs).
    pub current_filter_time: u32,
    /// The last tooth was a regular tooth, not the one after the gap.
    pub tooth_angle_correct: bool,
    /// The last primary edge passed the filter.
    pub valid_trigger: bool,
    /// Primary wraps since the secondary last confirmed the count.
    pub wraps_since_confirmation: u8,
    pub secondary: CamTrack,
    pub tertiary: CamTrack,
}

impl DecoderRuntimeState {
    /// Either level of sync.
    #[inline]
    pub fn has_any_sync(&self) -> bool {
        self.has_sync || self.half_sync
    }

    /// Record an accepted primary tooth time.
    #[inline]
    pub fn shift_tooth_times(&mut self, now: u32) {
        self.last_minus_one_tooth_time = self.last_tooth_time;
        self.last_tooth_time = now;
    }

    /// Record a tooth #1 time.
    #[inline]
    pub fn shift_tooth_one_times(&mut self, now: u32) {
        self.tooth_one_minus_one_time = self.tooth_one_time;
        self.tooth_one_time = now;
    }

    /// Back to unsynchronized with fresh filter thresholds.
    ///
    /// The sync-loss counter is a lifetime diagnostic and survives resets.
    pub fn reset(&mut self, primary_filter: u32, secondary_filter: u32) {
        let sync_loss_counter = self.sync_loss_counter;
        *self = Self {
            sync_loss_counter,
            current_filter_time: primary_filter,
            ..Self::default()
        };
        self.secondary.filter_time = secondary_filter;
    }
}

/// Engine status shared between the decoder and the rest of the controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStatus {
    /// Last RPM reported by the estimator.
    pub rpm: u16,
    /// Engine is cranking; per-tooth timing is suspended.
    pub cranking: bool,
    /// Fixed cranking timing in force; refinements are not requested.
    pub fixed_cranking_override: bool,
    /// Filtered cam angles in 0.5° units.
    pub vvt1_angle: i16,
    pub vvt2_angle: i16,
}

/// Everything guarded by the decoder's critical section.
#[derive(Debug, Clone, Default)]
pub(crate) struct Shared {
    pub state: DecoderRuntimeState,
    pub timing: RevolutionTiming,
    pub status: EngineStatus,
    pub end_table: IgnitionEndTable,
}

/// Consistent copy of the decoder state for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderSnapshot {
    pub tooth_current_count: u16,
    pub has_sync: bool,
    pub half_sync: bool,
    pub revolution_one: bool,
    pub sync_loss_counter: u32,
    pub start_revolutions: u32,
    pub rpm: u16,
    pub revolution_time: u32,
    pub filter_time: u32,
    pub vvt1_angle: i16,
    pub vvt2_angle: i16,
}

impl Shared {
    pub fn snapshot(&self) -> DecoderSnapshot {
        DecoderSnapshot {
            tooth_current_count: self.state.tooth_current_count,
            has_sync: self.state.has_sync,
            half_sync: self.state.half_sync,
            revolution_one: self.state.revolution_one,
            sync_loss_counter: self.state.sync_loss_counter,
            start_revolutions: self.state.start_revolutions,
            rpm: self.status.rpm,
            revolution_time: self.timing.revolution_time,
            filter_time: self.state.current_filter_time,
            vvt1_angle: self.status.vvt1_angle,
            vvt2_angle: self.status.vvt2_angle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_keeps_sync_loss_counter() {
        let mut s = DecoderRuntimeState {
            tooth_current_count: 12,
            has_sync: true,
            sync_loss_counter: 3,
            last_tooth_time: 5_000,
            ..Default::default()
        };
        s.secondary.tooth_count = 2;
        s.reset(92, 416);
        assert_eq!(s.sync_loss_counter, 3);
        assert_eq!(s.tooth_current_count, 0);
        assert!(!s.has_sync);
        assert_eq!(s.last_tooth_time, 0);
        assert_eq!(s.current_filter_time, 92);
        assert_eq!(s.secondary.filter_time, 416);
        assert_eq!(s.secondary.tooth_count, 0);
    }

    #[test]
    fn counters_run_past_sixteen_bits() {
        let mut s = DecoderRuntimeState {
            sync_loss_counter: u32::from(u16::MAX),
            start_revolutions: u32::from(u16::MAX),
            ..Default::default()
        };
        s.sync_loss_counter = s.sync_loss_counter.saturating_add(1);
        s.start_revolutions = s.start_revolutions.saturating_add(2);
        s.reset(92, 416);
        assert_eq!(s.sync_loss_counter, 65_536);
        assert_eq!(s.start_revolutions, 0);
    }
}
