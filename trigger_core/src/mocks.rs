//! Test and helper collaborators for trigger_core.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use trigger_traits::{
    OutputScheduler, ScheduleStatus, ToothLogEntry, ToothLogger, TriggerInput, TriggerInputs,
};

use crate::end_tooth::MAX_IGNITION_CHANNELS;

/// Output scheduler with nothing scheduled; refinements are dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullScheduler;

impl OutputScheduler for NullScheduler {
    fn status(&self, _channel: u8) -> ScheduleStatus {
        ScheduleStatus::Off
    }
    fn refine(&mut self, _channel: u8, _end_angle: i16, _crank_angle: i16) {}
}

#[derive(Debug, Default)]
struct Recorded {
    status: [ScheduleStatus; MAX_IGNITION_CHANNELS],
    requests: Vec<(u8, i16, i16)>,
}

/// Output scheduler that reports fixed per-channel status and records every
/// refinement request. Clones share the same record.
#[derive(Debug, Default, Clone)]
pub struct RecordingScheduler {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingScheduler {
    /// Every channel reports `status`.
    pub fn all(status: ScheduleStatus) -> Self {
        let s = Self::default();
        s.lock().status = [status; MAX_IGNITION_CHANNELS];
        s
    }

    pub fn set_status(&self, channel: u8, status: ScheduleStatus) {
        if let Some(slot) = self
            .lock()
            .status
            .get_mut(usize::from(channel.saturating_sub(1)))
        {
            *slot = status;
        }
    }

    /// `(channel, end_angle, crank_angle)` in request order.
    pub fn requests(&self) -> Vec<(u8, i16, i16)> {
        self.lock().requests.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl OutputScheduler for RecordingScheduler {
    fn status(&self, channel: u8) -> ScheduleStatus {
        self.lock()
            .status
            .get(usize::from(channel.saturating_sub(1)))
            .copied()
            .unwrap_or_default()
    }
    fn refine(&mut self, channel: u8, end_angle: i16, crank_angle: i16) {
        self.lock().requests.push((channel, end_angle, crank_angle));
    }
}

/// Logger that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLogger;

impl ToothLogger for NullLogger {
    fn log(&mut self, _entry: ToothLogEntry) {}
}

/// Input levels set by hand. Clones share the same levels.
#[derive(Debug, Default, Clone)]
pub struct FixedInputs {
    levels: Arc<[AtomicBool; 3]>,
}

impl FixedInputs {
    /// All three inputs held at `high`.
    pub fn all(high: bool) -> Self {
        let s = Self::default();
        for input in [
            TriggerInput::Primary,
            TriggerInput::Secondary,
            TriggerInput::Tertiary,
        ] {
            s.set(input, high);
        }
        s
    }

    pub fn set(&self, input: TriggerInput, high: bool) {
        self.levels[index(input)].store(high, Ordering::Release);
    }
}

impl TriggerInputs for FixedInputs {
    fn is_high(&self, input: TriggerInput) -> bool {
        self.levels[index(input)].load(Ordering::Acquire)
    }
}

const fn index(input: TriggerInput) -> usize {
    match input {
        TriggerInput::Primary => 0,
        TriggerInput::Secondary => 1,
        TriggerInput::Tertiary => 2,
    }
}
