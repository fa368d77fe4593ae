//! Collaborator traits shared by the trigger decoder and its hosts.
//!
//! The decoder core only talks to the outside world through these: input
//! levels, a microsecond clock, the ignition output scheduler and the
//! diagnostic tooth logger.
pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// One of the three physical trigger inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerInput {
    /// Crank (or cam, for cam-speed wheels) pattern.
    Primary,
    /// First cam reference, used for sequential sync and VVT1.
    Secondary,
    /// Second cam reference, used for VVT2 only.
    Tertiary,
}

/// A timestamped edge as captured by an input interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub input: TriggerInput,
    pub time_us: u32,
    /// Input level sampled with the edge. `None` reads the live level when
    /// the edge is handled.
    pub level: Option<bool>,
}

impl Edge {
    pub const fn new(input: TriggerInput, time_us: u32) -> Self {
        Self {
            input,
            time_us,
            level: None,
        }
    }

    /// Carry the level the input had when the edge was captured.
    #[must_use]
    pub const fn with_level(mut self, high: bool) -> Self {
        self.level = Some(high);
        self
    }
}

/// Instantaneous logic level of the trigger inputs.
pub trait TriggerInputs {
    fn is_high(&self, input: TriggerInput) -> bool;
}

/// State of one ignition channel's scheduled event, as owned by the output scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScheduleStatus {
    /// Nothing scheduled for this channel.
    #[default]
    Off,
    /// Scheduled, coil charge not yet started.
    Pending,
    /// Coil charging; the end compare can still be moved.
    Running,
}

/// Output scheduler that owns the timer-compare hardware.
///
/// The decoder only asks it to refine a channel's end compare using the angle
/// it has just measured; arming and firing stay with the scheduler.
pub trait OutputScheduler {
    /// Channel numbers are 1-based (1..=8).
    fn status(&self, channel: u8) -> ScheduleStatus;
    fn refine(&mut self, channel: u8, end_angle: i16, crank_angle: i16);
}

impl<T: OutputScheduler + ?Sized> OutputScheduler for Box<T> {
    fn status(&self, channel: u8) -> ScheduleStatus {
        (**self).status(channel)
    }
    fn refine(&mut self, channel: u8, end_angle: i16, crank_angle: i16) {
        (**self).refine(channel, end_angle, crank_angle);
    }
}

/// Composite-log classification bits.
pub mod composite {
    pub const PRIMARY_LEVEL: u8 = 1 << 0;
    pub const SECONDARY_LEVEL: u8 = 1 << 1;
    pub const TERTIARY_LEVEL: u8 = 1 << 2;
    /// Set when the entry was produced by a cam input.
    pub const CAM_TRIGGER: u8 = 1 << 3;
    pub const SYNC: u8 = 1 << 4;
    /// Second half of a 720° cycle.
    pub const ENGINE_CYCLE: u8 = 1 << 5;
}

/// One diagnostic entry for an accepted edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToothLogEntry {
    pub input: TriggerInput,
    /// Edge timestamp (µs).
    pub time_us: u32,
    /// Gap since the previous edge on the same input (µs).
    pub gap_us: u32,
    /// See [`composite`].
    pub flags: u8,
}

/// Diagnostic tooth/composite logger. Called from interrupt context; must not block.
pub trait ToothLogger {
    fn log(&mut self, entry: ToothLogEntry);
}

impl<T: ToothLogger + ?Sized> ToothLogger for Box<T> {
    fn log(&mut self, entry: ToothLogEntry) {
        (**self).log(entry);
    }
}

impl<T: TriggerInputs + ?Sized> TriggerInputs for std::sync::Arc<T> {
    fn is_high(&self, input: TriggerInput) -> bool {
        (**self).is_high(input)
    }
}
