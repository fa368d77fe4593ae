//! Configuration types for the trigger decoder.
//!
//! These are the runtime configuration structs consumed by `Trigger`.
//! They are separate from the TOML-deserialized config in `trigger_config`
//! and are read-only once the decoder has been built.

use crate::util::{DEFAULT_CRANK_RPM, DEFAULT_MAX_RPM};

/// Decoder variant, selected once at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WheelPattern {
    /// Evenly spaced teeth with a gap of one or more missing slots.
    #[default]
    MissingTooth,
    /// Even primary wheel plus a secondary wheel that marks the tooth count.
    DualWheel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerSpeed {
    /// One pattern cycle per crank revolution (360°).
    #[default]
    Crank,
    /// One pattern cycle per cam revolution (720°).
    Cam,
}

impl TriggerSpeed {
    #[inline]
    pub const fn cycle_degrees(self) -> u16 {
        match self {
            Self::Crank => 360,
            Self::Cam => 720,
        }
    }

    #[inline]
    pub const fn is_cam(self) -> bool {
        matches!(self, Self::Cam)
    }
}

/// Adaptive noise filter strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterLevel {
    Off,
    /// 25 % of the previous gap.
    #[default]
    Light,
    /// 50 % of the previous gap.
    Medium,
    /// 75 % of the previous gap.
    Aggressive,
}

/// Which transitions of an input count as edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgePolarity {
    #[default]
    Rising,
    Falling,
    Both,
}

impl EdgePolarity {
    /// Whether an interrupt that leaves the input at `level_high` is a qualifying edge.
    #[inline]
    pub const fn accepts(self, level_high: bool) -> bool {
        match self {
            Self::Rising => level_high,
            Self::Falling => !level_high,
            Self::Both => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecondaryPattern {
    #[default]
    Single,
    FourMinusOne,
    Poll,
    Toyota3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strokes {
    Two,
    #[default]
    Four,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SparkMode {
    #[default]
    Wasted,
    Single,
    Sequential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VvtMode {
    #[default]
    OpenLoop,
    ClosedLoop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToothLogMode {
    #[default]
    Off,
    /// Primary gaps only, valid edges only.
    Tooth,
    /// Every edge on every input, with level and sync bits.
    Composite,
}

/// Physical wheel layout and input handling.
#[derive(Debug, Clone)]
pub struct WheelPatternCfg {
    pub pattern: WheelPattern,
    /// Tooth slots per pattern cycle, including missing ones.
    pub teeth_total: u16,
    pub missing_teeth: u8,
    pub trigger_speed: TriggerSpeed,
    /// Crank angle ATDC of tooth #1.
    pub base_angle_offset: i16,
    pub filter_level: FilterLevel,
    /// Gap (as a percentage of the previous gap) that marks a single missing tooth.
    pub gap_ratio_percent: u16,
    pub secondary_pattern: SecondaryPattern,
    pub secondary_speed: TriggerSpeed,
    /// Cam level that marks revolution one for [`SecondaryPattern::Poll`].
    pub poll_level_high: bool,
    pub primary_edge: EdgePolarity,
    pub secondary_edge: EdgePolarity,
    pub tertiary_edge: EdgePolarity,
}

impl Default for WheelPatternCfg {
    fn default() -> Self {
        Self {
            pattern: WheelPattern::MissingTooth,
            teeth_total: 36,
            missing_teeth: 1,
            trigger_speed: TriggerSpeed::Crank,
            base_angle_offset: 0,
            filter_level: FilterLevel::Light,
            gap_ratio_percent: 150,
            secondary_pattern: SecondaryPattern::Single,
            secondary_speed: TriggerSpeed::Cam,
            poll_level_high: true,
            primary_edge: EdgePolarity::Rising,
            secondary_edge: EdgePolarity::Rising,
            tertiary_edge: EdgePolarity::Rising,
        }
    }
}

impl WheelPatternCfg {
    /// Physical teeth on the wheel.
    #[inline]
    pub fn actual_teeth(&self) -> u16 {
        self.teeth_total
            .saturating_sub(u16::from(self.missing_teeth))
    }

    /// Degrees between adjacent tooth slots.
    #[inline]
    pub fn tooth_angle(&self) -> u16 {
        self.trigger_speed.cycle_degrees() / self.teeth_total.max(1)
    }
}

/// Engine-level settings the decoder needs.
#[derive(Debug, Clone)]
pub struct EngineCfg {
    /// Computed RPM at or above this is discarded.
    pub max_rpm: u16,
    /// Cranking band ceiling.
    pub crank_rpm: u16,
    /// Start revolutions before the per-tooth cranking RPM is trusted.
    pub stg_cycles: u8,
    pub strokes: Strokes,
    pub spark_mode: SparkMode,
    pub inj_sequential: bool,
    pub per_tooth_ignition: bool,
    /// Snap the tooth count to the expected value when a secondary edge disagrees.
    pub use_resync: bool,
    /// Number of ignition channels in use (1..=8).
    pub ignition_channels: u8,
}

impl Default for EngineCfg {
    fn default() -> Self {
        Self {
            max_rpm: DEFAULT_MAX_RPM,
            crank_rpm: DEFAULT_CRANK_RPM,
            stg_cycles: 4,
            strokes: Strokes::Four,
            spark_mode: SparkMode::Wasted,
            inj_sequential: false,
            per_tooth_ignition: true,
            use_resync: false,
            ignition_channels: 4,
        }
    }
}

impl EngineCfg {
    /// Fuel or spark needs to know which half of the 720° cycle it is in.
    #[inline]
    pub fn sequential(&self) -> bool {
        self.spark_mode == SparkMode::Sequential || self.inj_sequential
    }

    /// Degrees per full engine cycle.
    #[inline]
    pub fn engine_cycle_degrees(&self) -> i32 {
        match self.strokes {
            Strokes::Two => 360,
            Strokes::Four => 720,
        }
    }
}

/// Cam phase capture.
#[derive(Debug, Clone, Default)]
pub struct VvtCfg {
    pub enabled: bool,
    pub mode: VvtMode,
    /// Weight of the previous sample in the angle filter (0 = unfiltered).
    pub angle_filter: u8,
    /// Closed-loop VVT1 angle at 0 % duty.
    pub cl0_duty_angle: i16,
    /// Closed-loop VVT2 angle at 0 % duty.
    pub vvt2_cl0_duty_angle: i16,
}

/// Everything a decoder instance reads at runtime.
#[derive(Debug, Clone, Default)]
pub struct DecoderCfg {
    pub wheel: WheelPatternCfg,
    pub engine: EngineCfg,
    pub vvt: VvtCfg,
    pub tooth_log: ToothLogMode,
}
