//! `From` implementations bridging `trigger_config` types to `trigger_core` types.

use crate::config::{
    DecoderCfg, EdgePolarity, EngineCfg, FilterLevel, SecondaryPattern, SparkMode, Strokes,
    ToothLogMode, TriggerSpeed, VvtCfg, VvtMode, WheelPattern, WheelPatternCfg,
};

// ── Enums ────────────────────────────────────────────────────────────────────

impl From<trigger_config::Pattern> for WheelPattern {
    fn from(p: trigger_config::Pattern) -> Self {
        match p {
            trigger_config::Pattern::MissingTooth => Self::MissingTooth,
            trigger_config::Pattern::DualWheel => Self::DualWheel,
        }
    }
}

impl From<trigger_config::Speed> for TriggerSpeed {
    fn from(s: trigger_config::Speed) -> Self {
        match s {
            trigger_config::Speed::Crank => Self::Crank,
            trigger_config::Speed::Cam => Self::Cam,
        }
    }
}

impl From<trigger_config::FilterLevel> for FilterLevel {
    fn from(f: trigger_config::FilterLevel) -> Self {
        match f {
            trigger_config::FilterLevel::Off => Self::Off,
            trigger_config::FilterLevel::Light => Self::Light,
            trigger_config::FilterLevel::Medium => Self::Medium,
            trigger_config::FilterLevel::Aggressive => Self::Aggressive,
        }
    }
}

impl From<trigger_config::EdgePolarity> for EdgePolarity {
    fn from(e: trigger_config::EdgePolarity) -> Self {
        match e {
            trigger_config::EdgePolarity::Rising => Self::Rising,
            trigger_config::EdgePolarity::Falling => Self::Falling,
            trigger_config::EdgePolarity::Both => Self::Both,
        }
    }
}

impl From<trigger_config::SecondaryPattern> for SecondaryPattern {
    fn from(p: trigger_config::SecondaryPattern) -> Self {
        match p {
            trigger_config::SecondaryPattern::Single => Self::Single,
            trigger_config::SecondaryPattern::FourMinusOne => Self::FourMinusOne,
            trigger_config::SecondaryPattern::Poll => Self::Poll,
            trigger_config::SecondaryPattern::Toyota3 => Self::Toyota3,
        }
    }
}

impl From<trigger_config::SparkMode> for SparkMode {
    fn from(m: trigger_config::SparkMode) -> Self {
        match m {
            trigger_config::SparkMode::Wasted => Self::Wasted,
            trigger_config::SparkMode::Single => Self::Single,
            trigger_config::SparkMode::Sequential => Self::Sequential,
        }
    }
}

impl From<trigger_config::VvtMode> for VvtMode {
    fn from(m: trigger_config::VvtMode) -> Self {
        match m {
            trigger_config::VvtMode::OpenLoop => Self::OpenLoop,
            trigger_config::VvtMode::ClosedLoop => Self::ClosedLoop,
        }
    }
}

impl From<trigger_config::ToothLog> for ToothLogMode {
    fn from(m: trigger_config::ToothLog) -> Self {
        match m {
            trigger_config::ToothLog::Off => Self::Off,
            trigger_config::ToothLog::Tooth => Self::Tooth,
            trigger_config::ToothLog::Composite => Self::Composite,
        }
    }
}

// ── WheelPatternCfg ──────────────────────────────────────────────────────────

impl From<&trigger_config::Config> for WheelPatternCfg {
    fn from(c: &trigger_config::Config) -> Self {
        let w = &c.wheel;
        let s = &c.secondary;
        Self {
            pattern: w.pattern.into(),
            teeth_total: w.teeth,
            missing_teeth: w.missing_teeth,
            trigger_speed: w.speed.into(),
            base_angle_offset: w.angle,
            filter_level: w.filter.into(),
            gap_ratio_percent: w.gap_ratio_percent,
            secondary_pattern: s.pattern.into(),
            secondary_speed: s.speed.into(),
            poll_level_high: s.poll_level_high,
            primary_edge: w.edge.into(),
            secondary_edge: s.edge.into(),
            tertiary_edge: s.tertiary_edge.into(),
        }
    }
}

// ── EngineCfg ────────────────────────────────────────────────────────────────

impl From<&trigger_config::Engine> for EngineCfg {
    fn from(e: &trigger_config::Engine) -> Self {
        Self {
            max_rpm: e.max_rpm,
            crank_rpm: e.crank_rpm,
            stg_cycles: e.stg_cycles,
            strokes: if e.strokes == 2 {
                Strokes::Two
            } else {
                Strokes::Four
            },
            spark_mode: e.spark_mode.into(),
            inj_sequential: e.inj_sequential,
            per_tooth_ignition: e.per_tooth_ignition,
            use_resync: e.use_resync,
            ignition_channels: e.ignition_channels,
        }
    }
}

// ── VvtCfg ───────────────────────────────────────────────────────────────────

impl From<&trigger_config::Vvt> for VvtCfg {
    fn from(v: &trigger_config::Vvt) -> Self {
        Self {
            enabled: v.enabled,
            mode: v.mode.into(),
            angle_filter: v.angle_filter,
            cl0_duty_angle: v.cl0_duty_angle,
            vvt2_cl0_duty_angle: v.vvt2_cl0_duty_angle,
        }
    }
}

// ── DecoderCfg ───────────────────────────────────────────────────────────────

impl From<&trigger_config::Config> for DecoderCfg {
    fn from(c: &trigger_config::Config) -> Self {
        Self {
            wheel: c.into(),
            engine: (&c.engine).into(),
            vvt: (&c.vvt).into(),
            tooth_log: c.logging.tooth_log.into(),
        }
    }
}
