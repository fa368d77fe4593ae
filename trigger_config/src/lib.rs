#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and edge-trace parsing for the trigger decoder.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Edge-trace CSV loader enforces headers so recorded tooth logs can be
//!   replayed through the decoder.
use serde::Deserialize;

/// Lowest engine speed the fixed-point timing constants are sized for.
pub const MIN_RPM: u16 = 50;
/// Highest `engine.max_rpm` accepted; keeps degrees-per-µs inside UQ1.15.
pub const MAX_SUPPORTED_RPM: u16 = 30_000;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Pattern {
    #[default]
    MissingTooth,
    DualWheel,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Speed {
    #[default]
    Crank,
    Cam,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FilterLevel {
    Off,
    #[default]
    Light,
    Medium,
    Aggressive,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EdgePolarity {
    #[default]
    Rising,
    Falling,
    Both,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SecondaryPattern {
    #[default]
    Single,
    /// 4 evenly spaced teeth with one missing.
    FourMinusOne,
    /// Cam level sampled at tooth #1 instead of counting cam edges.
    Poll,
    /// Toyota VVT-i style: 1 tooth in the first revolution, 2 in the second.
    Toyota3,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SparkMode {
    #[default]
    Wasted,
    Single,
    Sequential,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum VvtMode {
    #[default]
    OpenLoop,
    ClosedLoop,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToothLog {
    #[default]
    Off,
    /// Primary gaps only.
    Tooth,
    /// Every input, with level/sync classification bits.
    Composite,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Wheel {
    pub pattern: Pattern,
    /// Tooth slots per pattern cycle, including the missing ones.
    pub teeth: u16,
    pub missing_teeth: u8,
    pub speed: Speed,
    /// Crank angle ATDC of tooth #1 (degrees).
    pub angle: i16,
    pub filter: FilterLevel,
    /// Gap multiple (percent of the previous gap) that marks a single missing tooth.
    pub gap_ratio_percent: u16,
    pub edge: EdgePolarity,
}

impl Default for Wheel {
    fn default() -> Self {
        Self {
            pattern: Pattern::MissingTooth,
            teeth: 36,
            missing_teeth: 1,
            speed: Speed::Crank,
            angle: 0,
            filter: FilterLevel::Light,
            gap_ratio_percent: 150,
            edge: EdgePolarity::Rising,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Secondary {
    pub pattern: SecondaryPattern,
    /// Whether the secondary wheel turns at crank or cam speed.
    pub speed: Speed,
    pub edge: EdgePolarity,
    pub tertiary_edge: EdgePolarity,
    /// Cam level that marks the first revolution for the polled pattern.
    pub poll_level_high: bool,
}

impl Default for Secondary {
    fn default() -> Self {
        Self {
            pattern: SecondaryPattern::Single,
            speed: Speed::Cam,
            edge: EdgePolarity::Rising,
            tertiary_edge: EdgePolarity::Rising,
            poll_level_high: true,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Engine {
    /// Any computed RPM at or above this is rejected.
    pub max_rpm: u16,
    /// Below this the engine is considered cranking.
    pub crank_rpm: u16,
    /// Start revolutions before per-tooth cranking RPM is trusted.
    pub stg_cycles: u8,
    /// 2 or 4.
    pub strokes: u8,
    pub spark_mode: SparkMode,
    pub inj_sequential: bool,
    pub per_tooth_ignition: bool,
    /// Snap the tooth count back to the expected value on a secondary mismatch.
    pub use_resync: bool,
    pub ignition_channels: u8,
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            max_rpm: 18_000,
            crank_rpm: 400,
            stg_cycles: 4,
            strokes: 4,
            spark_mode: SparkMode::Wasted,
            inj_sequential: false,
            per_tooth_ignition: true,
            use_resync: false,
            ignition_channels: 4,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Vvt {
    pub enabled: bool,
    pub mode: VvtMode,
    /// Smoothing weight of the previous angle, 0 (none) ..= 255.
    pub angle_filter: u8,
    /// Closed-loop cam angle at 0 % duty (VVT1).
    pub cl0_duty_angle: i16,
    /// Closed-loop cam angle at 0 % duty (VVT2).
    pub vvt2_cl0_duty_angle: i16,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
    pub tooth_log: ToothLog,
}

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub wheel: Wheel,
    #[serde(default)]
    pub secondary: Secondary,
    #[serde(default)]
    pub engine: Engine,
    #[serde(default)]
    pub vvt: Vvt,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Wheel {
    /// Degrees covered by one pattern cycle.
    pub fn cycle_degrees(&self) -> u16 {
        match self.speed {
            Speed::Crank => 360,
            Speed::Cam => 720,
        }
    }
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Wheel
        let w = &self.wheel;
        if w.teeth == 0 {
            eyre::bail!("wheel.teeth must be > 0");
        }
        let cycle = w.cycle_degrees();
        if cycle % w.teeth != 0 {
            eyre::bail!(
                "wheel.teeth must divide the {cycle}° cycle evenly (got {})",
                w.teeth
            );
        }
        if u16::from(w.missing_teeth) >= w.teeth {
            eyre::bail!("wheel.missing_teeth must be < wheel.teeth");
        }
        match w.pattern {
            Pattern::MissingTooth => {
                if w.missing_teeth == 0 {
                    eyre::bail!("wheel.missing_teeth must be >= 1 for the missing_tooth pattern");
                }
                if w.teeth < 4 {
                    eyre::bail!("wheel.teeth must be >= 4 for the missing_tooth pattern");
                }
            }
            Pattern::DualWheel => {
                if w.missing_teeth != 0 {
                    eyre::bail!("wheel.missing_teeth must be 0 for the dual_wheel pattern");
                }
            }
        }
        if !(-360..=360).contains(&w.angle) {
            eyre::bail!("wheel.angle must be in [-360, 360]");
        }
        if !(101..=400).contains(&w.gap_ratio_percent) {
            eyre::bail!("wheel.gap_ratio_percent must be in [101, 400]");
        }

        // Engine
        let e = &self.engine;
        if e.crank_rpm < MIN_RPM {
            eyre::bail!("engine.crank_rpm must be >= {MIN_RPM}");
        }
        if e.max_rpm <= e.crank_rpm {
            eyre::bail!("engine.max_rpm must be > engine.crank_rpm");
        }
        if e.max_rpm > MAX_SUPPORTED_RPM {
            eyre::bail!("engine.max_rpm must be <= {MAX_SUPPORTED_RPM}");
        }
        if e.max_rpm / 60 == 0 {
            eyre::bail!("engine.max_rpm is too low to derive a trigger filter");
        }
        if e.strokes != 2 && e.strokes != 4 {
            eyre::bail!("engine.strokes must be 2 or 4");
        }
        if !(1..=8).contains(&e.ignition_channels) {
            eyre::bail!("engine.ignition_channels must be in [1, 8]");
        }
        if e.spark_mode == SparkMode::Sequential && e.strokes == 2 {
            eyre::bail!("engine.spark_mode = sequential requires a four-stroke engine");
        }

        // VVT
        if self.vvt.mode == VvtMode::ClosedLoop && !self.vvt.enabled {
            eyre::bail!("vvt.mode = closed_loop requires vvt.enabled = true");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref() {
            if !matches!(rot, "never" | "daily" | "hourly") {
                eyre::bail!("logging.rotation must be one of never|daily|hourly");
            }
        }

        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TraceInput {
    Primary,
    Secondary,
    Tertiary,
}

/// Edge-trace CSV schema.
///
/// Expected headers:
/// input,time_us
///
/// Example:
/// input,time_us
/// primary,1000
/// secondary,1450
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct EdgeTraceRow {
    pub input: TraceInput,
    pub time_us: u32,
}

pub fn load_edge_trace_csv(path: &std::path::Path) -> eyre::Result<Vec<EdgeTraceRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open edge trace CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["input", "time_us"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "edge trace CSV must have headers 'input,time_us', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<EdgeTraceRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }

    if !rows.iter().any(|r| r.input == TraceInput::Primary) {
        eyre::bail!("edge trace has no primary edges");
    }
    Ok(rows)
}
