//! Type-state builder for `Trigger` and generic `build_trigger` constructor.
//!
//! The builder enforces at compile time that a wheel pattern is provided
//! before `build()` is available. `try_build()` is always available for
//! dynamic checks.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::Arc;

use critical_section::Mutex;
use trigger_traits::clock::{Clock, MonotonicClock};
use trigger_traits::{OutputScheduler, ToothLogger, TriggerInputs};

use crate::config::{
    DecoderCfg, EngineCfg, ToothLogMode, TriggerSpeed, VvtCfg, WheelPattern, WheelPatternCfg,
};
use crate::decoder::Decoder;
use crate::end_tooth::MAX_IGNITION_CHANNELS;
use crate::error::{BuildError, Result};
use crate::logger::ToothLogBuffer;
use crate::mocks::{FixedInputs, NullLogger, NullScheduler};
use crate::state::Shared;
use crate::trigger::TriggerCore;
use crate::util::{MAX_SUPPORTED_RPM, MIN_RPM};

/// Output scheduler as stored by the dynamic [`Trigger`].
pub type BoxedScheduler = Box<dyn OutputScheduler + Send>;
/// Tooth logger as stored by the dynamic [`Trigger`].
pub type BoxedLogger = Box<dyn ToothLogger + Send>;

/// Input level source shared with the interrupt path.
pub type BoxedInputs = Box<dyn TriggerInputs + Send + Sync>;

/// Dynamic (boxed) decoder; the type most hosts use.
pub type Trigger = TriggerCore<BoxedScheduler, BoxedLogger>;

/// Generic, statically-dispatched alias using the same core.
pub type TriggerG<O, L> = TriggerCore<O, L>;

impl Trigger {
    /// Start building a Trigger.
    pub fn builder() -> TriggerBuilder<Missing> {
        TriggerBuilder::default()
    }
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `Trigger`. Everything is validated on `build()`.
pub struct TriggerBuilder<W> {
    wheel: Option<WheelPatternCfg>,
    engine: Option<EngineCfg>,
    vvt: Option<VvtCfg>,
    tooth_log: Option<ToothLogMode>,
    outputs: Option<BoxedScheduler>,
    logger: Option<BoxedLogger>,
    inputs: Option<BoxedInputs>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    _w: PhantomData<W>,
}

impl Default for TriggerBuilder<Missing> {
    fn default() -> Self {
        Self {
            wheel: None,
            engine: None,
            vvt: None,
            tooth_log: None,
            outputs: None,
            logger: None,
            inputs: None,
            clock: None,
            _w: PhantomData,
        }
    }
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

/// Reject configurations the decoders cannot run with.
///
/// The TOML layer validates too; this guards callers that build
/// `DecoderCfg` by hand.
pub fn validate(cfg: &DecoderCfg) -> Result<()> {
    let w = &cfg.wheel;
    let e = &cfg.engine;
    if w.teeth_total == 0 {
        return Err(invalid("teeth_total must be > 0"));
    }
    if w.trigger_speed.cycle_degrees() % w.teeth_total != 0 {
        return Err(invalid("teeth_total must divide the pattern cycle evenly"));
    }
    match w.pattern {
        WheelPattern::MissingTooth => {
            if w.missing_teeth == 0 {
                return Err(invalid("missing_teeth must be >= 1 for a missing-tooth wheel"));
            }
            if u16::from(w.missing_teeth) >= w.teeth_total {
                return Err(invalid("missing_teeth must be < teeth_total"));
            }
            if w.missing_teeth == 1 && w.gap_ratio_percent <= 100 {
                return Err(invalid("gap_ratio_percent must be > 100"));
            }
        }
        WheelPattern::DualWheel => {
            if w.missing_teeth != 0 {
                return Err(invalid("a dual wheel has no missing teeth"));
            }
        }
    }
    if u32::from(e.crank_rpm) < MIN_RPM {
        return Err(invalid("crank_rpm must be >= 50"));
    }
    if e.max_rpm <= e.crank_rpm {
        return Err(invalid("max_rpm must be above crank_rpm"));
    }
    if e.max_rpm > MAX_SUPPORTED_RPM {
        return Err(invalid("max_rpm must be <= 30000"));
    }
    if e.ignition_channels == 0 || usize::from(e.ignition_channels) > MAX_IGNITION_CHANNELS {
        return Err(invalid("ignition_channels must be in 1..=8"));
    }
    Ok(())
}

/// Validate configuration and construct a `TriggerCore` in the unsynchronized state.
///
/// Single source of truth for both `TriggerBuilder::try_build()` and `build_trigger()`.
fn validate_and_build<O: OutputScheduler, L: ToothLogger>(
    cfg: DecoderCfg,
    outputs: O,
    logger: L,
    inputs: Option<BoxedInputs>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
) -> Result<TriggerCore<O, L>> {
    validate(&cfg)?;

    let decoder = Decoder::new(&cfg);
    let mut shared = Shared::default();
    decoder.setup(&mut shared.state);

    let clock: Arc<dyn Clock + Send + Sync> = match clock {
        Some(b) => Arc::from(b),
        None => Arc::new(MonotonicClock::new()),
    };
    // Without a level source every input reads high, so rising and both-edge
    // inputs qualify.
    let inputs = inputs
        .unwrap_or_else(|| Box::new(FixedInputs::all(true)) as BoxedInputs);

    let g = decoder.geometry();
    tracing::debug!(
        pattern = ?cfg.wheel.pattern,
        teeth = cfg.wheel.teeth_total,
        tooth_angle = g.tooth_angle,
        max_stall_us = g.max_stall_time,
        "trigger decoder built"
    );

    Ok(TriggerCore {
        cfg,
        decoder,
        shared: Mutex::new(RefCell::new(shared)),
        outputs: Mutex::new(RefCell::new(outputs)),
        logger: Mutex::new(RefCell::new(logger)),
        inputs,
        clock,
    })
}

impl<W> TriggerBuilder<W> {
    /// Fallible build available in any type-state; returns a typed error for missing pieces.
    pub fn try_build(self) -> Result<Trigger> {
        let wheel = self
            .wheel
            .ok_or_else(|| eyre::Report::new(BuildError::MissingWheel))?;
        let tooth_log = self.tooth_log.unwrap_or_default();
        let cfg = DecoderCfg {
            wheel,
            engine: self.engine.unwrap_or_default(),
            vvt: self.vvt.unwrap_or_default(),
            tooth_log,
        };
        let outputs = self
            .outputs
            .unwrap_or_else(|| Box::new(NullScheduler) as BoxedScheduler);
        let logger = self.logger.unwrap_or_else(|| match tooth_log {
            ToothLogMode::Off => Box::new(NullLogger) as BoxedLogger,
            ToothLogMode::Tooth | ToothLogMode::Composite => {
                Box::new(ToothLogBuffer::default()) as BoxedLogger
            }
        });
        validate_and_build(cfg, outputs, logger, self.inputs, self.clock)
    }

    pub fn with_engine(mut self, engine: EngineCfg) -> Self {
        self.engine = Some(engine);
        self
    }
    pub fn with_vvt(mut self, vvt: VvtCfg) -> Self {
        self.vvt = Some(vvt);
        self
    }
    pub fn with_tooth_log(mut self, mode: ToothLogMode) -> Self {
        self.tooth_log = Some(mode);
        self
    }
    pub fn with_outputs(mut self, outputs: impl OutputScheduler + Send + 'static) -> Self {
        self.outputs = Some(Box::new(outputs));
        self
    }
    pub fn with_logger(mut self, logger: impl ToothLogger + Send + 'static) -> Self {
        self.logger = Some(Box::new(logger));
        self
    }
    /// Level source for the polarity gate and the polled cam.
    pub fn with_inputs(mut self, inputs: impl TriggerInputs + Send + Sync + 'static) -> Self {
        self.inputs = Some(Box::new(inputs));
        self
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Take wheel, engine, VVT and logging settings from a loaded config file.
    pub fn apply_config(self, cfg: &trigger_config::Config) -> TriggerBuilder<Set> {
        let DecoderCfg {
            wheel,
            engine,
            vvt,
            tooth_log,
        } = DecoderCfg::from(cfg);
        TriggerBuilder {
            wheel: Some(wheel),
            engine: Some(engine),
            vvt: Some(vvt),
            tooth_log: Some(tooth_log),
            outputs: self.outputs,
            logger: self.logger,
            inputs: self.inputs,
            clock: self.clock,
            _w: PhantomData,
        }
    }
}

// Setters that advance type-state
impl TriggerBuilder<Missing> {
    pub fn with_wheel(self, wheel: WheelPatternCfg) -> TriggerBuilder<Set> {
        TriggerBuilder {
            wheel: Some(wheel),
            engine: self.engine,
            vvt: self.vvt,
            tooth_log: self.tooth_log,
            outputs: self.outputs,
            logger: self.logger,
            inputs: self.inputs,
            clock: self.clock,
            _w: PhantomData,
        }
    }

    /// Shorthand for an evenly spaced crank wheel with `missing` teeth removed.
    pub fn with_missing_tooth(self, teeth_total: u16, missing: u8) -> TriggerBuilder<Set> {
        self.with_wheel(WheelPatternCfg {
            pattern: WheelPattern::MissingTooth,
            teeth_total,
            missing_teeth: missing,
            ..WheelPatternCfg::default()
        })
    }

    /// Shorthand for a dual wheel whose primary turns at `speed`.
    pub fn with_dual_wheel(self, teeth_total: u16, speed: TriggerSpeed) -> TriggerBuilder<Set> {
        self.with_wheel(WheelPatternCfg {
            pattern: WheelPattern::DualWheel,
            teeth_total,
            missing_teeth: 0,
            trigger_speed: speed,
            ..WheelPatternCfg::default()
        })
    }
}

impl TriggerBuilder<Set> {
    /// Validate and build. Only available once the wheel is set.
    pub fn build(self) -> Result<Trigger> {
        self.try_build()
    }
}

/// Build a generic, statically-dispatched `TriggerG` from concrete collaborators.
///
/// Delegates to the shared `validate_and_build`.
pub fn build_trigger<O, L>(
    cfg: DecoderCfg,
    outputs: O,
    logger: L,
    inputs: Option<BoxedInputs>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
) -> Result<TriggerG<O, L>>
where
    O: OutputScheduler + 'static,
    L: ToothLogger + 'static,
{
    validate_and_build(cfg, outputs, logger, inputs, clock)
}
