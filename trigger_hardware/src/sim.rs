//! Simulated trigger wheels.
//!
//! Produces the edge train a crank/cam sensor pair would deliver at a
//! constant engine speed, optionally with short noise pulses, so the decoder
//! can run without an engine attached.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use trigger_traits::{Edge, TriggerInput, TriggerInputs};

use crate::error::{HwError, Result};

const MICROS_PER_MIN: u64 = 60_000_000;
const MIN_SIM_RPM: u32 = 50;
const MAX_SIM_RPM: u32 = 30_000;

/// Physical layout of the simulated primary wheel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelShape {
    /// Crank-speed wheel with `missing` slots removed before tooth #1.
    MissingTooth { teeth: u16, missing: u8 },
    /// Even primary wheel confirmed by one cam pulse per 720°.
    DualWheel { teeth: u16, cam_speed: bool },
}

impl WheelShape {
    fn teeth(self) -> u16 {
        match self {
            Self::MissingTooth { teeth, .. } | Self::DualWheel { teeth, .. } => teeth,
        }
    }

    fn missing(self) -> u16 {
        match self {
            Self::MissingTooth { missing, .. } => u16::from(missing),
            Self::DualWheel { .. } => 0,
        }
    }

    /// Tooth slots per 720°.
    fn slots_per_cycle(self) -> u64 {
        match self {
            Self::DualWheel {
                teeth,
                cam_speed: true,
            } => u64::from(teeth),
            _ => 2 * u64::from(self.teeth()),
        }
    }
}

/// Constant-speed edge generator.
///
/// Missing-tooth wheels start on tooth #1. Dual wheels start on the cam
/// pulse, with primary tooth #1 half a slot later; every later cam pulse
/// sits halfway between the last tooth and tooth #1.
#[derive(Debug, Clone)]
pub struct SimulatedWheel {
    shape: WheelShape,
    rpm: u32,
    start_us: u32,
    noise_every: Option<u32>,
    cam: bool,
}

impl SimulatedWheel {
    pub fn new(shape: WheelShape) -> Self {
        Self {
            shape,
            rpm: 1_000,
            start_us: 1_000,
            noise_every: None,
            cam: matches!(shape, WheelShape::DualWheel { .. }),
        }
    }

    pub fn missing_tooth(teeth: u16, missing: u8) -> Self {
        Self::new(WheelShape::MissingTooth { teeth, missing })
    }

    pub fn dual_wheel(teeth: u16, cam_speed: bool) -> Self {
        Self::new(WheelShape::DualWheel { teeth, cam_speed })
    }

    pub fn with_rpm(mut self, rpm: u32) -> Self {
        self.rpm = rpm;
        self
    }

    /// Timestamp of the first edge. Must be non-zero; the decoder reads 0 as "never".
    pub fn with_start(mut self, start_us: u32) -> Self {
        self.start_us = start_us;
        self
    }

    /// Follow every `n`th primary tooth with a glitch 5 % of a slot later.
    /// `0` disables noise.
    pub fn with_noise_every(mut self, n: u32) -> Self {
        self.noise_every = (n > 0).then_some(n);
        self
    }

    /// Add one cam pulse per 720° to a missing-tooth wheel. Dual wheels
    /// always have it.
    pub fn with_cam(mut self, on: bool) -> Self {
        self.cam = on || matches!(self.shape, WheelShape::DualWheel { .. });
        self
    }

    pub fn shape(&self) -> WheelShape {
        self.shape
    }

    pub fn rpm(&self) -> u32 {
        self.rpm
    }

    pub fn validate(&self) -> Result<()> {
        if !(MIN_SIM_RPM..=MAX_SIM_RPM).contains(&self.rpm) {
            return Err(HwError::InvalidSim("rpm must be in 50..=30000"));
        }
        if self.start_us == 0 {
            return Err(HwError::InvalidSim("start time must be non-zero"));
        }
        let teeth = self.shape.teeth();
        if teeth == 0 {
            return Err(HwError::InvalidSim("wheel needs at least one tooth"));
        }
        if let WheelShape::MissingTooth { missing, .. } = self.shape
            && (missing == 0 || u16::from(missing) >= teeth)
        {
            return Err(HwError::InvalidSim("missing teeth must be in 1..teeth"));
        }
        Ok(())
    }

    /// Microseconds per crank revolution.
    pub fn revolution_us(&self) -> u32 {
        u32::try_from(MICROS_PER_MIN / u64::from(self.rpm.max(1))).unwrap_or(u32::MAX)
    }

    /// Offset of tooth slot `slot` from the start, computed from the slot
    /// index so rounding never accumulates.
    fn slot_offset(&self, slot: u64) -> u32 {
        let per_cycle = u64::from(self.rpm.max(1)) * self.shape.slots_per_cycle();
        u32::try_from(slot * 2 * MICROS_PER_MIN / per_cycle).unwrap_or(u32::MAX)
    }

    /// All edges for `revs` crank revolutions, in time order.
    pub fn edges(&self, revs: u32) -> Result<Vec<Edge>> {
        self.validate()?;
        let per_cycle = self.shape.slots_per_cycle();
        let teeth = u64::from(self.shape.teeth());
        let actual = teeth - u64::from(self.shape.missing());
        let total_slots = per_cycle * u64::from(revs) / 2;

        let slot_us = self.slot_offset(1);
        let half_slot = slot_us / 2;
        let glitch = (slot_us / 20).max(1);
        let dual = matches!(self.shape, WheelShape::DualWheel { .. });
        let lead = if dual { half_slot } else { 0 };

        let mut out = Vec::with_capacity(usize::try_from(total_slots).unwrap_or(0));
        let mut emitted = 0u32;
        for slot in 0..total_slots {
            let pos = slot % teeth;
            if pos >= actual {
                continue;
            }
            let t = self
                .start_us
                .wrapping_add(self.slot_offset(slot))
                .wrapping_add(lead);
            out.push(Edge::new(TriggerInput::Primary, t));
            emitted += 1;
            // The decoder's filter is open right after the gap.
            if let Some(n) = self.noise_every
                && emitted % n == 0
                && pos != 0
            {
                out.push(Edge::new(TriggerInput::Primary, t.wrapping_add(glitch)));
            }
        }

        if self.cam {
            for c in 0..u64::from(revs).div_ceil(2) {
                let base = self.start_us.wrapping_add(self.slot_offset(c * per_cycle));
                let t = if dual {
                    base
                } else {
                    base.wrapping_add(half_slot)
                };
                out.push(Edge::new(TriggerInput::Secondary, t));
            }
        }

        let start = self.start_us;
        out.sort_by_key(|e| e.time_us.wrapping_sub(start));
        tracing::debug!(
            shape = ?self.shape,
            rpm = self.rpm,
            revs,
            edges = out.len(),
            "simulated edge train"
        );
        Ok(out)
    }
}

/// Input levels as the simulated sensors leave them. Every input idles
/// high, so rising-edge inputs qualify. Clones share the same levels.
#[derive(Debug, Clone)]
pub struct SimulatedInputs {
    levels: Arc<[AtomicBool; 3]>,
}

impl Default for SimulatedInputs {
    fn default() -> Self {
        Self {
            levels: Arc::new([
                AtomicBool::new(true),
                AtomicBool::new(true),
                AtomicBool::new(true),
            ]),
        }
    }
}

impl SimulatedInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, input: TriggerInput, high: bool) {
        self.levels[slot(input)].store(high, Ordering::Release);
    }
}

impl TriggerInputs for SimulatedInputs {
    fn is_high(&self, input: TriggerInput) -> bool {
        self.levels[slot(input)].load(Ordering::Acquire)
    }
}

const fn slot(input: TriggerInput) -> usize {
    match input {
        TriggerInput::Primary => 0,
        TriggerInput::Secondary => 1,
        TriggerInput::Tertiary => 2,
    }
}
