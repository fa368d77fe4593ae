//! The decoder instance (`TriggerCore`): one wheel-pattern decoder, its state
//! behind a critical section, and the collaborators it talks to.
//!
//! Edge handlers and main-context queries each take exactly one critical
//! section. Angle queries copy the few fields they need and compute outside
//! it; everything else is short enough to run inside.

use std::cell::RefCell;
use std::sync::Arc;

use critical_section::Mutex;
use trigger_traits::clock::Clock;
use trigger_traits::{
    Edge, OutputScheduler, ToothLogEntry, ToothLogger, TriggerInput, TriggerInputs,
};

use crate::config::{DecoderCfg, EdgePolarity, ToothLogMode};
use crate::decoder::{AngleSnapshot, Decoder, EdgeCtx, Geometry};
use crate::end_tooth::{EndTooth, IgnitionEndTable};
use crate::error::DecoderError;
use crate::logger::{composite_flags, should_log};
use crate::state::{DecoderSnapshot, Shared};
use crate::status::{EdgeOutcome, SyncState};

/// Decoder plus collaborators, generic over the output scheduler and logger.
pub struct TriggerCore<O: OutputScheduler, L: ToothLogger> {
    pub(crate) cfg: DecoderCfg,
    pub(crate) decoder: Decoder,
    pub(crate) shared: Mutex<RefCell<Shared>>,
    pub(crate) outputs: Mutex<RefCell<O>>,
    pub(crate) logger: Mutex<RefCell<L>>,
    pub(crate) inputs: Box<dyn TriggerInputs + Send + Sync>,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
}

impl<O: OutputScheduler, L: ToothLogger> core::fmt::Debug for TriggerCore<O, L> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let snap = self.snapshot();
        f.debug_struct("TriggerCore")
            .field("pattern", &self.cfg.wheel.pattern)
            .field("tooth", &snap.tooth_current_count)
            .field("sync", &SyncState::from_flags(snap.has_sync, snap.half_sync))
            .field("rpm", &snap.rpm)
            .finish()
    }
}

impl<O: OutputScheduler, L: ToothLogger> TriggerCore<O, L> {
    // ── Edge entry points (interrupt context) ────────────────────────────────

    /// Primary input interrupt at time `now` (µs).
    pub fn primary_edge(&self, now: u32) -> EdgeOutcome {
        self.interrupt(TriggerInput::Primary, now)
    }

    pub fn secondary_edge(&self, now: u32) -> EdgeOutcome {
        self.interrupt(TriggerInput::Secondary, now)
    }

    pub fn tertiary_edge(&self, now: u32) -> EdgeOutcome {
        self.interrupt(TriggerInput::Tertiary, now)
    }

    /// Primary interrupt stamped with the decoder's own clock.
    pub fn primary_interrupt(&self) -> EdgeOutcome {
        self.interrupt(TriggerInput::Primary, self.clock.micros())
    }

    pub fn secondary_interrupt(&self) -> EdgeOutcome {
        self.interrupt(TriggerInput::Secondary, self.clock.micros())
    }

    pub fn tertiary_interrupt(&self) -> EdgeOutcome {
        self.interrupt(TriggerInput::Tertiary, self.clock.micros())
    }

    /// Route a captured edge to its handler. A level captured with the edge
    /// takes precedence over the live input level.
    pub fn dispatch(&self, edge: Edge) -> EdgeOutcome {
        let level_high = edge.level.unwrap_or_else(|| self.inputs.is_high(edge.input));
        self.interrupt_at_level(edge.input, edge.time_us, level_high)
    }

    /// Full interrupt path: polarity gate, decoder handler, diagnostic log.
    ///
    /// An edge of the wrong polarity never reaches the decoder but is still
    /// visible to the composite log.
    pub fn interrupt(&self, input: TriggerInput, now: u32) -> EdgeOutcome {
        self.interrupt_at_level(input, now, self.inputs.is_high(input))
    }

    /// `interrupt` with the input level already sampled by the caller.
    pub fn interrupt_at_level(
        &self,
        input: TriggerInput,
        now: u32,
        level_high: bool,
    ) -> EdgeOutcome {
        let polarity_ok = self.polarity(input).accepts(level_high);
        critical_section::with(|cs| {
            let mut shared = self.shared.borrow_ref_mut(cs);
            let last = match input {
                TriggerInput::Primary => shared.state.last_tooth_time,
                TriggerInput::Secondary => shared.state.secondary.last_tooth_time,
                TriggerInput::Tertiary => shared.state.tertiary.last_tooth_time,
            };
            let gap = if last == 0 { 0 } else { now.wrapping_sub(last) };
            if input == TriggerInput::Primary {
                shared.state.valid_trigger = false;
            }

            let outcome = if polarity_ok {
                let mut outputs = self.outputs.borrow_ref_mut(cs);
                let mut cx = EdgeCtx {
                    now,
                    cfg: &self.cfg,
                    shared: &mut *shared,
                    inputs: &*self.inputs,
                    outputs: &mut *outputs,
                };
                match input {
                    TriggerInput::Primary => self.decoder.primary_edge(&mut cx),
                    TriggerInput::Secondary => self.decoder.secondary_edge(&mut cx),
                    TriggerInput::Tertiary => self.decoder.tertiary_edge(&mut cx),
                }
            } else {
                EdgeOutcome::Ignored
            };

            let mode = self.cfg.tooth_log;
            if should_log(mode, input, polarity_ok, shared.state.valid_trigger) {
                let flags = if mode == ToothLogMode::Composite {
                    composite_flags(
                        input,
                        &*self.inputs,
                        shared.state.has_sync,
                        shared.state.revolution_one,
                    )
                } else {
                    0
                };
                self.logger.borrow_ref_mut(cs).log(ToothLogEntry {
                    input,
                    time_us: now,
                    gap_us: gap,
                    flags,
                });
            }
            outcome
        })
    }

    fn polarity(&self, input: TriggerInput) -> EdgePolarity {
        let w = &self.cfg.wheel;
        match input {
            TriggerInput::Primary => w.primary_edge,
            TriggerInput::Secondary => w.secondary_edge,
            TriggerInput::Tertiary => w.tertiary_edge,
        }
    }

    // ── Main-context queries ─────────────────────────────────────────────────

    /// Current RPM; also stored as the engine status RPM.
    pub fn rpm(&self) -> u16 {
        critical_section::with(|cs| {
            let mut shared = self.shared.borrow_ref_mut(cs);
            let rpm = self.decoder.rpm(&self.cfg, &mut shared);
            shared.status.rpm = rpm;
            rpm
        })
    }

    /// Crank angle in `[0, 720)` at the decoder clock's current time.
    pub fn crank_angle(&self) -> i16 {
        let snap = self.angle_snapshot();
        // Read after the snapshot so `now` is never behind the last tooth.
        let now = self.clock.micros();
        self.decoder.crank_angle(&self.cfg, &snap, now)
    }

    /// Crank angle at an explicit time.
    pub fn crank_angle_at(&self, now: u32) -> i16 {
        let snap = self.angle_snapshot();
        self.decoder.crank_angle(&self.cfg, &snap, now)
    }

    fn angle_snapshot(&self) -> AngleSnapshot {
        critical_section::with(|cs| AngleSnapshot::of(&self.shared.borrow_ref(cs)))
    }

    /// Recompute the end-tooth table from one end angle per ignition channel.
    ///
    /// Channel `n` takes `end_angles[n - 1]`.
    pub fn set_end_teeth(&self, end_angles: &[i16]) -> Result<(), DecoderError> {
        let channels = self.cfg.engine.ignition_channels;
        if end_angles.len() > usize::from(channels) {
            return Err(DecoderError::TooManyEndAngles {
                given: end_angles.len(),
                channels,
            });
        }
        let mut entries = [EndTooth::default(); crate::end_tooth::MAX_IGNITION_CHANNELS];
        for (slot, &end_angle) in entries.iter_mut().zip(end_angles) {
            *slot = EndTooth {
                end_angle,
                end_tooth: self.decoder.end_tooth(&self.cfg, end_angle),
            };
        }
        let entries = &entries[..end_angles.len()];
        critical_section::with(|cs| self.shared.borrow_ref_mut(cs).end_table.set(entries));
        Ok(())
    }

    /// End tooth of a 1-based ignition channel.
    pub fn end_tooth(&self, channel: u8) -> Result<u16, DecoderError> {
        let table = self.end_teeth();
        table
            .get(channel)
            .map(|e| e.end_tooth)
            .ok_or(DecoderError::ChannelOutOfRange(channel, table.channels()))
    }

    pub fn end_teeth(&self) -> IgnitionEndTable {
        critical_section::with(|cs| self.shared.borrow_ref(cs).end_table.clone())
    }

    /// Declare the engine stopped when no primary tooth arrived within the
    /// pattern's stall time. Returns `true` when it did so.
    ///
    /// A `now` behind the last tooth (an edge handled after `now` was read)
    /// is never a stall.
    pub fn check_stall(&self, now: u32) -> bool {
        self.stall_check(|| now)
    }

    /// `check_stall` at the decoder clock's current time, read inside the
    /// critical section so no edge can land between the read and the check.
    pub fn check_stall_now(&self) -> bool {
        self.stall_check(|| self.clock.micros())
    }

    fn stall_check(&self, now: impl FnOnce() -> u32) -> bool {
        let max_stall = self.decoder.geometry().max_stall_time;
        let stalled = critical_section::with(|cs| {
            let mut shared = self.shared.borrow_ref_mut(cs);
            let last = shared.state.last_tooth_time;
            let gap = now().wrapping_sub(last);
            if last == 0 || gap <= max_stall || gap > u32::MAX / 2 {
                return false;
            }
            self.decoder.setup(&mut shared.state);
            shared.timing.reset();
            shared.status.rpm = 0;
            true
        });
        if stalled {
            tracing::debug!(max_stall_us = max_stall, "no primary tooth, engine stalled");
        }
        stalled
    }

    // ── Engine status set by the rest of the controller ──────────────────────

    /// Per-tooth refinement is suspended while cranking.
    pub fn set_cranking(&self, cranking: bool) {
        critical_section::with(|cs| self.shared.borrow_ref_mut(cs).status.cranking = cranking);
    }

    pub fn set_fixed_cranking_override(&self, on: bool) {
        critical_section::with(|cs| {
            self.shared.borrow_ref_mut(cs).status.fixed_cranking_override = on;
        });
    }

    // ── Reporting ─────────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> DecoderSnapshot {
        critical_section::with(|cs| self.shared.borrow_ref(cs).snapshot())
    }

    pub fn sync_state(&self) -> SyncState {
        let s = self.snapshot();
        SyncState::from_flags(s.has_sync, s.half_sync)
    }

    /// Run `f` with the output scheduler borrowed inside a critical section.
    pub fn with_outputs<R>(&self, f: impl FnOnce(&mut O) -> R) -> R {
        critical_section::with(|cs| f(&mut *self.outputs.borrow_ref_mut(cs)))
    }

    /// Run `f` with the tooth logger borrowed inside a critical section.
    pub fn with_logger<R>(&self, f: impl FnOnce(&mut L) -> R) -> R {
        critical_section::with(|cs| f(&mut *self.logger.borrow_ref_mut(cs)))
    }

    /// Back to unsynchronized, as after a stall. The end-tooth table is kept.
    pub fn reset(&self) {
        critical_section::with(|cs| {
            let mut shared = self.shared.borrow_ref_mut(cs);
            self.decoder.setup(&mut shared.state);
            shared.timing.reset();
            shared.status.rpm = 0;
        });
    }

    pub fn config(&self) -> &DecoderCfg {
        &self.cfg
    }

    pub fn geometry(&self) -> &Geometry {
        self.decoder.geometry()
    }
}
