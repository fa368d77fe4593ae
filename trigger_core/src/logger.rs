//! Diagnostic tooth and composite logging.

use std::sync::{Arc, Mutex, PoisonError};

use trigger_traits::{ToothLogEntry, ToothLogger, TriggerInput, TriggerInputs, composite};

use crate::config::ToothLogMode;

/// Default capacity of [`ToothLogBuffer`].
pub const TOOTH_LOG_SIZE: usize = 127;

/// Whether an interrupt on `input` produces a log entry.
///
/// - Tooth log: primary only, and only for edges the decoder accepted.
/// - Composite log: every interrupt on every input, qualifying or not.
#[inline]
pub fn should_log(
    mode: ToothLogMode,
    input: TriggerInput,
    polarity_ok: bool,
    valid_trigger: bool,
) -> bool {
    match mode {
        ToothLogMode::Off => false,
        ToothLogMode::Tooth => input == TriggerInput::Primary && polarity_ok && valid_trigger,
        ToothLogMode::Composite => true,
    }
}

/// Classification bits for a composite log entry.
pub fn composite_flags(
    input: TriggerInput,
    inputs: &dyn TriggerInputs,
    has_sync: bool,
    revolution_one: bool,
) -> u8 {
    let mut flags = 0;
    if inputs.is_high(TriggerInput::Primary) {
        flags |= composite::PRIMARY_LEVEL;
    }
    if inputs.is_high(TriggerInput::Secondary) {
        flags |= composite::SECONDARY_LEVEL;
    }
    if inputs.is_high(TriggerInput::Tertiary) {
        flags |= composite::TERTIARY_LEVEL;
    }
    if input != TriggerInput::Primary {
        flags |= composite::CAM_TRIGGER;
    }
    if has_sync {
        flags |= composite::SYNC;
    }
    if revolution_one {
        flags |= composite::ENGINE_CYCLE;
    }
    flags
}

/// Fixed-capacity log that stops accepting entries once full, until drained.
///
/// Storage is allocated up front so logging from an edge handler never allocates.
#[derive(Debug, Clone)]
pub struct ToothLogBuffer {
    entries: Vec<ToothLogEntry>,
    capacity: usize,
}

impl Default for ToothLogBuffer {
    fn default() -> Self {
        Self::new(TOOTH_LOG_SIZE)
    }
}

impl ToothLogBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Buffer is full and waiting to be drained.
    pub fn is_ready(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ToothLogEntry] {
        &self.entries
    }

    /// Take the collected entries and re-arm the buffer.
    pub fn drain(&mut self) -> Vec<ToothLogEntry> {
        std::mem::replace(&mut self.entries, Vec::with_capacity(self.capacity))
    }
}

impl ToothLogger for ToothLogBuffer {
    fn log(&mut self, entry: ToothLogEntry) {
        if !self.is_ready() {
            self.entries.push(entry);
        }
    }
}

/// Cloneable handle to a [`ToothLogBuffer`], so the host can drain a log the
/// decoder owns.
///
/// The edge path only ever `try_lock`s: an entry that arrives while the host
/// is draining is dropped rather than waited for.
#[derive(Debug, Clone, Default)]
pub struct SharedToothLog {
    inner: Arc<Mutex<ToothLogBuffer>>,
}

impl SharedToothLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ToothLogBuffer::new(capacity))),
        }
    }

    /// Take the collected entries and re-arm the buffer.
    pub fn drain(&self) -> Vec<ToothLogEntry> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ToothLogger for SharedToothLog {
    fn log(&mut self, entry: ToothLogEntry) {
        if let Ok(mut buf) = self.inner.try_lock() {
            buf.log(entry);
        }
    }
}
