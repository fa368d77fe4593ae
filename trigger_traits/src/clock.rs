use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

/// Monotonic microsecond clock shared by the edge handlers and the main loop.
///
/// - micros(): free-running 32-bit counter that wraps after ~71.6 minutes
/// - elapsed_since(): wraparound-safe difference to an earlier reading
pub trait Clock {
    fn micros(&self) -> u32;

    /// Microseconds elapsed since `earlier`, using unsigned wraparound subtraction.
    fn elapsed_since(&self, earlier: u32) -> u32 {
        self.micros().wrapping_sub(earlier)
    }
}

/// Default, real-time clock backed by std::time::Instant.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn micros(&self) -> u32 {
        // Truncation is the wraparound of the hardware counter this models.
        self.origin.elapsed().as_micros() as u32
    }
}

/// Deterministic clock whose time is set or advanced manually.
///
/// Clones share the same counter, so a simulator can hold one handle and
/// the decoder another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU32>,
}

impl ManualClock {
    pub fn new(start_us: u32) -> Self {
        Self {
            now: Arc::new(AtomicU32::new(start_us)),
        }
    }

    /// Advance the clock by `us`, wrapping like the hardware counter.
    pub fn advance(&self, us: u32) {
        // fetch_add wraps on overflow
        self.now.fetch_add(us, Ordering::AcqRel);
    }

    /// Set the absolute counter value.
    pub fn set(&self, us: u32) {
        self.now.store(us, Ordering::Release);
    }
}

impl Clock for ManualClock {
    fn micros(&self) -> u32 {
        self.now.load(Ordering::Acquire)
    }
}
