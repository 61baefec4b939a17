//! Wall-clock sources for the scheduler.
//!
//! The scheduler needs two readings on the same millisecond scale: a
//! wall-clock sample that drives the event queue, and a higher-resolution
//! reading that the host driver feeds to `update` for frame pacing.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

/// A source of the current time, in milliseconds since the Unix epoch.
pub trait Clock {
    /// Whole milliseconds since the Unix epoch.
    fn wall_ms(&self) -> i64;

    /// Same scale as [`wall_ms`](Self::wall_ms), with sub-millisecond resolution.
    fn precise_ms(&self) -> f64 {
        self.wall_ms() as f64
    }
}

/// The system clock.
///
/// `precise_ms` is anchored to the wall clock once at creation and then
/// advanced by a TSC-backed monotonic counter, so it never jumps when the
/// system time is adjusted.
#[derive(Clone)]
pub struct SystemClock {
    anchor: minstant::Instant,
    anchor_ms: f64,
}

impl SystemClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            anchor: minstant::Instant::now(),
            anchor_ms: system_ms() as f64,
        }
    }
}

impl fmt::Debug for SystemClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemClock")
            .field("anchor_ms", &self.anchor_ms)
            .finish_non_exhaustive()
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn wall_ms(&self) -> i64 {
        system_ms()
    }

    fn precise_ms(&self) -> f64 {
        self.anchor_ms + self.anchor.elapsed().as_secs_f64() * 1000.0
    }
}

fn system_ms() -> i64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => i64::try_from(d.as_millis()).unwrap_or(i64::MAX),
        // Clock set before 1970.
        Err(e) => i64::try_from(e.duration().as_millis()).map_or(i64::MIN, |ms| -ms),
    }
}

/// A hand-driven clock for tests and simulations.
///
/// Clones share the same reading, so a test can keep one handle and move
/// time while the scheduler owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    #[must_use]
    pub fn new(start_ms: f64) -> Self {
        Self {
            now: Rc::new(Cell::new(start_ms)),
        }
    }

    pub fn set(&self, ms: f64) {
        self.now.set(ms);
    }

    pub fn advance(&self, ms: f64) {
        self.now.set(self.now.get() + ms);
    }

    #[must_use]
    pub fn get(&self) -> f64 {
        self.now.get()
    }
}

impl Clock for ManualClock {
    fn wall_ms(&self) -> i64 {
        self.now.get().floor() as i64
    }

    fn precise_ms(&self) -> f64 {
        self.now.get()
    }
}
