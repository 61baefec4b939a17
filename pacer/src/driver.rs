//! Host loop that keeps a scheduler ticking.
//!
//! The loop is re-armed after every pass rather than running on a fixed
//! period: it waits [`Scheduler::time_to_call`] ms, runs one
//! [`Scheduler::update`], and repeats. Passes therefore never overlap, and a
//! pass always runs to completion before the next wait begins.
//!
//! # Example
//!
//! ```no_run
//! use pacer::driver::Driver;
//! use pacer::timing::{Schedule, Scheduler, SchedulerConfig};
//!
//! let config = SchedulerConfig::default().with_auto_destroy(true);
//! let mut scheduler: Scheduler<&str> =
//!     Scheduler::with_config(config, pacer::clock::SystemClock::new()).unwrap();
//! scheduler
//!     .add(250.0, Schedule::After, vec!["world"], |fire| {
//!         println!("hello {}", fire.args()[0]);
//!         Ok(())
//!     })
//!     .unwrap();
//! scheduler.start();
//!
//! let summary = Driver::new().run(&mut scheduler);
//! assert_eq!(summary.fired, 1);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crate::clock::Clock;
use crate::error::FireFailure;
use crate::timing::Scheduler;
use crate::trace::{debug, info};

/// Waits between passes.
pub trait Sleeper {
    fn sleep(&mut self, ms: u64);
}

/// Blocks the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, ms: u64) {
        if ms > 0 {
            thread::sleep(Duration::from_millis(ms));
        }
    }
}

impl<F: FnMut(u64)> Sleeper for F {
    fn sleep(&mut self, ms: u64) {
        self(ms);
    }
}

/// Why [`Driver::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The scheduler was not running.
    SchedulerStopped,
    /// The queue ran dry with auto-destroy enabled.
    Exhausted,
    /// The shutdown flag was raised; the scheduler has been stopped.
    Shutdown,
    /// The configured pass limit was reached; the scheduler is still running.
    PassLimit,
}

/// Totals for one [`Driver::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub passes: u64,
    pub fired: usize,
    pub failures: Vec<FireFailure>,
    /// Passes that re-anchored pending events after a gap or clock step.
    pub corrections: u64,
    pub reason: StopReason,
}

/// Drives a [`Scheduler`] until it stops.
#[derive(Debug)]
pub struct Driver<S = ThreadSleeper> {
    sleeper: S,
    shutdown: Option<Arc<AtomicBool>>,
    max_passes: Option<u64>,
}

impl Driver<ThreadSleeper> {
    /// A driver that sleeps the current thread between passes.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_sleeper(ThreadSleeper)
    }
}

impl Default for Driver<ThreadSleeper> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Sleeper> Driver<S> {
    #[must_use]
    pub const fn with_sleeper(sleeper: S) -> Self {
        Self {
            sleeper,
            shutdown: None,
            max_passes: None,
        }
    }

    /// Stops the loop (and the scheduler) once `flag` is set, checked before every pass.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = Some(flag);
        self
    }

    /// Returns after at most `passes` passes.
    #[must_use]
    pub fn with_max_passes(mut self, passes: u64) -> Self {
        self.max_passes = Some(passes);
        self
    }

    /// Runs passes until the scheduler stops, the shutdown flag is raised, or
    /// the pass limit is hit.
    ///
    /// The scheduler must already be started; an idle scheduler returns
    /// immediately with [`StopReason::SchedulerStopped`].
    pub fn run<A, C: Clock>(&mut self, scheduler: &mut Scheduler<A, C>) -> RunSummary {
        let mut summary = RunSummary {
            passes: 0,
            fired: 0,
            failures: Vec::new(),
            corrections: 0,
            reason: StopReason::SchedulerStopped,
        };
        info!(
            pending = scheduler.live_len(),
            max_passes = ?self.max_passes,
            "driver loop starting"
        );

        summary.reason = loop {
            if self
                .shutdown
                .as_ref()
                .is_some_and(|flag| flag.load(Ordering::Relaxed))
            {
                scheduler.stop();
                break StopReason::Shutdown;
            }
            if !scheduler.is_running() {
                break StopReason::SchedulerStopped;
            }
            if self.max_passes.is_some_and(|max| summary.passes >= max) {
                break StopReason::PassLimit;
            }

            self.sleeper.sleep(scheduler.time_to_call());
            let now = scheduler.clock().precise_ms();
            let outcome = scheduler.update(now);

            summary.passes += 1;
            summary.fired += outcome.fired;
            summary.failures.extend(outcome.failures);
            if outcome.corrected {
                summary.corrections += 1;
            }
            if outcome.ran && !outcome.keep_running {
                break StopReason::Exhausted;
            }
        };

        debug!(
            passes = summary.passes,
            fired = summary.fired,
            failures = summary.failures.len(),
            "driver loop pass totals"
        );
        info!(reason = ?summary.reason, "driver loop exiting");
        summary
    }
}
