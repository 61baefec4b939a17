//! The scheduler: logical clock, update pacing, and the per-pass event update.
//!
//! Each call to [`Scheduler::update`] is one pass. It samples the wall clock,
//! works out how long the host should wait before the next pass, and then runs
//! the event update on the queue:
//!
//! 1. Measure the gap since the previous pass on the queue's own clock. A gap
//!    larger than `time_cap` (the host was suspended) or a clock that moved
//!    backwards re-anchors pending events on the current time, keeping the
//!    time they had left instead of firing them all at once.
//! 2. Compact entries flagged by the previous pass.
//! 3. If the head is due, fire every due event in tick order.
//! 4. Re-order what is left, or mark the queue expired when nothing is left.
//!
//! The scheduler never sleeps or spawns anything itself; a host loop (see
//! [`Driver`](crate::driver::Driver)) calls `update` and waits
//! [`time_to_call`](Scheduler::time_to_call) milliseconds between passes.

use crate::clock::{Clock, SystemClock};
use crate::error::{CallbackResult, ConfigError, FireFailure, ScheduleError};
use crate::timing::config::SchedulerConfig;
use crate::timing::event::{Callback, EventHandle, Fire, Schedule, TimerEvent};
use crate::timing::queue::{Dispatch, EventQueue};
use crate::timing::stats::FrameStats;
use crate::timing::time::{Span, Tick};
use crate::trace::{debug, info, warn};

/// What one call to [`Scheduler::update`] did.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// False when the scheduler was not running and the call did nothing.
    pub ran: bool,
    /// Callbacks invoked this pass, failed ones included.
    pub fired: usize,
    /// Callbacks that returned an error or panicked.
    pub failures: Vec<FireFailure>,
    /// Pending events were re-anchored after a gap or a backwards clock step.
    pub corrected: bool,
    /// Whether the host should schedule another pass.
    pub keep_running: bool,
}

/// Result of the event half of a pass.
struct EventPass {
    dispatch: Dispatch,
    corrected: bool,
    keep_running: bool,
}

/// Cooperative single-threaded event timer.
///
/// `A` is the type of the positional arguments stored with each event and
/// handed to its callback; `C` supplies the wall clock.
pub struct Scheduler<A, C: Clock = SystemClock> {
    config: SchedulerConfig,
    clock: C,
    queue: EventQueue<A>,
    stats: FrameStats,

    running: bool,
    expired: bool,
    started: Tick,

    /// Last wall-clock sample.
    time: Tick,
    /// Wall-clock delta between the last two passes (diagnostic).
    elapsed_ms: Span,
    /// Driver-supplied time of the current pass.
    now: f64,
    prev_time: f64,
    /// `now - prev_time`, clamped at zero.
    elapsed: f64,
    /// When the next pass should happen.
    time_expected: f64,
    /// Delay before the next pass, in ms.
    time_to_call: u64,

    /// The queue's drift-tracking clock. `None` until the first pass after (re)start.
    queue_now: Option<Tick>,
    /// Gap measured by the last event update, clamped at zero.
    queue_elapsed: Span,
}

impl<A> Scheduler<A, SystemClock> {
    /// A scheduler on the system clock with the default configuration.
    #[must_use]
    pub fn system() -> Self {
        Self::new(SystemClock::new())
    }
}

impl<A, C: Clock> Scheduler<A, C> {
    /// Creates an idle scheduler with the default configuration.
    #[must_use]
    pub fn new(clock: C) -> Self {
        Self::build(SchedulerConfig::default(), clock)
    }

    /// Creates an idle scheduler with `config`.
    ///
    /// # Errors
    ///
    /// Returns the first invariant `config` violates.
    pub fn with_config(config: SchedulerConfig, clock: C) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config, clock))
    }

    fn build(config: SchedulerConfig, clock: C) -> Self {
        let time = Tick::new(clock.wall_ms());
        let now = clock.precise_ms();
        Self {
            config,
            clock,
            queue: EventQueue::new(),
            stats: FrameStats::default(),
            running: false,
            expired: false,
            started: time,
            time,
            elapsed_ms: Span::ZERO,
            now,
            prev_time: now,
            elapsed: 0.0,
            time_expected: now,
            time_to_call: 0,
            queue_now: None,
            queue_elapsed: Span::ZERO,
        }
    }

    /// Schedules a one-shot callback.
    ///
    /// With [`Schedule::After`], the event is due `delay` ms after the current
    /// logical time (the last wall-clock sample if no pass has run yet). With
    /// [`Schedule::At`], `delay` is the absolute tick. The delay is rounded to
    /// whole milliseconds and negative values are clamped to zero.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::NonFiniteDelay`] if `delay` is NaN or infinite.
    pub fn add(
        &mut self,
        delay: f64,
        kind: Schedule,
        args: Vec<A>,
        callback: impl FnMut(&mut Fire<'_, A>) -> CallbackResult + 'static,
    ) -> Result<EventHandle, ScheduleError> {
        self.insert(delay, kind, false, args, Box::new(callback))
    }

    /// Schedules a callback that fires every `interval` ms until removed.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::NonFiniteDelay`] if `interval` is NaN or infinite.
    pub fn add_repeating(
        &mut self,
        interval: f64,
        args: Vec<A>,
        callback: impl FnMut(&mut Fire<'_, A>) -> CallbackResult + 'static,
    ) -> Result<EventHandle, ScheduleError> {
        self.insert(interval, Schedule::After, true, args, Box::new(callback))
    }

    fn insert(
        &mut self,
        delay: f64,
        kind: Schedule,
        repeat: bool,
        args: Vec<A>,
        callback: Callback<A>,
    ) -> Result<EventHandle, ScheduleError> {
        let reference = self.queue_now.unwrap_or(self.time);
        let handle = self
            .queue
            .add(delay, kind, repeat, reference, args, callback)?;
        self.expired = false;
        Ok(handle)
    }

    /// Cancels a pending event. Returns `false` if it already fired, was
    /// already removed, or was never issued by this scheduler.
    pub fn remove(&mut self, handle: EventHandle) -> bool {
        self.queue.remove(handle)
    }

    /// Cancels every pending event, returning how many were cancelled.
    pub fn clear(&mut self) -> usize {
        self.queue.clear()
    }

    /// Starts the scheduler immediately. See [`start_after`](Self::start_after).
    pub fn start(&mut self) {
        self.start_after(Span::ZERO);
    }

    /// Starts the scheduler with its reference point `delay` ms from now.
    ///
    /// Every pending relative event is rebased to `delay_of_event + start`,
    /// so the delays requested before starting count from the start point.
    /// Absolute events keep their timestamp. The first pass is due
    /// immediately. Does nothing if already running.
    pub fn start_after(&mut self, delay: Span) {
        if self.running {
            return;
        }
        self.time = Tick::new(self.clock.wall_ms());
        self.started = self.time + delay.non_negative();
        self.queue.rebase(self.started);

        self.now = self.clock.precise_ms();
        self.prev_time = self.now;
        self.time_expected = self.now;
        self.time_to_call = 0;
        self.queue_now = None;
        self.running = true;

        debug!(
            started = %self.started,
            pending = self.queue.live_len(),
            "scheduler started"
        );
    }

    /// Stops the scheduler. Pending events stay queued for a later start.
    pub fn stop(&mut self) {
        if self.running {
            self.running = false;
            debug!(pending = self.queue.live_len(), "scheduler stopped");
        }
    }

    /// Runs one pass. `now` is the driver's time reading, on the same scale as
    /// the wall clock but possibly finer grained.
    ///
    /// The delay until the next pass is
    /// `floor(max(0, 1000 / desired_fps - (time_expected - now)))`.
    pub fn update(&mut self, now: f64) -> UpdateOutcome {
        if !self.running {
            return UpdateOutcome::default();
        }

        let previous = self.time;
        self.time = Tick::new(self.clock.wall_ms());
        self.elapsed_ms = self.time - previous;

        self.prev_time = self.now;
        self.now = now;
        self.elapsed = (self.now - self.prev_time).max(0.0);

        let wait = self.config.frame_interval_ms() - (self.time_expected - now);
        // `as` saturates; NaN becomes 0.
        self.time_to_call = wait.max(0.0).floor() as u64;
        self.time_expected = now + self.time_to_call as f64;

        if self.config.advanced_timing {
            self.stats
                .record(self.now, self.elapsed, self.config.desired_fps);
        }

        let pass = self.event_update(self.time);
        if !pass.keep_running {
            self.running = false;
            info!("event queue exhausted; scheduler destroyed itself");
        }

        UpdateOutcome {
            ran: true,
            fired: pass.dispatch.fired,
            failures: pass.dispatch.failures,
            corrected: pass.corrected,
            keep_running: pass.keep_running,
        }
    }

    fn event_update(&mut self, time: Tick) -> EventPass {
        let previous = self.queue_now.replace(time).unwrap_or(time);
        let elapsed = time - previous;

        let mut corrected = false;
        if elapsed.is_negative() {
            warn!(
                from = %previous,
                to = %time,
                "clock moved backwards; re-anchoring pending events"
            );
            self.queue_elapsed = Span::ZERO;
            self.queue.adjust_events(previous, time);
            corrected = true;
        } else {
            self.queue_elapsed = elapsed;
            if elapsed > self.config.time_cap {
                warn!(
                    gap = %elapsed,
                    time_cap = %self.config.time_cap,
                    "update gap exceeded time cap; shifting pending events"
                );
                // `time - elapsed` is where the previous pass left the clock.
                self.queue.adjust_events(time - elapsed, time);
                corrected = true;
            }
        }

        let had_entries = !self.queue.is_empty();
        self.queue.compact();

        let mut dispatch = Dispatch::default();
        if self.running && !self.queue.is_empty() && time >= self.queue.next_tick() {
            dispatch = self.queue.dispatch_due(time);
            if self.queue.live_len() > 0 {
                self.queue.order();
            }
        }

        if had_entries && self.queue.live_len() == 0 && !self.expired {
            debug!("event queue expired");
            self.expired = true;
        }

        EventPass {
            dispatch,
            corrected,
            keep_running: !(self.expired && self.config.auto_destroy),
        }
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// True once every queued event has fired or been removed; cleared by `add`.
    #[must_use]
    pub const fn is_expired(&self) -> bool {
        self.expired
    }

    /// Tick of the queue head after the last ordering.
    #[must_use]
    pub const fn next_tick(&self) -> Tick {
        self.queue.next_tick()
    }

    /// Last wall-clock sample.
    #[must_use]
    pub const fn time(&self) -> Tick {
        self.time
    }

    /// Reference point set by the last start.
    #[must_use]
    pub const fn started(&self) -> Tick {
        self.started
    }

    /// Driver time of the last pass.
    #[must_use]
    pub const fn now(&self) -> f64 {
        self.now
    }

    #[must_use]
    pub const fn prev_time(&self) -> f64 {
        self.prev_time
    }

    /// Driver time between the last two passes, never negative.
    #[must_use]
    pub const fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Wall-clock time between the last two passes.
    #[must_use]
    pub const fn elapsed_ms(&self) -> Span {
        self.elapsed_ms
    }

    /// Gap seen by the last event update on the queue clock.
    #[must_use]
    pub const fn queue_elapsed(&self) -> Span {
        self.queue_elapsed
    }

    #[must_use]
    pub const fn time_expected(&self) -> f64 {
        self.time_expected
    }

    /// Milliseconds the host should wait before the next pass.
    #[must_use]
    pub const fn time_to_call(&self) -> u64 {
        self.time_to_call
    }

    /// Queue entries, including ones flagged but not yet compacted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Entries that can still fire.
    #[must_use]
    pub fn live_len(&self) -> usize {
        self.queue.live_len()
    }

    #[must_use]
    pub fn event(&self, handle: EventHandle) -> Option<&TimerEvent<A>> {
        self.queue.get(handle)
    }

    #[must_use]
    pub const fn queue(&self) -> &EventQueue<A> {
        &self.queue
    }

    #[must_use]
    pub const fn stats(&self) -> &FrameStats {
        &self.stats
    }

    #[must_use]
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    #[must_use]
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    /// Changes the target pass rate. The current `time_cap` must still cover
    /// one frame at the new rate.
    ///
    /// # Errors
    ///
    /// Returns what [`SchedulerConfig::validate`] rejects; the config is left unchanged.
    pub fn set_desired_fps(&mut self, fps: u32) -> Result<(), ConfigError> {
        self.reconfigure(self.config.clone().with_desired_fps(fps))
    }

    /// # Errors
    ///
    /// Returns what [`SchedulerConfig::validate`] rejects; the config is left unchanged.
    pub fn set_time_cap(&mut self, cap: Span) -> Result<(), ConfigError> {
        self.reconfigure(self.config.clone().with_time_cap(cap))
    }

    fn reconfigure(&mut self, config: SchedulerConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn set_auto_destroy(&mut self, enabled: bool) {
        self.config.auto_destroy = enabled;
    }

    /// Turning advanced timing on starts the statistics from scratch.
    pub fn set_advanced_timing(&mut self, enabled: bool) {
        if enabled && !self.config.advanced_timing {
            self.stats.reset();
        }
        self.config.advanced_timing = enabled;
    }
}
