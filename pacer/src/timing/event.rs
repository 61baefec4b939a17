//! Scheduled events, their handles, and the context passed to callbacks.

use core::fmt;

use crate::error::{CallbackResult, ScheduleError};
use crate::timing::queue::EventQueue;
use crate::timing::time::{Span, Tick};

/// Boxed timer callback.
///
/// The closure's captured environment plays the role of the callback context;
/// the positional arguments stored on the event reach it through [`Fire::args`].
pub type Callback<A> = Box<dyn FnMut(&mut Fire<'_, A>) -> CallbackResult>;

/// Opaque handle to an event, used to inspect or cancel it later.
///
/// A handle carries the id of the queue that issued it next to the event's
/// sequence number, so a handle handed to another queue never matches one of
/// that queue's events. Within a queue, handles order by issue.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventHandle {
    queue: u64,
    seq: u64,
}

impl EventHandle {
    #[inline]
    pub(crate) const fn new(queue: u64, seq: u64) -> Self {
        Self { queue, seq }
    }

    #[inline]
    pub(crate) const fn queue_id(self) -> u64 {
        self.queue
    }
}

impl fmt::Display for EventHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}#{}", self.queue, self.seq)
    }
}

/// How the `delay` passed to `add` is interpreted.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Schedule {
    /// Fire `delay` milliseconds after the scheduler's current logical time.
    #[default]
    After,
    /// `delay` is an absolute timestamp on the logical clock.
    At,
}

/// One scheduled callback.
pub struct TimerEvent<A> {
    pub(crate) handle: EventHandle,
    pub(crate) delay: Span,
    pub(crate) tick: Tick,
    pub(crate) kind: Schedule,
    pub(crate) repeat: bool,
    pub(crate) args: Vec<A>,
    /// `None` only while the callback itself is running.
    pub(crate) callback: Option<Callback<A>>,
    pub(crate) pending_delete: bool,
    pub(crate) fire_count: u64,
}

impl<A> TimerEvent<A> {
    pub(crate) fn new(
        handle: EventHandle,
        delay: Span,
        tick: Tick,
        kind: Schedule,
        repeat: bool,
        args: Vec<A>,
        callback: Callback<A>,
    ) -> Self {
        Self {
            handle,
            delay,
            tick,
            kind,
            repeat,
            args,
            callback: Some(callback),
            pending_delete: false,
            fire_count: 0,
        }
    }

    #[must_use]
    pub const fn handle(&self) -> EventHandle {
        self.handle
    }

    /// Requested delay after rounding; the absolute timestamp for [`Schedule::At`].
    #[must_use]
    pub const fn delay(&self) -> Span {
        self.delay
    }

    /// Logical time at which the event next becomes due.
    #[must_use]
    pub const fn tick(&self) -> Tick {
        self.tick
    }

    #[must_use]
    pub const fn kind(&self) -> Schedule {
        self.kind
    }

    #[must_use]
    pub const fn is_repeating(&self) -> bool {
        self.repeat
    }

    #[must_use]
    pub fn args(&self) -> &[A] {
        &self.args
    }

    /// True once the event has fired (one-shot) or been removed.
    #[must_use]
    pub const fn is_pending_delete(&self) -> bool {
        self.pending_delete
    }

    /// Number of times the callback has been invoked.
    #[must_use]
    pub const fn fire_count(&self) -> u64 {
        self.fire_count
    }
}

impl<A: fmt::Debug> fmt::Debug for TimerEvent<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerEvent")
            .field("handle", &self.handle)
            .field("delay", &self.delay)
            .field("tick", &self.tick)
            .field("kind", &self.kind)
            .field("repeat", &self.repeat)
            .field("args", &self.args)
            .field("pending_delete", &self.pending_delete)
            .field("fire_count", &self.fire_count)
            .finish_non_exhaustive()
    }
}

/// Rounds a requested delay to whole milliseconds.
///
/// Non-finite input is rejected. Negative results clamp to zero, and values
/// beyond the `i64` range saturate.
pub(crate) fn normalize_delay(delay: f64) -> Result<Span, ScheduleError> {
    if !delay.is_finite() {
        return Err(ScheduleError::NonFiniteDelay(delay));
    }
    // `as` saturates for out-of-range floats.
    Ok(Span::from_millis(delay.round() as i64).non_negative())
}

/// Context handed to a callback while its event fires.
///
/// Besides the event's own data it exposes the queue operations a callback is
/// allowed to perform mid-pass: cancelling events (including itself and
/// not-yet-visited siblings) and scheduling new ones. Both only flag or append,
/// so the pass in progress is never disturbed; events added here are first
/// considered on the next pass.
pub struct Fire<'q, A> {
    pub(crate) handle: EventHandle,
    pub(crate) tick: Tick,
    pub(crate) now: Tick,
    pub(crate) fire_count: u64,
    pub(crate) args: &'q [A],
    pub(crate) queue: &'q mut EventQueue<A>,
}

impl<A> Fire<'_, A> {
    /// Handle of the firing event.
    #[must_use]
    pub const fn handle(&self) -> EventHandle {
        self.handle
    }

    /// Positional arguments stored on the event.
    #[must_use]
    pub fn args(&self) -> &[A] {
        self.args
    }

    /// The tick this firing was scheduled for.
    #[must_use]
    pub const fn scheduled(&self) -> Tick {
        self.tick
    }

    /// The queue's logical time during this pass.
    #[must_use]
    pub const fn now(&self) -> Tick {
        self.now
    }

    /// How many times the event has fired, counting this one.
    #[must_use]
    pub const fn fire_count(&self) -> u64 {
        self.fire_count
    }

    /// Stops a repeating event from firing again.
    ///
    /// Returns `false` for one-shot events, which are already retired by the
    /// time their callback runs.
    pub fn cancel(&mut self) -> bool {
        self.queue.remove(self.handle)
    }

    /// Cancels another event. Same contract as [`EventQueue::remove`].
    pub fn remove(&mut self, handle: EventHandle) -> bool {
        self.queue.remove(handle)
    }

    /// Schedules a one-shot event relative to (or, for [`Schedule::At`], independent of)
    /// the current pass time.
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
        self.queue
            .add(delay, kind, false, self.now, args, Box::new(callback))
    }

    /// Schedules a repeating event whose first firing is `interval` after the current pass time.
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
        self.queue.add(
            interval,
            Schedule::After,
            true,
            self.now,
            args,
            Box::new(callback),
        )
    }
}
