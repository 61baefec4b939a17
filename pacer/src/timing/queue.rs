//! Tick-ordered event queue with deferred deletion.
//!
//! Events live in a single vector kept in ascending tick order (stable, so
//! equal ticks keep insertion order). Nothing is ever spliced out while a pass
//! walks the vector: firing and removal only set `pending_delete`, and the
//! flagged entries are dropped by [`EventQueue::compact`] at the start of the
//! next pass.

use core::mem;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{FireFailure, ScheduleError};
use crate::timing::event::{Callback, EventHandle, Fire, Schedule, TimerEvent, normalize_delay};
use crate::timing::time::Tick;
use crate::trace::{error, trace};

/// Source of queue ids; every queue in the process gets a distinct one.
static NEXT_QUEUE_ID: AtomicU64 = AtomicU64::new(0);

/// Result of one dispatch scan.
#[derive(Debug, Default)]
pub struct Dispatch {
    /// Callbacks invoked, including failed ones.
    pub fired: usize,
    /// Callbacks that returned an error or panicked.
    pub failures: Vec<FireFailure>,
}

/// Ordered collection of scheduled events.
pub struct EventQueue<A> {
    /// Stamped into every handle this queue issues.
    id: u64,
    events: Vec<TimerEvent<A>>,
    next_tick: Tick,
    next_seq: u64,
    /// Scan position within the current pass.
    cursor: usize,
    /// Queue length captured when the pass began; events appended mid-pass lie beyond it.
    len: usize,
    dispatching: bool,
}

impl<A> Default for EventQueue<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> EventQueue<A> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: NEXT_QUEUE_ID.fetch_add(1, Ordering::Relaxed),
            events: Vec::new(),
            next_tick: Tick::ZERO,
            next_seq: 0,
            cursor: 0,
            len: 0,
            dispatching: false,
        }
    }

    /// Inserts a new event and returns its handle.
    ///
    /// For [`Schedule::After`] the event's tick is `delay + reference`; for
    /// [`Schedule::At`] the rounded `delay` is the tick itself. Outside a pass
    /// the queue is re-ordered immediately; inside one, ordering waits for the
    /// end of the pass so the scan's indices stay valid.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::NonFiniteDelay`] if `delay` is NaN or infinite.
    pub fn add(
        &mut self,
        delay: f64,
        kind: Schedule,
        repeat: bool,
        reference: Tick,
        args: Vec<A>,
        callback: Callback<A>,
    ) -> Result<EventHandle, ScheduleError> {
        let delay = normalize_delay(delay)?;
        let tick = match kind {
            Schedule::After => reference + delay,
            Schedule::At => Tick::new(delay.as_millis()),
        };
        let handle = EventHandle::new(self.id, self.next_seq);
        self.next_seq += 1;

        self.events
            .push(TimerEvent::new(handle, delay, tick, kind, repeat, args, callback));
        if !self.dispatching {
            self.order();
        }
        trace!(%handle, %tick, ?kind, repeat, "event added");
        Ok(handle)
    }

    /// Flags a live event for deletion.
    ///
    /// Returns `false` if no live event has this handle: handles issued by
    /// another queue, one-shot events that already fired, and events removed
    /// earlier. The entry itself is dropped by the next
    /// [`compact`](Self::compact), but a removed head stops counting towards
    /// `next_tick` right away.
    pub fn remove(&mut self, handle: EventHandle) -> bool {
        if handle.queue_id() != self.id {
            return false;
        }
        let Some(idx) = self
            .events
            .iter()
            .position(|e| e.handle == handle && !e.pending_delete)
        else {
            return false;
        };
        self.events[idx].pending_delete = true;

        // Mid-pass the vector may be out of order; the pass re-orders when it ends.
        if !self.dispatching && self.events[..idx].iter().all(|e| e.pending_delete) {
            if let Some(head) = self.events[idx..].iter().find(|e| !e.pending_delete) {
                self.next_tick = head.tick;
            }
        }
        true
    }

    /// Flags every live event for deletion, returning how many were flagged.
    pub fn clear(&mut self) -> usize {
        let mut flagged = 0;
        for event in self.events.iter_mut().filter(|e| !e.pending_delete) {
            event.pending_delete = true;
            flagged += 1;
        }
        flagged
    }

    /// Stable ascending sort by tick; refreshes `next_tick` from the head.
    pub fn order(&mut self) {
        if self.events.is_empty() {
            return;
        }
        self.events.sort_by_key(|e| e.tick);
        self.next_tick = self.events[0].tick;
    }

    /// Drops every flagged event and resets the scan cursor.
    ///
    /// Returns the number of events removed.
    pub fn compact(&mut self) -> usize {
        let before = self.events.len();
        self.events.retain(|e| !e.pending_delete);
        self.len = self.events.len();
        self.cursor = 0;
        if let Some(head) = self.events.first() {
            self.next_tick = head.tick;
        }
        before - self.len
    }

    /// Re-anchors every live event on `now`, preserving its remaining time
    /// measured from `base`. Events already due at `base` become due at `now`.
    pub fn adjust_events(&mut self, base: Tick, now: Tick) {
        for event in self.events.iter_mut().filter(|e| !e.pending_delete) {
            event.tick = now + (event.tick - base).non_negative();
        }
        self.next_tick = now + (self.next_tick - base).non_negative();
    }

    /// Re-derives the tick of every live relative event from its delay and `start`.
    ///
    /// Absolute events keep their timestamp.
    pub fn rebase(&mut self, start: Tick) {
        for event in self
            .events
            .iter_mut()
            .filter(|e| !e.pending_delete && e.kind == Schedule::After)
        {
            event.tick = start + event.delay;
        }
        self.order();
    }

    /// Fires every live event whose tick is at or before `now`, in tick order.
    ///
    /// One-shot events are flagged before their callback runs; repeating
    /// events move to their next tick instead. Each event fires at most once
    /// per call. Flagged entries are skipped, and the scan stops at the first
    /// live event that is not yet due.
    pub fn dispatch_due(&mut self, now: Tick) -> Dispatch {
        let mut report = Dispatch::default();
        self.cursor = 0;
        self.len = self.events.len();
        self.dispatching = true;

        while self.cursor < self.len {
            let idx = self.cursor;
            self.cursor += 1;

            let event = &mut self.events[idx];
            if event.pending_delete {
                continue;
            }
            if now < event.tick {
                break;
            }

            let scheduled = event.tick;
            // One `delay` after the tick that just came due, not after `now`,
            // so late firings keep their cadence.
            let mut next = scheduled + event.delay;
            if next.get() < 0 {
                next = now + event.delay;
            }
            if event.repeat {
                event.tick = next;
            } else {
                event.pending_delete = true;
            }
            event.fire_count += 1;

            let handle = event.handle;
            let fire_count = event.fire_count;
            let Some(mut callback) = event.callback.take() else {
                continue;
            };
            let args = mem::take(&mut event.args);

            trace!(%handle, %scheduled, %now, "firing event");
            let outcome = {
                let mut fire = Fire {
                    handle,
                    tick: scheduled,
                    now,
                    fire_count,
                    args: &args,
                    queue: self,
                };
                panic::catch_unwind(AssertUnwindSafe(|| callback(&mut fire)))
            };

            let event = &mut self.events[idx];
            event.callback = Some(callback);
            event.args = args;
            report.fired += 1;

            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    error!(%handle, error = %err, "timer callback failed");
                    report.failures.push(FireFailure::Failed {
                        handle,
                        message: err.to_string(),
                    });
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    error!(%handle, panic = %message, "timer callback panicked");
                    report.failures.push(FireFailure::Panicked { handle, message });
                }
            }
        }

        self.dispatching = false;
        report
    }

    /// Tick of the queue head after the most recent ordering.
    #[must_use]
    pub const fn next_tick(&self) -> Tick {
        self.next_tick
    }

    /// Number of entries, including flagged ones not yet compacted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of entries that can still fire.
    #[must_use]
    pub fn live_len(&self) -> usize {
        self.events.iter().filter(|e| !e.pending_delete).count()
    }

    /// Looks up an event by handle, flagged entries included until compacted.
    #[must_use]
    pub fn get(&self, handle: EventHandle) -> Option<&TimerEvent<A>> {
        if handle.queue_id() != self.id {
            return None;
        }
        self.events.iter().find(|e| e.handle == handle)
    }

    /// Events in queue order.
    pub fn iter(&self) -> impl Iterator<Item = &TimerEvent<A>> {
        self.events.iter()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
