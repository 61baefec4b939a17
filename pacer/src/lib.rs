//! Cooperative, single-threaded event timer.
//!
//! A [`Scheduler`](timing::Scheduler) keeps a tick-ordered queue of callbacks
//! scheduled after a delay or at an absolute timestamp. A host loop calls
//! [`update`](timing::Scheduler::update) repeatedly; each pass advances the
//! logical clock, fires whatever came due, and reports how long to wait before
//! the next pass. Gaps longer than the configured time cap (a suspended
//! process, a stalled loop) shift pending events forward instead of releasing
//! them all at once.
//!
//! - `timing`: queue, scheduler, configuration and time types.
//! - `clock`: wall-clock sources, including a manual clock for tests.
//! - `driver`: a blocking host loop built on the scheduler's pacing.

pub mod clock;
pub mod driver;
pub mod error;
pub mod timing;
mod trace;

pub use error::{CallbackError, CallbackResult, ConfigError, FireFailure, ScheduleError};
pub use trace::init_tracing;
