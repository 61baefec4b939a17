//! Event queue and scheduler.
//!
//! [`Scheduler`] is the entry point: it owns an [`EventQueue`] and the logical
//! clock, and a host loop calls [`Scheduler::update`] repeatedly. Callbacks
//! receive a [`Fire`] context through which they read their arguments and may
//! cancel or schedule events mid-pass.

mod config;
mod event;
mod queue;
mod scheduler;
mod stats;
mod time;

pub use config::SchedulerConfig;
pub use event::{Callback, EventHandle, Fire, Schedule, TimerEvent};
pub use queue::{Dispatch, EventQueue};
pub use scheduler::{Scheduler, UpdateOutcome};
pub use stats::FrameStats;
pub use time::{Span, Tick};
