//! Error types surfaced by the scheduler.

use thiserror::Error;

use crate::timing::EventHandle;

/// Error returned by a timer callback.
///
/// Callbacks are isolated from each other: a failing callback is logged and
/// reported in the pass outcome, and the pass moves on to the next due event.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// Result type returned by timer callbacks.
pub type CallbackResult = Result<(), CallbackError>;

/// Rejected scheduling request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScheduleError {
    /// The delay (or absolute timestamp) was NaN or infinite.
    #[error("delay must be a finite number of milliseconds, got {0}")]
    NonFiniteDelay(f64),
}

/// Invalid scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("desired_fps must be > 0")]
    ZeroFps,
    #[error("time_cap must be >= 0, got {0}ms")]
    NegativeTimeCap(i64),
    /// A cap shorter than one frame would turn every pass into a spike, and
    /// spike correction would keep pushing pending events back forever.
    #[error("time_cap of {time_cap}ms is shorter than one frame at {desired_fps} fps")]
    TimeCapBelowFrameInterval { time_cap: i64, desired_fps: u32 },
}

/// A callback that did not complete normally during an event pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FireFailure {
    /// The callback returned an error.
    #[error("callback for event {handle} failed: {message}")]
    Failed { handle: EventHandle, message: String },
    /// The callback panicked; the panic was caught at the pass boundary.
    #[error("callback for event {handle} panicked: {message}")]
    Panicked { handle: EventHandle, message: String },
}

impl FireFailure {
    /// Handle of the event whose callback failed.
    #[must_use]
    pub const fn handle(&self) -> EventHandle {
        match self {
            Self::Failed { handle, .. } | Self::Panicked { handle, .. } => *handle,
        }
    }
}
