//! Scheduler configuration.
//!
//! # Tuning Guidelines
//!
//! - **`desired_fps`** sets the cadence of the update loop. The driver sleeps
//!   roughly `1000 / desired_fps` ms between passes, shortening the sleep
//!   after a late pass to catch up.
//! - **`time_cap`** is the largest gap between two passes that is treated as
//!   ordinary time passing. A longer gap (the host was suspended, the process
//!   was stopped in a debugger) shifts pending events forward instead of
//!   firing everything that came due during the gap at once. It must be at
//!   least one frame interval, and should be well above it.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::timing::time::Span;

/// Settings for a [`Scheduler`](crate::timing::Scheduler).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Target number of update passes per second.
    ///
    /// **Default**: 60
    pub desired_fps: u32,

    /// Collect per-frame statistics (frame time min/max, measured and suggested fps).
    ///
    /// **Default**: false
    pub advanced_timing: bool,

    /// Gap between passes beyond which pending events are shifted rather than fired together.
    ///
    /// **Default**: 1000ms
    pub time_cap: Span,

    /// Stop the scheduler once every event has fired or been removed.
    ///
    /// **Default**: false
    pub auto_destroy: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            desired_fps: 60,
            advanced_timing: false,
            time_cap: Span::from_millis(1000),
            auto_destroy: false,
        }
    }
}

impl SchedulerConfig {
    /// Checks the invariants the scheduler relies on.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroFps`] if `desired_fps == 0`,
    /// [`ConfigError::NegativeTimeCap`] if `time_cap` is negative, and
    /// [`ConfigError::TimeCapBelowFrameInterval`] if `time_cap` is shorter than
    /// `1000 / desired_fps` ms.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.desired_fps == 0 {
            return Err(ConfigError::ZeroFps);
        }
        if self.time_cap.is_negative() {
            return Err(ConfigError::NegativeTimeCap(self.time_cap.as_millis()));
        }
        if (self.time_cap.as_millis() as f64) < self.frame_interval_ms() {
            return Err(ConfigError::TimeCapBelowFrameInterval {
                time_cap: self.time_cap.as_millis(),
                desired_fps: self.desired_fps,
            });
        }
        Ok(())
    }

    /// Target interval between passes in milliseconds.
    #[must_use]
    pub fn frame_interval_ms(&self) -> f64 {
        1000.0 / f64::from(self.desired_fps)
    }

    /// Builder-style setter for the target pass rate.
    #[must_use]
    pub const fn with_desired_fps(mut self, fps: u32) -> Self {
        self.desired_fps = fps;
        self
    }

    /// Builder-style setter for advanced timing statistics.
    #[must_use]
    pub const fn with_advanced_timing(mut self, enabled: bool) -> Self {
        self.advanced_timing = enabled;
        self
    }

    /// Builder-style setter for the spike threshold.
    #[must_use]
    pub const fn with_time_cap(mut self, cap: Span) -> Self {
        self.time_cap = cap;
        self
    }

    /// Builder-style setter for self-termination on an exhausted queue.
    #[must_use]
    pub const fn with_auto_destroy(mut self, enabled: bool) -> Self {
        self.auto_destroy = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.desired_fps, 60);
        assert!(!config.advanced_timing);
        assert_eq!(config.time_cap, Span::from_millis(1000));
        assert!(!config.auto_destroy);
        assert!(config.validate().is_ok());
        assert!((config.frame_interval_ms() - 16.666_666).abs() < 1e-3);
    }

    #[test]
    fn builder_pattern() {
        let config = SchedulerConfig::default()
            .with_desired_fps(30)
            .with_time_cap(Span::from_millis(250))
            .with_auto_destroy(true)
            .with_advanced_timing(true);

        assert_eq!(config.desired_fps, 30);
        assert_eq!(config.time_cap, Span::from_millis(250));
        assert!(config.auto_destroy);
        assert!(config.advanced_timing);
    }

    #[test]
    fn invalid_values_rejected() {
        assert_eq!(
            SchedulerConfig::default().with_desired_fps(0).validate(),
            Err(ConfigError::ZeroFps)
        );
        assert_eq!(
            SchedulerConfig::default()
                .with_time_cap(Span::from_millis(-1))
                .validate(),
            Err(ConfigError::NegativeTimeCap(-1))
        );
    }

    #[test]
    fn time_cap_must_cover_a_frame() {
        assert_eq!(
            SchedulerConfig::default()
                .with_time_cap(Span::from_millis(10))
                .validate(),
            Err(ConfigError::TimeCapBelowFrameInterval {
                time_cap: 10,
                desired_fps: 60
            })
        );
        // 17ms covers a 16.67ms frame; 16ms does not.
        let at_sixty = SchedulerConfig::default().with_time_cap(Span::from_millis(17));
        assert!(at_sixty.validate().is_ok());
        assert!(at_sixty.clone().with_time_cap(Span::from_millis(16)).validate().is_err());
        // Lowering the rate lengthens the frame past the same cap.
        assert!(at_sixty.with_desired_fps(30).validate().is_err());
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config: SchedulerConfig =
            serde_json::from_str(r#"{ "desired_fps": 30, "time_cap": 500 }"#).unwrap();
        assert_eq!(
            config,
            SchedulerConfig::default()
                .with_desired_fps(30)
                .with_time_cap(Span::from_millis(500))
        );
    }
}
