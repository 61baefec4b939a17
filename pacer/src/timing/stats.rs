//! Frame statistics collected when advanced timing is enabled.

/// Length of the fps measurement window.
const WINDOW_MS: f64 = 1000.0;

/// Frame-time and rate statistics for the update loop.
///
/// Frame times are fed every pass; the fps figures are recomputed once per
/// second of high-resolution time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameStats {
    frames: u64,
    ms_min: Option<f64>,
    ms_max: Option<f64>,
    fps: Option<u32>,
    fps_min: Option<u32>,
    fps_max: Option<u32>,
    suggested_fps: Option<u32>,
    window_start: Option<f64>,
    window_frames: u32,
}

impl FrameStats {
    /// Records one pass at high-resolution time `now` that took `elapsed` ms since the last.
    pub fn record(&mut self, now: f64, elapsed: f64, desired_fps: u32) {
        self.frames += 1;
        self.ms_min = Some(self.ms_min.map_or(elapsed, |m| m.min(elapsed)));
        self.ms_max = Some(self.ms_max.map_or(elapsed, |m| m.max(elapsed)));

        // The pass that opens a window is its boundary, not one of its frames.
        let Some(start) = self.window_start else {
            self.window_start = Some(now);
            return;
        };
        self.window_frames += 1;
        let span = now - start;
        if span > WINDOW_MS {
            let fps = (f64::from(self.window_frames) * 1000.0 / span).round() as u32;
            self.fps = Some(fps);
            self.fps_min = Some(self.fps_min.map_or(fps, |m| m.min(fps)));
            self.fps_max = Some(self.fps_max.map_or(fps, |m| m.max(fps)));
            self.suggested_fps = Some((fps / 5 * 5).max(5).min(desired_fps));
            self.window_start = Some(now);
            self.window_frames = 0;
        }
    }

    /// Clears every statistic.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Passes recorded since the last reset.
    #[must_use]
    pub const fn frames(&self) -> u64 {
        self.frames
    }

    /// Shortest frame time seen, in ms.
    #[must_use]
    pub const fn ms_min(&self) -> Option<f64> {
        self.ms_min
    }

    /// Longest frame time seen, in ms.
    #[must_use]
    pub const fn ms_max(&self) -> Option<f64> {
        self.ms_max
    }

    /// Rate measured over the last complete window.
    #[must_use]
    pub const fn fps(&self) -> Option<u32> {
        self.fps
    }

    #[must_use]
    pub const fn fps_min(&self) -> Option<u32> {
        self.fps_min
    }

    #[must_use]
    pub const fn fps_max(&self) -> Option<u32> {
        self.fps_max
    }

    /// A rate the host can sustain: the measured fps rounded down to a multiple
    /// of 5, never below 5 and never above the configured target.
    #[must_use]
    pub const fn suggested_fps(&self) -> Option<u32> {
        self.suggested_fps
    }
}
