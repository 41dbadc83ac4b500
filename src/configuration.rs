//! Playback configuration.
//!
//! [`PlaybackOptions`] is a builder that carries the frame directory, pacing,
//! buffering, and display settings into a
//! [`PlaybackEngine`](crate::PlaybackEngine) without a long constructor
//! argument list.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use framecast::PlaybackOptions;
//!
//! let options = PlaybackOptions::new()
//!     .with_frames_directory("/srv/frames")
//!     .with_target_fps(12.0)
//!     .with_buffer_capacity(30)
//!     .with_pause_poll_interval(Duration::from_millis(250));
//!
//! options.validate().unwrap();
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::FramecastError;
use crate::scheduler;

/// Default playback rate, matching the converter's output rate.
pub const DEFAULT_TARGET_FPS: f64 = 15.0;

/// Default number of decoded frames held ahead of the display.
pub const DEFAULT_BUFFER_CAPACITY: usize = 15;

/// Slowest accepted playback rate: one frame per hour.
pub const MIN_TARGET_FPS: f64 = 1.0 / 3600.0;

/// Longest accepted poll, backoff, or stop timeout.
pub const MAX_WAIT: Duration = Duration::from_secs(3600);

/// Font tried for the status caption when none is configured.
pub const DEFAULT_FONT_PATH: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf";

/// Settings for a [`PlaybackEngine`](crate::PlaybackEngine).
///
/// All fields have defaults suitable for a 320×240 panel fed by the
/// converter's 15 fps output.
#[derive(Clone)]
pub struct PlaybackOptions {
    pub(crate) frames_directory: PathBuf,
    pub(crate) target_fps: f64,
    pub(crate) buffer_capacity: usize,
    pub(crate) pause_poll_interval: Duration,
    pub(crate) stop_join_timeout: Duration,
    pub(crate) empty_backoff: Duration,
    pub(crate) backlight_percent: u8,
    pub(crate) status_caption: String,
    pub(crate) font_path: Option<PathBuf>,
    pub(crate) font_size: f32,
    pub(crate) fallback_size: (u32, u32),
}

impl Debug for PlaybackOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("PlaybackOptions")
            .field("frames_directory", &self.frames_directory)
            .field("target_fps", &self.target_fps)
            .field("buffer_capacity", &self.buffer_capacity)
            .field("pause_poll_interval", &self.pause_poll_interval)
            .field("stop_join_timeout", &self.stop_join_timeout)
            .field("empty_backoff", &self.empty_backoff)
            .field("backlight_percent", &self.backlight_percent)
            .field("has_font", &self.font_path.is_some())
            .finish()
    }
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackOptions {
    /// Create options with default settings.
    ///
    /// Defaults: `frames` directory, 15 fps, 15-frame buffer, 0.5 s pause
    /// poll, 3 s stop timeout, 1 s empty-directory backoff, 50% backlight.
    pub fn new() -> Self {
        Self {
            frames_directory: PathBuf::from("frames"),
            target_fps: DEFAULT_TARGET_FPS,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            pause_poll_interval: Duration::from_millis(500),
            stop_join_timeout: Duration::from_secs(3),
            empty_backoff: Duration::from_secs(1),
            backlight_percent: 50,
            status_caption: "Processing...".to_string(),
            font_path: Some(PathBuf::from(DEFAULT_FONT_PATH)),
            font_size: 20.0,
            fallback_size: (320, 240),
        }
    }

    /// Set the directory the frame set is resolved from.
    #[must_use]
    pub fn with_frames_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.frames_directory = directory.into();
        self
    }

    /// Set the target playback rate in frames per second.
    ///
    /// Checked by [`validate`](PlaybackOptions::validate); must be finite and
    /// at least [`MIN_TARGET_FPS`].
    #[must_use]
    pub fn with_target_fps(mut self, fps: f64) -> Self {
        self.target_fps = fps;
        self
    }

    /// Set how many decoded frames a buffer fill loads. Clamped to a minimum
    /// of 1.
    #[must_use]
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity.max(1);
        self
    }

    /// Set how often the conversion signal is re-checked while paused.
    #[must_use]
    pub fn with_pause_poll_interval(mut self, interval: Duration) -> Self {
        self.pause_poll_interval = interval;
        self
    }

    /// Set how long [`stop`](crate::PlaybackEngine::stop) waits for the
    /// playback thread before tearing the display down anyway.
    #[must_use]
    pub fn with_stop_join_timeout(mut self, timeout: Duration) -> Self {
        self.stop_join_timeout = timeout;
        self
    }

    /// Set the wait between retries when no frames are present or none
    /// could be decoded.
    #[must_use]
    pub fn with_empty_backoff(mut self, backoff: Duration) -> Self {
        self.empty_backoff = backoff;
        self
    }

    /// Set the backlight level applied after the display initialises.
    /// Clamped to 100.
    #[must_use]
    pub fn with_backlight_percent(mut self, percent: u8) -> Self {
        self.backlight_percent = percent.min(100);
        self
    }

    /// Set the caption drawn on the status image.
    #[must_use]
    pub fn with_status_caption(mut self, caption: impl Into<String>) -> Self {
        self.status_caption = caption.into();
        self
    }

    /// Set the TrueType font used for the status caption. `None` renders the
    /// status image without a caption.
    #[must_use]
    pub fn with_font(mut self, path: Option<PathBuf>) -> Self {
        self.font_path = path;
        self
    }

    /// Set the caption size in pixels.
    #[must_use]
    pub fn with_font_size(mut self, size: f32) -> Self {
        self.font_size = size;
        self
    }

    /// Set the image size used when the display cannot report its own.
    #[must_use]
    pub fn with_fallback_size(mut self, width: u32, height: u32) -> Self {
        self.fallback_size = (width.max(1), height.max(1));
        self
    }

    /// Directory the frame set is resolved from.
    pub fn frames_directory(&self) -> &Path {
        &self.frames_directory
    }

    /// Target playback rate.
    pub fn target_fps(&self) -> f64 {
        self.target_fps
    }

    /// Number of frames a buffer fill loads.
    pub fn buffer_capacity(&self) -> usize {
        self.buffer_capacity
    }

    /// Wait between conversion-signal checks while paused.
    pub fn pause_poll_interval(&self) -> Duration {
        self.pause_poll_interval
    }

    /// Upper bound on how long `stop` waits for the playback thread.
    pub fn stop_join_timeout(&self) -> Duration {
        self.stop_join_timeout
    }

    /// Backoff used when the frame directory is empty or undecodable.
    pub fn empty_backoff(&self) -> Duration {
        self.empty_backoff
    }

    /// Per-frame display interval derived from the target rate.
    ///
    /// An unusable rate yields the default rate's interval; [`validate`]
    /// reports it.
    ///
    /// [`validate`]: PlaybackOptions::validate
    pub fn frame_interval(&self) -> Duration {
        scheduler::frame_interval(self.target_fps)
            .unwrap_or_else(|| Duration::from_secs_f64(1.0 / DEFAULT_TARGET_FPS))
    }

    /// Check that every setting is usable.
    ///
    /// # Errors
    ///
    /// Returns [`FramecastError::InvalidConfiguration`] naming the first
    /// offending setting.
    pub fn validate(&self) -> Result<(), FramecastError> {
        if !self.target_fps.is_finite() || self.target_fps < MIN_TARGET_FPS {
            return Err(FramecastError::InvalidConfiguration(format!(
                "target_fps must be at least {MIN_TARGET_FPS}, got {}",
                self.target_fps
            )));
        }
        for (name, value) in [
            ("pause_poll_interval", self.pause_poll_interval),
            ("empty_backoff", self.empty_backoff),
        ] {
            if value.is_zero() {
                return Err(FramecastError::InvalidConfiguration(format!(
                    "{name} must be greater than zero"
                )));
            }
        }
        for (name, value) in [
            ("pause_poll_interval", self.pause_poll_interval),
            ("empty_backoff", self.empty_backoff),
            ("stop_join_timeout", self.stop_join_timeout),
        ] {
            if value > MAX_WAIT {
                return Err(FramecastError::InvalidConfiguration(format!(
                    "{name} must be at most {}s, got {:?}",
                    MAX_WAIT.as_secs(),
                    value
                )));
            }
        }
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(FramecastError::InvalidConfiguration(format!(
                "font_size must be a positive number, got {}",
                self.font_size
            )));
        }
        Ok(())
    }
}
