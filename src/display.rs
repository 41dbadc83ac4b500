//! Display capability.
//!
//! [`DisplaySink`] is the seam between the playback engine and whatever
//! actually lights pixels: a Linux framebuffer panel
//! ([`FramebufferDisplay`](crate::FramebufferDisplay)), a test double, or
//! nothing at all ([`HeadlessDisplay`]). Every operation except
//! [`init`](DisplaySink::init) has a default that reports
//! [`FramecastError::UnsupportedOperation`], so a sink only implements what its
//! hardware can do.
//!
//! The engine never calls a sink directly. It goes through
//! [`GuardedDisplay`], which logs and swallows every failure so that a
//! misbehaving panel can blank the screen but never stop playback. A sink
//! whose `init` fails is dropped for good and the engine carries on headless.

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::thread;
use std::time::Duration;

use image::DynamicImage;

use crate::error::FramecastError;
use crate::status::blank_image;

/// Pause after the blank teardown frame so the panel latches it before the
/// module is shut down.
const TEARDOWN_SETTLE: Duration = Duration::from_millis(100);

/// Size of a display in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplaySize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl DisplaySize {
    /// Create a size.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Something the playback engine can push decoded frames to.
///
/// Implementations must be [`Send`]: the sink is moved onto the playback
/// thread's side of a mutex and may be called from the converter's thread
/// for the status image.
pub trait DisplaySink: Send {
    /// Short name used in log messages.
    fn name(&self) -> &str {
        "display"
    }

    /// Bring the hardware up.
    ///
    /// Returns the panel size if the sink knows it. An error means the
    /// display is unavailable for the rest of the process lifetime; it is
    /// never retried.
    fn init(&mut self) -> Result<Option<DisplaySize>, FramecastError>;

    /// Show a full frame.
    fn show_image(&mut self, _image: &DynamicImage) -> Result<(), FramecastError> {
        Err(FramecastError::UnsupportedOperation("show_image"))
    }

    /// Set the backlight level, 0 to 100.
    fn set_backlight(&mut self, _percent: u8) -> Result<(), FramecastError> {
        Err(FramecastError::UnsupportedOperation("set_backlight"))
    }

    /// Blank the panel.
    fn clear(&mut self) -> Result<(), FramecastError> {
        Err(FramecastError::UnsupportedOperation("clear"))
    }

    /// Release the hardware. Called once, last.
    fn teardown(&mut self) -> Result<(), FramecastError> {
        Err(FramecastError::UnsupportedOperation("teardown"))
    }
}

/// A sink with no hardware behind it.
///
/// Its `init` always fails, so an engine built on it runs every piece of the
/// playback loop without producing pixels.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessDisplay;

impl DisplaySink for HeadlessDisplay {
    fn name(&self) -> &str {
        "headless"
    }

    fn init(&mut self) -> Result<Option<DisplaySize>, FramecastError> {
        Err(FramecastError::DisplayUnavailable(
            "no display configured".to_string(),
        ))
    }
}

/// Failure-tolerant wrapper around an initialised [`DisplaySink`].
///
/// Holds the sink only while it is usable. After a failed `init` or a
/// completed [`teardown`](GuardedDisplay::teardown) every call is a no-op.
pub struct GuardedDisplay {
    sink: Option<Box<dyn DisplaySink>>,
    size: DisplaySize,
}

impl Debug for GuardedDisplay {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("GuardedDisplay")
            .field("sink", &self.sink.as_ref().map(|sink| sink.name()))
            .field("size", &self.size)
            .finish()
    }
}

impl GuardedDisplay {
    /// Initialise `sink`, then clear it and set the backlight.
    ///
    /// If `init` fails the sink is dropped and the returned display is
    /// headless. `fallback` is used as the size when the sink does not
    /// report one.
    pub fn initialise(
        mut sink: Box<dyn DisplaySink>,
        fallback: DisplaySize,
        backlight_percent: u8,
    ) -> Self {
        let size = match sink.init() {
            Ok(size) => size.unwrap_or(fallback),
            Err(error) => {
                log::warn!(
                    "Display '{}' unavailable, running headless: {}",
                    sink.name(),
                    error
                );
                return Self::headless(fallback);
            }
        };

        log::info!(
            "Display '{}' initialised ({}x{})",
            sink.name(),
            size.width,
            size.height
        );

        let mut display = Self {
            sink: Some(sink),
            size,
        };
        display.clear();
        display.set_backlight(backlight_percent);
        display
    }

    /// A display with no sink at all.
    pub fn headless(size: DisplaySize) -> Self {
        Self { sink: None, size }
    }

    /// `true` while a working sink is attached.
    pub fn is_available(&self) -> bool {
        self.sink.is_some()
    }

    /// Panel size, or the fallback size when headless.
    pub fn size(&self) -> DisplaySize {
        self.size
    }

    fn call<F>(&mut self, operation: &'static str, body: F) -> bool
    where
        F: FnOnce(&mut dyn DisplaySink) -> Result<(), FramecastError>,
    {
        let Some(sink) = self.sink.as_mut() else {
            return false;
        };

        match body(sink.as_mut()) {
            Ok(()) => true,
            Err(FramecastError::UnsupportedOperation(name)) => {
                log::warn!("Display '{}' has no {} operation", sink.name(), name);
                false
            }
            Err(error) => {
                log::error!("Display '{}' {} failed: {}", sink.name(), operation, error);
                false
            }
        }
    }

    /// Show `image`. Returns `true` if the sink accepted it.
    pub fn show(&mut self, image: &DynamicImage) -> bool {
        self.call("show_image", |sink| sink.show_image(image))
    }

    /// Set the backlight level. Returns `true` on success.
    pub fn set_backlight(&mut self, percent: u8) -> bool {
        self.call("set_backlight", |sink| sink.set_backlight(percent))
    }

    /// Blank the panel. Returns `true` on success.
    pub fn clear(&mut self) -> bool {
        self.call("clear", |sink| sink.clear())
    }

    /// Shut the hardware down: backlight off, blank frame, module exit.
    ///
    /// Each step runs even if the one before it failed. The sink is released
    /// afterwards, so a second call does nothing and returns `false`.
    pub fn teardown(&mut self) -> bool {
        if self.sink.is_none() {
            log::info!("Display resources not available or already released");
            return false;
        }

        log::info!("Releasing display resources");
        self.set_backlight(0);

        let blank = blank_image(self.size.width, self.size.height);
        if self.show(&blank) {
            thread::sleep(TEARDOWN_SETTLE);
        }

        self.call("teardown", |sink| sink.teardown());
        self.sink = None;
        true
    }
}
