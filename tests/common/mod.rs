//! Shared fixtures: frame directories on disk and a display that records
//! every call made to it.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use framecast::frame_set::frame_file_name;
use framecast::{DisplaySink, DisplaySize, FramecastError};
use image::{DynamicImage, Rgb, RgbImage};

/// A call observed by [`RecordingDisplay`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Init,
    Show { width: u32, height: u32, first_pixel: [u8; 3] },
    Backlight(u8),
    Clear,
    Teardown,
}

impl Call {
    pub fn is_show(&self) -> bool {
        matches!(self, Call::Show { .. })
    }
}

/// Handle onto the calls a [`RecordingDisplay`] has seen, usable after the
/// display itself has been moved into an engine.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl CallLog {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn shows(&self) -> usize {
        self.calls().iter().filter(|call| call.is_show()).count()
    }

    pub fn count(&self, wanted: &Call) -> usize {
        self.calls().iter().filter(|call| *call == wanted).count()
    }

    fn push(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

/// A [`DisplaySink`] test double.
#[derive(Debug, Default)]
pub struct RecordingDisplay {
    log: CallLog,
    size: Option<DisplaySize>,
    fail_init: bool,
    fail_backlight: bool,
    fail_show: bool,
    show_delay: Option<Duration>,
}

impl RecordingDisplay {
    pub fn new() -> (Self, CallLog) {
        let display = Self {
            size: Some(DisplaySize::new(32, 24)),
            ..Self::default()
        };
        let log = display.log.clone();
        (display, log)
    }

    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    pub fn failing_backlight(mut self) -> Self {
        self.fail_backlight = true;
        self
    }

    pub fn failing_show(mut self) -> Self {
        self.fail_show = true;
        self
    }

    /// Make every `show_image` block for `delay` after it is recorded,
    /// like a panel whose bus has stalled.
    pub fn slow_show(mut self, delay: Duration) -> Self {
        self.show_delay = Some(delay);
        self
    }

    pub fn without_size(mut self) -> Self {
        self.size = None;
        self
    }
}

impl DisplaySink for RecordingDisplay {
    fn name(&self) -> &str {
        "recording"
    }

    fn init(&mut self) -> Result<Option<DisplaySize>, FramecastError> {
        self.log.push(Call::Init);
        if self.fail_init {
            return Err(FramecastError::DisplayUnavailable("test init failure".to_string()));
        }
        Ok(self.size)
    }

    fn show_image(&mut self, image: &DynamicImage) -> Result<(), FramecastError> {
        let rgb = image.to_rgb8();
        self.log.push(Call::Show {
            width: rgb.width(),
            height: rgb.height(),
            first_pixel: rgb.get_pixel(0, 0).0,
        });
        if let Some(delay) = self.show_delay {
            std::thread::sleep(delay);
        }
        if self.fail_show {
            return Err(FramecastError::display_operation("show_image", "test failure"));
        }
        Ok(())
    }

    fn set_backlight(&mut self, percent: u8) -> Result<(), FramecastError> {
        self.log.push(Call::Backlight(percent));
        if self.fail_backlight {
            return Err(FramecastError::display_operation("set_backlight", "test failure"));
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<(), FramecastError> {
        self.log.push(Call::Clear);
        Ok(())
    }

    fn teardown(&mut self) -> Result<(), FramecastError> {
        self.log.push(Call::Teardown);
        Ok(())
    }
}

/// Colour of the fixture frame with the given 1-based index. The red channel
/// carries the index so shown frames can be identified.
pub fn frame_colour(index: u64) -> [u8; 3] {
    [index as u8, 40, 80]
}

/// Write a small solid-colour PNG at `path`.
pub fn write_png(path: &Path, colour: [u8; 3]) {
    RgbImage::from_pixel(4, 3, Rgb(colour)).save(path).unwrap();
}

/// Write `count` frames named like the converter's output into `directory`.
pub fn write_frames(directory: &Path, count: u64) -> Vec<PathBuf> {
    std::fs::create_dir_all(directory).unwrap();
    (1..=count)
        .map(|index| {
            let path = directory.join(frame_file_name(index));
            write_png(&path, frame_colour(index));
            path
        })
        .collect()
}

/// Overwrite a frame file with bytes that are not a PNG.
pub fn corrupt(path: &Path) {
    std::fs::write(path, b"not a png").unwrap();
}
