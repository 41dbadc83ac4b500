//! Video to frame conversion.
//!
//! Conversion is delegated to the `ffmpeg` program, run with fixed
//! parameters so its output always matches what the playback engine expects:
//! frames scaled to the panel size, resampled to the playback rate, and
//! written as `frame_%04d.png` into the frame directory.
//!
//! While [`FrameConverter::convert`] runs it holds the [`ConversionSignal`]
//! raised, which pauses playback; the signal drops again on every exit path.

use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::engine::PlaybackEngine;
use crate::error::FramecastError;
use crate::frame_set::FrameSetResolver;
use crate::signal::ConversionSignal;

/// Lines of the converter's error output kept in a failure message.
const STDERR_TAIL_LINES: usize = 5;

/// Runs the external converter.
#[derive(Debug, Clone)]
pub struct FrameConverter {
    program: PathBuf,
    width: u32,
    height: u32,
    fps: u32,
}

impl Default for FrameConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameConverter {
    /// `ffmpeg` from `PATH`, producing 320×240 frames at 15 fps.
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
            width: 320,
            height: 240,
            fps: 15,
        }
    }

    /// Use a different converter executable.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Set the output frame size.
    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width.max(1);
        self.height = height.max(1);
        self
    }

    /// Set the output frame rate. Clamped to a minimum of 1.
    #[must_use]
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps.max(1);
        self
    }

    /// Arguments passed to the converter for `video` and `frames_directory`.
    pub fn arguments(&self, video: &Path, frames_directory: &Path) -> Vec<OsString> {
        vec![
            OsString::from("-y"),
            OsString::from("-i"),
            video.as_os_str().to_owned(),
            OsString::from("-vf"),
            OsString::from(format!("scale={}:{}", self.width, self.height)),
            OsString::from("-r"),
            OsString::from(self.fps.to_string()),
            frames_directory.join("frame_%04d.png").into_os_string(),
        ]
    }

    /// Replace the contents of `frames_directory` with the frames of `video`.
    ///
    /// Raises `signal` for the duration of the call. If `engine` is given,
    /// its status image is shown before any frame is removed.
    ///
    /// Returns the number of frames found in the directory afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`FramecastError::VideoNotFound`] if `video` does not exist,
    /// [`FramecastError::IoError`] if the old frames cannot be removed,
    /// [`FramecastError::ConverterNotFound`] if the program cannot be
    /// started, and [`FramecastError::ConversionFailed`] if it exits with an
    /// error.
    pub fn convert(
        &self,
        video: &Path,
        frames_directory: &Path,
        signal: &ConversionSignal,
        engine: Option<&PlaybackEngine>,
    ) -> Result<usize, FramecastError> {
        if !video.is_file() {
            return Err(FramecastError::VideoNotFound(video.to_path_buf()));
        }

        let _converting = signal.begin();
        if let Some(engine) = engine {
            engine.show_processing_message();
        }

        clear_frames(frames_directory)?;

        let arguments = self.arguments(video, frames_directory);
        log::info!(
            "Running {} {}",
            self.program.display(),
            arguments
                .iter()
                .map(|argument| argument.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let output = Command::new(&self.program)
            .args(&arguments)
            .output()
            .map_err(|error| match error.kind() {
                ErrorKind::NotFound => {
                    FramecastError::ConverterNotFound(self.program.display().to_string())
                }
                _ => FramecastError::IoError(error),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: Vec<&str> = stderr.lines().rev().take(STDERR_TAIL_LINES).collect();
            let tail: Vec<&str> = tail.into_iter().rev().collect();
            return Err(FramecastError::ConversionFailed {
                video: video.to_path_buf(),
                reason: format!("{} ({})", output.status, tail.join(" | ")),
            });
        }

        let frames = FrameSetResolver::new(frames_directory).resolve().len();
        log::info!("Converted {} into {} frames", video.display(), frames);
        Ok(frames)
    }
}

/// Remove every file in `directory`, creating it if it does not exist.
///
/// Subdirectories are left alone.
pub fn clear_frames(directory: &Path) -> Result<(), FramecastError> {
    fs::create_dir_all(directory)?;

    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            continue;
        }
        let path = entry.path();
        if let Err(error) = fs::remove_file(&path) {
            log::error!("Failed to delete {}: {}", path.display(), error);
            return Err(error.into());
        }
    }

    Ok(())
}
