//! Error types for the `framecast` crate.
//!
//! This module defines [`FramecastError`], the unified error type returned by
//! every fallible operation in the crate. Errors carry enough context (paths,
//! operation names, upstream messages) to be logged without extra decoration
//! at the call site.
//!
//! The playback loop itself never returns these errors to its caller: it logs
//! them and keeps running. They surface through the setup APIs
//! ([`PlaybackOptions::validate`](crate::PlaybackOptions::validate), display
//! construction, conversion, and the video library).

use std::{io::Error as IoError, path::PathBuf};

use image::ImageError;
use thiserror::Error;

/// The unified error type for all `framecast` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FramecastError {
    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate while decoding or encoding a frame.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),

    /// The display hardware could not be initialised.
    #[error("Display unavailable: {0}")]
    DisplayUnavailable(String),

    /// A call into an initialised display failed.
    #[error("Display operation '{operation}' failed: {reason}")]
    DisplayOperation {
        /// Name of the sink operation (`show_image`, `set_backlight`, ...).
        operation: &'static str,
        /// Underlying reason reported by the sink.
        reason: String,
    },

    /// The display sink does not implement the requested operation.
    #[error("Display does not support '{0}'")]
    UnsupportedOperation(&'static str),

    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The status-image font could not be loaded.
    #[error("Failed to load font at {path}: {reason}")]
    FontLoad {
        /// Path of the font file.
        path: PathBuf,
        /// Why loading failed.
        reason: String,
    },

    /// The external conversion program could not be started.
    #[error("Converter program not found: {0}")]
    ConverterNotFound(String),

    /// The external conversion program ran but did not succeed.
    #[error("Failed to convert {video} to frames: {reason}")]
    ConversionFailed {
        /// The video being converted.
        video: PathBuf,
        /// Exit status and the tail of the program's error output.
        reason: String,
    },

    /// A video requested from the library does not exist.
    #[error("Video not found: {0}")]
    VideoNotFound(PathBuf),

    /// A video name does not carry an allowed extension, or is not a plain
    /// file name.
    #[error("Unsupported video file: {0}")]
    UnsupportedVideoFormat(String),

    /// A buffer fill was given a frame set with no frames in it.
    #[error("No frames to load")]
    NoFrames,

    /// A buffer fill could not decode a single frame.
    #[error("No frames could be decoded, starting at {}", path.display())]
    NoFramesDecoded {
        /// The frame file the failed fill started at.
        path: PathBuf,
    },
}

impl FramecastError {
    /// Build a [`FramecastError::DisplayOperation`] from any displayable
    /// upstream error.
    pub fn display_operation(operation: &'static str, reason: impl ToString) -> Self {
        FramecastError::DisplayOperation {
            operation,
            reason: reason.to_string(),
        }
    }
}
