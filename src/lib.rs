//! # framecast
//!
//! Loop pre-extracted video frames on a small attached display, pausing while
//! a new video is being converted.
//!
//! A converter turns an uploaded video into `frame_0001.png`,
//! `frame_0002.png`, ... in a frame directory. `framecast` replays that
//! directory on a panel at a fixed rate, forever, from one background thread:
//! it reads frames ahead into a buffer, paces display calls, notices when a
//! conversion starts or a new video has replaced the old one, and shuts the
//! panel down cleanly.
//!
//! ## Quick Start
//!
//! ```no_run
//! use framecast::{
//!     ConversionSignal, FrameConverter, FramebufferDisplay, PlaybackEngine, PlaybackOptions,
//! };
//!
//! let signal = ConversionSignal::new();
//! let options = PlaybackOptions::new().with_frames_directory("frames");
//! let panel = FramebufferDisplay::new("/dev/fb1");
//! let engine = PlaybackEngine::new(options, Box::new(panel), signal.clone())?;
//!
//! engine.start()?;
//!
//! // Playback pauses and shows "Processing..." until the frames are written.
//! FrameConverter::new().convert(
//!     "uploads/clip.mp4".as_ref(),
//!     "frames".as_ref(),
//!     &signal,
//!     Some(&engine),
//! )?;
//!
//! engine.stop();
//! # Ok::<(), framecast::FramecastError>(())
//! ```
//!
//! ## Failure model
//!
//! Nothing in the playback path is fatal. Frames that fail to decode are
//! skipped, an empty directory is polled with a backoff, display errors are
//! logged, and a display that fails to initialise leaves the engine running
//! headless. The worst outcome is a blank or stale panel.
//!
//! ## Logging
//!
//! The crate logs through the [`log`](https://crates.io/crates/log) facade;
//! install any logger to see lifecycle and error messages.

pub mod buffer;
pub mod configuration;
pub mod converter;
pub mod display;
pub mod engine;
pub mod error;
pub mod frame_set;
pub mod framebuffer;
pub mod library;
pub mod scheduler;
pub mod signal;
pub mod status;

pub use buffer::{BufferedFrame, FrameBuffer};
pub use configuration::PlaybackOptions;
pub use converter::FrameConverter;
pub use display::{DisplaySink, DisplaySize, GuardedDisplay, HeadlessDisplay};
pub use engine::{
    EngineState, PlaybackEngine, PlaybackLoop, PlaybackState, PlaybackStatus, SharedDisplay, Step,
};
pub use error::FramecastError;
pub use frame_set::{FrameSet, FrameSetResolver};
pub use framebuffer::FramebufferDisplay;
pub use library::VideoLibrary;
pub use scheduler::{CancellationToken, FrameScheduler};
pub use signal::{ConversionGuard, ConversionSignal, PauseCoordinator, PauseStatus};
pub use status::StatusRenderer;
