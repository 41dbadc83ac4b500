//! The playback engine.
//!
//! [`PlaybackEngine`] owns one background thread that loops the frames in the
//! frame directory on the display. Each iteration of that thread is a
//! [`PlaybackLoop::step`]:
//!
//! 1. poll the conversion signal; while it is raised, wait and retry;
//! 2. resolve the frame set; if it differs from the cached one, invalidate
//!    the buffer;
//! 3. refill the buffer when it is exhausted;
//! 4. show the buffered frames one tick at a time, re-checking cancellation
//!    and the conversion signal before each one.
//!
//! The buffer, the cached frame set, and the scheduler live on the playback
//! thread only. The display sits behind a mutex because the converter may
//! push a status image through [`show_processing_message`] at any moment, and
//! because [`stop`] tears it down from the caller's thread. Neither of those
//! waits on the mutex for longer than the stop timeout: a sink stuck inside
//! `show_image` leaves the display in place rather than hanging the caller.
//!
//! [`show_processing_message`]: PlaybackEngine::show_processing_message
//! [`stop`]: PlaybackEngine::stop
//!
//! # Example
//!
//! ```no_run
//! use framecast::{ConversionSignal, HeadlessDisplay, PlaybackEngine, PlaybackOptions};
//!
//! let signal = ConversionSignal::new();
//! let options = PlaybackOptions::new().with_frames_directory("frames");
//! let engine = PlaybackEngine::new(options, Box::new(HeadlessDisplay), signal.clone())?;
//!
//! engine.start()?;
//! // ... the converter raises `signal` while it rewrites `frames/` ...
//! engine.stop();
//! # Ok::<(), framecast::FramecastError>(())
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use image::DynamicImage;
use parking_lot::{Mutex, MutexGuard};

use crate::buffer::FrameBuffer;
use crate::configuration::PlaybackOptions;
use crate::display::{DisplaySink, DisplaySize, GuardedDisplay};
use crate::error::FramecastError;
use crate::frame_set::{FrameSet, FrameSetResolver};
use crate::scheduler::{CancellationToken, FrameScheduler};
use crate::signal::{ConversionSignal, PauseCoordinator, PauseStatus};
use crate::status::StatusRenderer;

/// How many empty-directory checks pass between "no frames" log lines.
const EMPTY_LOG_EVERY: u64 = 10;

/// Minimum wait for the display lock during teardown, so a status image
/// being drawn by the converter does not cause teardown to be skipped.
const TEARDOWN_LOCK_GRACE: Duration = Duration::from_millis(250);

/// The display shared between the playback thread and the engine.
pub type SharedDisplay = Arc<Mutex<GuardedDisplay>>;

/// What the playback thread is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// The frame directory is empty or undecodable; retrying after a backoff.
    WaitingForFrames,
    /// A conversion is running; no frames are shown.
    Paused,
    /// Frames are being shown.
    Playing,
    /// A stop was requested and the thread is winding down.
    Stopping,
    /// No playback thread is running.
    #[default]
    Stopped,
}

/// Lifecycle of a [`PlaybackEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineState {
    /// No playback thread.
    #[default]
    Stopped,
    /// The playback thread is being spawned.
    Starting,
    /// The playback thread is running.
    Running,
    /// The playback thread is being joined and the display torn down.
    Stopping,
}

/// Read-only view of the playback thread's progress, for diagnostics.
///
/// Cloning shares the same underlying state.
#[derive(Debug, Clone, Default)]
pub struct PlaybackStatus {
    inner: Arc<StatusInner>,
}

#[derive(Debug, Default)]
struct StatusInner {
    state: Mutex<PlaybackState>,
    current_frame: Mutex<Option<PathBuf>>,
    frames_shown: AtomicU64,
}

impl PlaybackStatus {
    /// Current playback state.
    pub fn state(&self) -> PlaybackState {
        *self.inner.state.lock()
    }

    /// The frame most recently passed to the display, headless or not.
    pub fn current_frame(&self) -> Option<PathBuf> {
        self.inner.current_frame.lock().clone()
    }

    /// Total number of frames ticked through since the engine was created.
    pub fn frames_shown(&self) -> u64 {
        self.inner.frames_shown.load(Ordering::Relaxed)
    }

    fn set_state(&self, state: PlaybackState) {
        *self.inner.state.lock() = state;
    }

    fn set_current_frame(&self, frame: Option<PathBuf>) {
        *self.inner.current_frame.lock() = frame;
    }

    fn record_frame(&self, frame: &Path) {
        self.set_current_frame(Some(frame.to_path_buf()));
        self.inner.frames_shown.fetch_add(1, Ordering::Relaxed);
    }
}

/// Outcome of one [`PlaybackLoop::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Cancellation was requested before the step did anything.
    Cancelled,
    /// The conversion signal is raised; the step waited one poll interval.
    Paused,
    /// No frames on disk; the step backed off.
    WaitingForFrames,
    /// Frames exist but none could be decoded; the step backed off.
    FillFailed,
    /// This many frames were shown (possibly zero, if interrupted).
    Played(usize),
}

/// The body of the playback thread, one iteration at a time.
///
/// [`PlaybackEngine`] runs this on its own thread. It is public so that a
/// host with its own threading can drive [`step`](PlaybackLoop::step)
/// directly.
pub struct PlaybackLoop {
    resolver: FrameSetResolver,
    buffer: FrameBuffer,
    scheduler: FrameScheduler,
    pause: PauseCoordinator,
    display: SharedDisplay,
    status: PlaybackStatus,
    token: CancellationToken,
    empty_backoff: Duration,
    cached: Option<FrameSet>,
    empty_checks: u64,
}

impl PlaybackLoop {
    /// Build a loop from `options`, reading `signal` and showing frames on
    /// `display`. `token` ends [`run`](PlaybackLoop::run) and cuts sleeps
    /// short.
    pub fn new(
        options: &PlaybackOptions,
        signal: ConversionSignal,
        display: SharedDisplay,
        token: CancellationToken,
    ) -> Self {
        Self::with_status(options, signal, display, token, PlaybackStatus::default())
    }

    fn with_status(
        options: &PlaybackOptions,
        signal: ConversionSignal,
        display: SharedDisplay,
        token: CancellationToken,
        status: PlaybackStatus,
    ) -> Self {
        Self {
            resolver: FrameSetResolver::new(options.frames_directory()),
            buffer: FrameBuffer::new(options.buffer_capacity()),
            scheduler: FrameScheduler::new(options.target_fps()),
            pause: PauseCoordinator::new(signal, options.pause_poll_interval()),
            display,
            status,
            token,
            empty_backoff: options.empty_backoff(),
            cached: None,
            empty_checks: 0,
        }
    }

    /// Diagnostics handle shared with this loop.
    pub fn status(&self) -> PlaybackStatus {
        self.status.clone()
    }

    /// The read-ahead buffer.
    pub fn buffer(&self) -> &FrameBuffer {
        &self.buffer
    }

    /// Discard buffered frames and forget the cached frame set.
    ///
    /// Called when the frame set changes and when a conversion finishes;
    /// the next fill starts from the first frame of whatever is on disk.
    pub fn invalidate(&mut self) {
        self.buffer.reset();
        self.cached = None;
    }

    /// Run one iteration.
    pub fn step(&mut self) -> Step {
        if self.token.is_cancelled() {
            return Step::Cancelled;
        }

        match self.pause.poll() {
            status if status.is_paused() => {
                self.status.set_state(PlaybackState::Paused);
                self.pause.wait();
                return Step::Paused;
            }
            PauseStatus::Resumed => self.invalidate(),
            _ => {}
        }

        let frames = self.resolver.resolve();
        if frames.is_empty() {
            self.status.set_current_frame(None);
            self.status.set_state(PlaybackState::WaitingForFrames);
            self.empty_checks += 1;
            if self.empty_checks == 1 || self.empty_checks % EMPTY_LOG_EVERY == 0 {
                log::info!(
                    "No frames found in {}, waiting ({} checks)",
                    self.resolver.directory().display(),
                    self.empty_checks
                );
            }
            self.token.sleep(self.empty_backoff);
            return Step::WaitingForFrames;
        }

        if self.empty_checks > 0 {
            log::info!("Found {} frames after waiting, resuming playback", frames.len());
            self.empty_checks = 0;
        }

        if self.cached.as_ref() != Some(&frames) {
            if self.cached.is_some() {
                log::info!("Frame set changed ({} frames), restarting playback", frames.len());
                self.invalidate();
            }
            self.cached = Some(frames.clone());
        }

        if let Err(error) = self.buffer.ensure_filled(&frames) {
            log::warn!(
                "{}, retrying in {:.1}s",
                error,
                self.empty_backoff.as_secs_f64()
            );
            self.status.set_state(PlaybackState::WaitingForFrames);
            self.token.sleep(self.empty_backoff);
            return Step::FillFailed;
        }

        self.status.set_state(PlaybackState::Playing);
        self.play_buffered()
    }

    fn play_buffered(&mut self) -> Step {
        let mut shown = 0;

        loop {
            if self.token.is_cancelled() {
                log::debug!("Stop requested during frame batch");
                break;
            }
            if self.pause.poll().is_paused() {
                log::info!("Conversion started mid-batch, interrupting playback");
                break;
            }
            let Some(frame) = self.buffer.next_frame() else {
                break;
            };

            let display = &self.display;
            let status = &self.status;
            self.scheduler.tick(&self.token, || {
                display.lock().show(frame.image());
                status.record_frame(frame.path());
            });
            shown += 1;
        }

        Step::Played(shown)
    }

    /// Step until the token is cancelled.
    pub fn run(mut self) {
        log::info!("Playback loop started");
        while self.step() != Step::Cancelled {}
        self.status.set_current_frame(None);
        self.status.set_state(PlaybackState::Stopped);
        log::info!("Playback loop finished");
    }
}

struct Worker {
    handle: JoinHandle<()>,
    token: CancellationToken,
    done: Receiver<()>,
}

/// Loops the frame directory on a display from a background thread.
///
/// All methods take `&self`, so the engine can be shared (for example in an
/// [`Arc`]) between the code that starts it and the converter that pushes
/// status images through it.
pub struct PlaybackEngine {
    options: PlaybackOptions,
    signal: ConversionSignal,
    display: SharedDisplay,
    renderer: StatusRenderer,
    status: PlaybackStatus,
    lifecycle: Mutex<EngineState>,
    worker: Mutex<Option<Worker>>,
}

impl PlaybackEngine {
    /// Create an engine and initialise `sink`.
    ///
    /// A sink whose `init` fails does not make this fail: the engine runs
    /// headless for its whole lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`FramecastError::InvalidConfiguration`] if `options` do not
    /// validate.
    pub fn new(
        options: PlaybackOptions,
        sink: Box<dyn DisplaySink>,
        signal: ConversionSignal,
    ) -> Result<Self, FramecastError> {
        options.validate()?;

        let (width, height) = options.fallback_size;
        let display = GuardedDisplay::initialise(
            sink,
            DisplaySize::new(width, height),
            options.backlight_percent,
        );
        let renderer = StatusRenderer::new(options.font_path.as_deref(), options.font_size);

        Ok(Self {
            options,
            signal,
            display: Arc::new(Mutex::new(display)),
            renderer,
            status: PlaybackStatus::default(),
            lifecycle: Mutex::new(EngineState::Stopped),
            worker: Mutex::new(None),
        })
    }

    /// The options this engine was built with.
    pub fn options(&self) -> &PlaybackOptions {
        &self.options
    }

    /// Lifecycle state.
    pub fn state(&self) -> EngineState {
        *self.lifecycle.lock()
    }

    /// `true` while the playback thread is alive.
    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .is_some_and(|worker| !worker.handle.is_finished())
    }

    /// `true` while a working display is attached.
    ///
    /// Blocks while a display call is in progress.
    pub fn display_available(&self) -> bool {
        self.display.lock().is_available()
    }

    /// Diagnostics handle: playback state, current frame, frame count.
    pub fn status(&self) -> PlaybackStatus {
        self.status.clone()
    }

    /// The frame most recently handed to the display.
    pub fn current_frame(&self) -> Option<PathBuf> {
        self.status.current_frame()
    }

    fn set_lifecycle(&self, state: EngineState) {
        *self.lifecycle.lock() = state;
    }

    fn lock_display_for(&self, wait: Duration) -> Option<MutexGuard<'_, GuardedDisplay>> {
        let display = self.display.try_lock_for(wait);
        if display.is_none() {
            log::error!(
                "Display still busy after {:.1}s, a sink call appears to be hung",
                wait.as_secs_f64()
            );
        }
        display
    }

    /// Spawn the playback thread and return immediately.
    ///
    /// Does nothing if the thread is already running.
    ///
    /// # Errors
    ///
    /// Returns [`FramecastError::IoError`] if the thread cannot be spawned.
    pub fn start(&self) -> Result<(), FramecastError> {
        let mut worker = self.worker.lock();
        if worker
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
        {
            log::info!("Playback thread already running");
            return Ok(());
        }

        self.set_lifecycle(EngineState::Starting);
        if !self.display.lock().is_available() {
            log::warn!("Display not available, playback thread will not produce images");
        }

        let token = CancellationToken::new();
        let (done_sender, done) = mpsc::channel::<()>();
        let playback = PlaybackLoop::with_status(
            &self.options,
            self.signal.clone(),
            Arc::clone(&self.display),
            token.clone(),
            self.status.clone(),
        );

        let spawned = thread::Builder::new()
            .name("framecast-playback".to_string())
            .spawn(move || {
                // Dropped when the loop returns, which wakes `stop`.
                let _done = done_sender;
                playback.run();
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(error) => {
                self.set_lifecycle(EngineState::Stopped);
                return Err(FramecastError::IoError(error));
            }
        };

        *worker = Some(Worker {
            handle,
            token,
            done,
        });
        self.set_lifecycle(EngineState::Running);
        log::info!("Playback thread started");
        Ok(())
    }

    /// Stop the playback thread and release the display.
    ///
    /// Waits up to the configured join timeout for the thread to exit, then
    /// tears the display down whether or not it did. Safe to call repeatedly
    /// and before [`start`](PlaybackEngine::start).
    ///
    /// If the playback thread is stuck inside a display call the display
    /// cannot be reached; teardown is then skipped with an error logged, and
    /// `stop` still returns shortly after the join timeout.
    pub fn stop(&self) {
        let timeout = self.options.stop_join_timeout();
        let deadline = Instant::now().checked_add(timeout);
        let worker = self.worker.lock().take();

        match worker {
            Some(worker) => {
                self.set_lifecycle(EngineState::Stopping);
                self.status.set_state(PlaybackState::Stopping);
                log::info!("Stopping playback thread");
                worker.token.cancel();

                match worker.done.recv_timeout(timeout) {
                    Err(RecvTimeoutError::Timeout) => {
                        log::warn!(
                            "Playback thread did not stop within {:.1}s, releasing display anyway",
                            timeout.as_secs_f64()
                        );
                    }
                    _ => match worker.handle.join() {
                        Ok(()) => log::info!("Playback thread stopped"),
                        Err(_) => log::error!("Playback thread panicked"),
                    },
                }
            }
            None => log::info!("Stop called but playback thread not running"),
        }

        let wait = deadline
            .map_or(timeout, |deadline| deadline.saturating_duration_since(Instant::now()))
            .max(TEARDOWN_LOCK_GRACE);
        if let Some(mut display) = self.lock_display_for(wait) {
            display.teardown();
        }
        self.set_lifecycle(EngineState::Stopped);
    }

    /// Show the status caption immediately, bypassing the frame buffer.
    ///
    /// Safe to call from any thread, whether or not playback is running.
    /// Does nothing when no display is available, or when the display stays
    /// busy for longer than the stop timeout.
    pub fn show_processing_message(&self) {
        let Some(mut display) = self.lock_display_for(self.options.stop_join_timeout()) else {
            return;
        };
        if !display.is_available() {
            log::debug!("No display, skipping processing message");
            return;
        }

        log::info!("Displaying processing message");
        let size = display.size();
        let image = DynamicImage::ImageRgb8(self.renderer.render(
            size.width,
            size.height,
            &self.options.status_caption,
        ));
        display.show(&image);
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        let display_live = self
            .display
            .try_lock_for(TEARDOWN_LOCK_GRACE)
            .is_some_and(|display| display.is_available());
        if self.worker.lock().is_some() || display_live {
            self.stop();
        }
    }
}
