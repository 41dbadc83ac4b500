//! Frame pacing and cooperative cancellation.
//!
//! [`FrameScheduler`] spaces display calls at a fixed interval measured with
//! the monotonic clock. Each [`tick`](FrameScheduler::tick) runs the display
//! callback once and then sleeps for whatever is left of the interval. A tick
//! that overruns is not made up for: the next tick starts immediately and the
//! lost time is simply gone. For an ambient display that loops forever this
//! best-effort cadence is all that is needed.
//!
//! Every sleep in the playback loop goes through [`CancellationToken::sleep`],
//! so a stop request cuts a pacing or backoff wait short.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use framecast::{CancellationToken, FrameScheduler};
//!
//! let scheduler = FrameScheduler::new(50.0);
//! let token = CancellationToken::new();
//!
//! let mut shown = 0;
//! let elapsed = scheduler.tick(&token, || shown += 1);
//!
//! assert_eq!(shown, 1);
//! assert!(elapsed < Duration::from_millis(20));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::configuration::DEFAULT_TARGET_FPS;

/// Cooperative cancellation token.
///
/// Clone it and share it between threads; [`cancel`](CancellationToken::cancel)
/// from any clone is observed by all of them. Unlike a bare flag, a token also
/// wakes any thread currently blocked in [`sleep`](CancellationToken::sleep).
///
/// ```
/// use framecast::CancellationToken;
///
/// let token = CancellationToken::new();
/// assert!(!token.is_cancelled());
///
/// token.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    state: Arc<TokenState>,
}

#[derive(Debug, Default)]
struct TokenState {
    cancelled: AtomicBool,
    lock: Mutex<()>,
    wake: Condvar,
}

impl CancellationToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        Self {
            state: Arc::new(TokenState::default()),
        }
    }

    /// Request cancellation and wake every sleeper.
    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::Release);
        let _guard = self.state.lock.lock();
        self.state.wake.notify_all();
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::Acquire)
    }

    /// Sleep for `duration` unless cancelled first.
    ///
    /// Returns `true` if the token was (or became) cancelled, `false` if the
    /// full duration elapsed. A duration too long to represent as a deadline
    /// sleeps until cancelled.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now().checked_add(duration);
        let mut guard = self.state.lock.lock();

        loop {
            if self.is_cancelled() {
                return true;
            }
            match deadline {
                Some(deadline) if Instant::now() >= deadline => return false,
                Some(deadline) => {
                    self.state.wake.wait_until(&mut guard, deadline);
                }
                None => self.state.wake.wait(&mut guard),
            }
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Paces display calls to a fixed interval.
#[derive(Debug, Clone, Copy)]
pub struct FrameScheduler {
    interval: Duration,
}

impl FrameScheduler {
    /// Create a scheduler for `fps` frames per second.
    ///
    /// A rate whose interval cannot be represented (non-finite, non-positive,
    /// or vanishingly small) falls back to the default 15 fps.
    pub fn new(fps: f64) -> Self {
        let interval = frame_interval(fps).unwrap_or_else(|| {
            log::warn!("Invalid frame rate {fps}, using {DEFAULT_TARGET_FPS}");
            Duration::from_secs_f64(1.0 / DEFAULT_TARGET_FPS)
        });
        Self { interval }
    }

    /// Create a scheduler with an explicit per-frame interval.
    pub fn with_interval(interval: Duration) -> Self {
        Self { interval }
    }

    /// The target time between two display calls.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run `display` once, then sleep out the rest of the interval.
    ///
    /// Returns the time `display` took. When that exceeds the interval no
    /// sleep happens at all. The sleep ends early if `token` is cancelled.
    pub fn tick<F>(&self, token: &CancellationToken, display: F) -> Duration
    where
        F: FnOnce(),
    {
        let started = Instant::now();
        display();
        let elapsed = started.elapsed();

        if let Some(remaining) = self.interval.checked_sub(elapsed) {
            token.sleep(remaining);
        }

        elapsed
    }
}

/// Interval between frames at `fps`, or `None` if `fps` is not a positive
/// rate with a representable interval.
///
/// ```
/// use std::time::Duration;
///
/// use framecast::scheduler::frame_interval;
///
/// assert_eq!(frame_interval(4.0), Some(Duration::from_millis(250)));
/// assert_eq!(frame_interval(0.0), None);
/// assert_eq!(frame_interval(1e-300), None);
/// ```
pub fn frame_interval(fps: f64) -> Option<Duration> {
    if !fps.is_finite() || fps <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(1.0 / fps).ok()
}
