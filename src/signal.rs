//! Conversion signal and pause coordination.
//!
//! The converter owns a [`ConversionSignal`] and raises it while it rewrites
//! the frame directory. The playback loop only ever reads it, through a
//! [`PauseCoordinator`] that turns raw signal values into edges:
//!
//! - rising edge: playback pauses, logged once;
//! - held high: the loop waits, logging a reminder every 20 polls;
//! - falling edge: playback resumes, logged once, and the caller must
//!   invalidate its buffer because the directory now holds a different
//!   video.
//!
//! Raising or lowering the signal notifies waiters, so a paused loop resumes
//! as soon as the conversion ends instead of at the next poll. The poll
//! interval stays in place as a safety net.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// How many held polls pass between "still paused" log lines.
const PAUSE_LOG_EVERY: u64 = 20;

/// A shared "conversion in progress" flag.
///
/// Clones observe and modify the same flag.
///
/// ```
/// use framecast::ConversionSignal;
///
/// let signal = ConversionSignal::new();
/// {
///     let _guard = signal.begin();
///     assert!(signal.is_active());
/// }
/// assert!(!signal.is_active());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConversionSignal {
    state: Arc<SignalState>,
}

#[derive(Debug, Default)]
struct SignalState {
    active: Mutex<bool>,
    changed: Condvar,
}

impl ConversionSignal {
    /// Create a lowered signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag and wake anyone waiting for a change.
    pub fn set(&self, active: bool) {
        let mut guard = self.state.active.lock();
        if *guard != active {
            *guard = active;
            self.state.changed.notify_all();
        }
    }

    /// Raise the flag until the returned guard is dropped.
    ///
    /// The guard lowers the flag on every exit path, including early
    /// returns and panics in the conversion code.
    pub fn begin(&self) -> ConversionGuard {
        self.set(true);
        ConversionGuard {
            signal: self.clone(),
        }
    }

    /// Current value of the flag.
    pub fn is_active(&self) -> bool {
        *self.state.active.lock()
    }

    /// Block until the flag differs from `current` or `timeout` elapses.
    ///
    /// Returns the flag's value on return. A timeout too long to represent
    /// as a deadline waits for the change alone.
    pub fn wait_for_change(&self, current: bool, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut guard = self.state.active.lock();

        while *guard == current {
            match deadline {
                Some(deadline) => {
                    if self.state.changed.wait_until(&mut guard, deadline).timed_out() {
                        break;
                    }
                }
                None => self.state.changed.wait(&mut guard),
            }
        }

        *guard
    }
}

/// Lowers a [`ConversionSignal`] when dropped.
#[derive(Debug)]
#[must_use = "the signal is lowered as soon as the guard is dropped"]
pub struct ConversionGuard {
    signal: ConversionSignal,
}

impl Drop for ConversionGuard {
    fn drop(&mut self) {
        self.signal.set(false);
    }
}

/// What a [`PauseCoordinator::poll`] observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseStatus {
    /// No conversion running; play frames.
    Running,
    /// A conversion just started.
    Entered,
    /// A conversion is still running.
    Held,
    /// A conversion just finished; frames cached before it are stale.
    Resumed,
}

impl PauseStatus {
    /// `true` for [`Entered`](PauseStatus::Entered) and
    /// [`Held`](PauseStatus::Held).
    pub fn is_paused(self) -> bool {
        matches!(self, PauseStatus::Entered | PauseStatus::Held)
    }
}

/// Turns a [`ConversionSignal`] into pause edges for the playback loop.
#[derive(Debug)]
pub struct PauseCoordinator {
    signal: ConversionSignal,
    poll_interval: Duration,
    paused: bool,
    held_polls: u64,
}

impl PauseCoordinator {
    /// Create a coordinator reading `signal`, re-checking it every
    /// `poll_interval` while paused.
    pub fn new(signal: ConversionSignal, poll_interval: Duration) -> Self {
        Self {
            signal,
            poll_interval,
            paused: false,
            held_polls: 0,
        }
    }

    /// Read the signal directly, without edge tracking.
    ///
    /// The playback loop uses [`poll`](PauseCoordinator::poll) even inside
    /// the per-frame path, so that a pause seen there is latched and its
    /// falling edge is not missed.
    pub fn is_paused(&self) -> bool {
        self.signal.is_active()
    }

    /// Read the signal and report the edge, if any, since the last poll.
    pub fn poll(&mut self) -> PauseStatus {
        let active = self.signal.is_active();

        match (self.paused, active) {
            (false, false) => PauseStatus::Running,
            (false, true) => {
                log::info!("Conversion in progress, pausing playback");
                self.paused = true;
                self.held_polls = 0;
                PauseStatus::Entered
            }
            (true, true) => {
                self.held_polls += 1;
                if self.held_polls % PAUSE_LOG_EVERY == 0 {
                    let waited = self.poll_interval.as_secs_f64() * self.held_polls as f64;
                    log::info!("Still paused for conversion ({waited:.1}s)");
                }
                PauseStatus::Held
            }
            (true, false) => {
                log::info!("Conversion finished, resuming playback");
                self.paused = false;
                self.held_polls = 0;
                PauseStatus::Resumed
            }
        }
    }

    /// Wait up to one poll interval for the signal to drop.
    ///
    /// Returns early when the signal is lowered.
    pub fn wait(&self) {
        self.signal.wait_for_change(true, self.poll_interval);
    }
}
