//! Frame pacing and cancellation tests.

use std::thread;
use std::time::{Duration, Instant};

use framecast::{CancellationToken, FrameScheduler};

// ── CancellationToken ──────────────────────────────────────────────

#[test]
fn token_clones_share_state() {
    let token = CancellationToken::new();
    let clone = token.clone();
    clone.cancel();
    assert!(token.is_cancelled());
}

#[test]
fn sleep_runs_full_duration_when_not_cancelled() {
    let token = CancellationToken::new();
    let started = Instant::now();
    assert!(!token.sleep(Duration::from_millis(30)));
    assert!(started.elapsed() >= Duration::from_millis(30));
}

#[test]
fn cancel_wakes_sleeper() {
    let token = CancellationToken::new();
    let sleeper = token.clone();
    let started = Instant::now();

    let handle = thread::spawn(move || sleeper.sleep(Duration::from_secs(10)));
    thread::sleep(Duration::from_millis(50));
    token.cancel();

    assert!(handle.join().unwrap());
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn sleep_after_cancel_returns_immediately() {
    let token = CancellationToken::new();
    token.cancel();
    let started = Instant::now();
    assert!(token.sleep(Duration::from_secs(10)));
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[test]
fn unbounded_sleep_ends_on_cancel() {
    let token = CancellationToken::new();
    let canceller = token.clone();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        canceller.cancel();
    });

    assert!(token.sleep(Duration::MAX));
    handle.join().unwrap();
}

// ── FrameScheduler ─────────────────────────────────────────────────

#[test]
fn interval_from_fps() {
    assert_eq!(FrameScheduler::new(10.0).interval(), Duration::from_millis(100));
}

#[test]
fn invalid_fps_falls_back() {
    let expected = FrameScheduler::new(15.0).interval();
    assert_eq!(FrameScheduler::new(0.0).interval(), expected);
    assert_eq!(FrameScheduler::new(-3.0).interval(), expected);
    assert_eq!(FrameScheduler::new(f64::NAN).interval(), expected);
    assert_eq!(FrameScheduler::new(1e-300).interval(), expected);
    assert_eq!(FrameScheduler::new(f64::MIN_POSITIVE).interval(), expected);
}

#[test]
fn ticks_are_paced() {
    let scheduler = FrameScheduler::with_interval(Duration::from_millis(40));
    let token = CancellationToken::new();
    let started = Instant::now();

    for _ in 0..3 {
        scheduler.tick(&token, || {});
    }

    assert!(started.elapsed() >= Duration::from_millis(120));
}

#[test]
fn overrunning_tick_does_not_sleep() {
    let scheduler = FrameScheduler::with_interval(Duration::from_millis(10));
    let token = CancellationToken::new();
    let started = Instant::now();

    let elapsed = scheduler.tick(&token, || thread::sleep(Duration::from_millis(60)));

    assert!(elapsed >= Duration::from_millis(60));
    // No catch-up sleep and no compensation on top of the overrun.
    assert!(started.elapsed() < Duration::from_millis(500));
}

#[test]
fn cancelled_tick_still_displays_once() {
    let scheduler = FrameScheduler::with_interval(Duration::from_secs(10));
    let token = CancellationToken::new();
    token.cancel();

    let mut shown = 0;
    let started = Instant::now();
    scheduler.tick(&token, || shown += 1);

    assert_eq!(shown, 1);
    assert!(started.elapsed() < Duration::from_secs(1));
}
