//! Conversion signal and pause coordination tests.

use std::thread;
use std::time::{Duration, Instant};

use framecast::{ConversionSignal, PauseCoordinator, PauseStatus};

// ── ConversionSignal ───────────────────────────────────────────────

#[test]
fn guard_lowers_signal_on_drop() {
    let signal = ConversionSignal::new();
    let guard = signal.begin();
    assert!(signal.clone().is_active());
    drop(guard);
    assert!(!signal.is_active());
}

#[test]
fn guard_lowers_signal_on_early_return() {
    fn failing_conversion(signal: &ConversionSignal) -> Result<(), &'static str> {
        let _guard = signal.begin();
        Err("converter crashed")
    }

    let signal = ConversionSignal::new();
    assert!(failing_conversion(&signal).is_err());
    assert!(!signal.is_active());
}

#[test]
fn wait_for_change_times_out() {
    let signal = ConversionSignal::new();
    signal.set(true);
    let started = Instant::now();

    assert!(signal.wait_for_change(true, Duration::from_millis(40)));
    assert!(started.elapsed() >= Duration::from_millis(40));
}

#[test]
fn wait_for_change_wakes_on_lower() {
    let signal = ConversionSignal::new();
    signal.set(true);
    let converter = signal.clone();
    let started = Instant::now();

    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        converter.set(false);
    });

    assert!(!signal.wait_for_change(true, Duration::from_secs(10)));
    assert!(started.elapsed() < Duration::from_secs(5));
    handle.join().unwrap();
}

#[test]
fn wait_for_change_accepts_unbounded_timeout() {
    let signal = ConversionSignal::new();
    let converter = signal.clone();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        converter.set(true);
    });

    assert!(signal.wait_for_change(false, Duration::MAX));
    handle.join().unwrap();
}

#[test]
fn wait_for_change_returns_at_once_when_already_different() {
    let signal = ConversionSignal::new();
    let started = Instant::now();
    assert!(!signal.wait_for_change(true, Duration::from_secs(10)));
    assert!(started.elapsed() < Duration::from_secs(1));
}

// ── PauseCoordinator ───────────────────────────────────────────────

#[test]
fn poll_reports_edges() {
    let signal = ConversionSignal::new();
    let mut pause = PauseCoordinator::new(signal.clone(), Duration::from_millis(10));

    assert_eq!(pause.poll(), PauseStatus::Running);

    signal.set(true);
    assert_eq!(pause.poll(), PauseStatus::Entered);
    assert_eq!(pause.poll(), PauseStatus::Held);
    assert_eq!(pause.poll(), PauseStatus::Held);

    signal.set(false);
    assert_eq!(pause.poll(), PauseStatus::Resumed);
    assert_eq!(pause.poll(), PauseStatus::Running);
}

#[test]
fn resumed_is_reported_once_per_conversion() {
    let signal = ConversionSignal::new();
    let mut pause = PauseCoordinator::new(signal.clone(), Duration::from_millis(10));

    for _ in 0..2 {
        {
            let _guard = signal.begin();
            assert!(pause.poll().is_paused());
        }
        let statuses: Vec<PauseStatus> = (0..3).map(|_| pause.poll()).collect();
        assert_eq!(
            statuses.iter().filter(|status| **status == PauseStatus::Resumed).count(),
            1
        );
    }
}

#[test]
fn is_paused_reads_signal_directly() {
    let signal = ConversionSignal::new();
    let pause = PauseCoordinator::new(signal.clone(), Duration::from_millis(10));

    assert!(!pause.is_paused());
    signal.set(true);
    assert!(pause.is_paused());
}

#[test]
fn wait_returns_when_conversion_ends() {
    let signal = ConversionSignal::new();
    let pause = PauseCoordinator::new(signal.clone(), Duration::from_secs(10));
    let guard = signal.begin();
    let started = Instant::now();

    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        drop(guard);
    });

    pause.wait();
    assert!(started.elapsed() < Duration::from_secs(5));
    handle.join().unwrap();
}
