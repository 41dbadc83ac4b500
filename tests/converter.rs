//! Frame converter tests.
//!
//! The converter program is replaced by `true` and `false` so no video
//! tooling is needed.

mod common;

use std::ffi::OsString;
use std::fs;
use std::path::Path;

use framecast::converter::clear_frames;
use framecast::{ConversionSignal, FrameConverter, FramecastError};

fn fake_video(dir: &Path) -> std::path::PathBuf {
    let video = dir.join("clip.mp4");
    fs::write(&video, b"video").unwrap();
    video
}

#[test]
fn arguments_match_playback_format() {
    let converter = FrameConverter::new().with_size(240, 135).with_fps(12);
    let arguments = converter.arguments(Path::new("in.mp4"), Path::new("frames"));

    let expected: Vec<OsString> = [
        "-y",
        "-i",
        "in.mp4",
        "-vf",
        "scale=240:135",
        "-r",
        "12",
        "frames/frame_%04d.png",
    ]
    .into_iter()
    .map(OsString::from)
    .collect();
    assert_eq!(arguments, expected);
}

#[test]
fn missing_video_is_rejected_before_clearing() {
    let dir = tempfile::tempdir().unwrap();
    let frames = dir.path().join("frames");
    common::write_frames(&frames, 2);
    let signal = ConversionSignal::new();

    let result = FrameConverter::new().convert(&dir.path().join("none.mp4"), &frames, &signal, None);

    assert!(matches!(result, Err(FramecastError::VideoNotFound(_))));
    assert_eq!(fs::read_dir(&frames).unwrap().count(), 2);
}

#[cfg(unix)]
#[test]
fn successful_conversion_clears_old_frames() {
    let dir = tempfile::tempdir().unwrap();
    let frames = dir.path().join("frames");
    common::write_frames(&frames, 3);
    fs::create_dir(frames.join("keep")).unwrap();
    let video = fake_video(dir.path());
    let signal = ConversionSignal::new();

    let count = FrameConverter::new()
        .with_program("true")
        .convert(&video, &frames, &signal, None)
        .unwrap();

    assert_eq!(count, 0);
    assert!(frames.join("keep").is_dir());
    assert!(!signal.is_active());
}

#[cfg(unix)]
#[test]
fn failed_conversion_lowers_signal() {
    let dir = tempfile::tempdir().unwrap();
    let video = fake_video(dir.path());
    let signal = ConversionSignal::new();

    let result = FrameConverter::new().with_program("false").convert(
        &video,
        &dir.path().join("frames"),
        &signal,
        None,
    );

    assert!(matches!(result, Err(FramecastError::ConversionFailed { .. })));
    assert!(!signal.is_active());
}

#[test]
fn unknown_program_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let video = fake_video(dir.path());
    let signal = ConversionSignal::new();

    let result = FrameConverter::new()
        .with_program(dir.path().join("no-such-converter"))
        .convert(&video, &dir.path().join("frames"), &signal, None);

    assert!(matches!(result, Err(FramecastError::ConverterNotFound(_))));
    assert!(!signal.is_active());
}

#[test]
fn clear_frames_creates_directory() {
    let dir = tempfile::tempdir().unwrap();
    let frames = dir.path().join("a").join("frames");

    clear_frames(&frames).unwrap();

    assert!(frames.is_dir());
    assert_eq!(fs::read_dir(&frames).unwrap().count(), 0);
}
