//! Frame discovery tests.

mod common;

use std::fs;

use framecast::frame_set::{frame_file_name, frame_index};
use framecast::{FrameSet, FrameSetResolver};

// ── naming ─────────────────────────────────────────────────────────

#[test]
fn frame_index_accepts_converter_names() {
    assert_eq!(frame_index("frame_0001.png"), Some(1));
    assert_eq!(frame_index("frame_12345.png"), Some(12345));
}

#[test]
fn frame_index_rejects_other_names() {
    for name in [
        "frame_0001.jpg",
        "frame_00a1.png",
        "frame0001.png",
        "Frame_0001.png",
        "frame_0001.png.tmp",
        "frame_.png",
        "",
    ] {
        assert_eq!(frame_index(name), None, "{name} should not match");
    }
}

#[test]
fn frame_file_name_pads_to_four_digits() {
    assert_eq!(frame_file_name(1), "frame_0001.png");
    assert_eq!(frame_file_name(10000), "frame_10000.png");
    assert_eq!(frame_index(&frame_file_name(314)), Some(314));
}

// ── resolution ─────────────────────────────────────────────────────

#[test]
fn resolve_orders_frames_by_index() {
    let dir = tempfile::tempdir().unwrap();
    for index in [3, 1, 12, 2] {
        common::write_png(&dir.path().join(frame_file_name(index)), [0, 0, 0]);
    }

    let frames = FrameSetResolver::new(dir.path()).resolve();
    let names: Vec<String> = frames
        .iter()
        .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();

    assert_eq!(
        names,
        ["frame_0001.png", "frame_0002.png", "frame_0003.png", "frame_0012.png"]
    );
}

#[test]
fn resolve_ignores_unrelated_entries() {
    let dir = tempfile::tempdir().unwrap();
    common::write_frames(dir.path(), 2);
    fs::write(dir.path().join("notes.txt"), "hello").unwrap();
    fs::write(dir.path().join("frame_0003.jpg"), "jpeg").unwrap();
    fs::create_dir(dir.path().join("frame_0004.png")).unwrap();

    let frames = FrameSetResolver::new(dir.path()).resolve();
    assert_eq!(frames.len(), 2);
    assert!(frames.iter().all(|path| path.extension().unwrap() == "png"));
}

#[test]
fn resolve_missing_directory_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let frames = FrameSetResolver::new(dir.path().join("missing")).resolve();
    assert!(frames.is_empty());
    assert_eq!(frames, FrameSet::default());
}

#[test]
fn resolve_is_stable_between_calls() {
    let dir = tempfile::tempdir().unwrap();
    common::write_frames(dir.path(), 5);
    let resolver = FrameSetResolver::new(dir.path());

    assert_eq!(resolver.resolve(), resolver.resolve());
}

#[test]
fn resolve_notices_replaced_frames() {
    let dir = tempfile::tempdir().unwrap();
    common::write_frames(dir.path(), 5);
    let resolver = FrameSetResolver::new(dir.path());
    let before = resolver.resolve();

    common::write_frames(dir.path(), 10);
    let after = resolver.resolve();

    assert_ne!(before, after);
    assert_eq!(after.len(), 10);
    assert_eq!(after.get(0), before.get(0));
}

#[test]
fn frame_set_accessors() {
    let frames = FrameSet::from_paths(vec!["a.png".into(), "b.png".into()]);
    assert_eq!(frames.len(), 2);
    assert_eq!(frames.get(1).unwrap().to_str(), Some("b.png"));
    assert!(frames.get(2).is_none());
    assert_eq!(frames.paths().len(), 2);
}
