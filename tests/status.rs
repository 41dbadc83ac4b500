//! Status image tests.

use std::path::Path;

use framecast::status::{blank_image, load_font};
use framecast::{FramecastError, StatusRenderer};

#[test]
fn blank_image_is_black() {
    let image = blank_image(10, 6).to_rgb8();
    assert_eq!(image.dimensions(), (10, 6));
    assert!(image.pixels().all(|pixel| pixel.0 == [0, 0, 0]));
}

#[test]
fn blank_image_never_zero_sized() {
    assert_eq!(blank_image(0, 0).to_rgb8().dimensions(), (1, 1));
}

#[test]
fn render_without_font_is_background_only() {
    let renderer = StatusRenderer::new(None, 20.0);
    assert!(!renderer.has_font());

    let image = renderer.render(320, 240, "Processing...");
    assert_eq!(image.dimensions(), (320, 240));
    assert!(image.pixels().all(|pixel| pixel.0 == [0, 0, 0]));
}

#[test]
fn missing_font_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let renderer = StatusRenderer::new(Some(dir.path().join("missing.ttf").as_path()), 20.0);
    assert!(!renderer.has_font());
    assert_eq!(renderer.render(16, 16, "x").dimensions(), (16, 16));
}

#[test]
fn invalid_font_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.ttf");
    std::fs::write(&path, b"not a font").unwrap();

    assert!(matches!(load_font(&path), Err(FramecastError::FontLoad { .. })));
}

#[test]
fn caption_is_drawn_when_font_available() {
    // Only runs where the usual system font is installed.
    let path = Path::new(framecast::configuration::DEFAULT_FONT_PATH);
    if !path.exists() {
        return;
    }

    let renderer = StatusRenderer::new(Some(path), 20.0);
    assert!(renderer.has_font());

    let image = renderer.render(320, 240, "Processing...");
    assert!(image.pixels().any(|pixel| pixel.0 != [0, 0, 0]));
    assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0]);
    assert_eq!(image.get_pixel(160, 0).0, [0, 0, 0]);
}
