//! Status images.
//!
//! While a video is being converted the display shows a solid background with
//! a centred caption instead of frames. [`StatusRenderer`] draws that image
//! with a TrueType font rasterised by `fontdue`. Without a usable font it
//! still produces the background, so the panel at least stops showing the old
//! video.

use std::fs;
use std::path::Path;

use fontdue::{Font, FontSettings};
use image::{DynamicImage, Rgb, RgbImage};

use crate::error::FramecastError;

const BACKGROUND: Rgb<u8> = Rgb([0, 0, 0]);
const FOREGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// An all-black frame, shown during teardown.
pub fn blank_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width.max(1), height.max(1), BACKGROUND))
}

/// Load a TrueType or OpenType font from disk.
///
/// # Errors
///
/// Returns [`FramecastError::FontLoad`] if the file cannot be read or parsed.
pub fn load_font(path: &Path) -> Result<Font, FramecastError> {
    let bytes = fs::read(path).map_err(|error| FramecastError::FontLoad {
        path: path.to_path_buf(),
        reason: error.to_string(),
    })?;

    Font::from_bytes(bytes, FontSettings::default()).map_err(|reason| FramecastError::FontLoad {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    })
}

/// Draws captioned status images.
pub struct StatusRenderer {
    font: Option<Font>,
    size_px: f32,
}

impl std::fmt::Debug for StatusRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusRenderer")
            .field("has_font", &self.font.is_some())
            .field("size_px", &self.size_px)
            .finish()
    }
}

impl StatusRenderer {
    /// Create a renderer, loading the font at `font_path` if one is given.
    ///
    /// A font that fails to load is logged and the renderer falls back to
    /// caption-less images.
    pub fn new(font_path: Option<&Path>, size_px: f32) -> Self {
        let font = font_path.and_then(|path| match load_font(path) {
            Ok(font) => Some(font),
            Err(error) => {
                log::warn!("{error}; status images will have no caption");
                None
            }
        });

        Self { font, size_px }
    }

    /// Create a renderer around an already loaded font.
    pub fn with_font(font: Font, size_px: f32) -> Self {
        Self {
            font: Some(font),
            size_px,
        }
    }

    /// `true` if captions will be drawn.
    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Render `caption` centred on a `width` × `height` background.
    pub fn render(&self, width: u32, height: u32, caption: &str) -> RgbImage {
        let mut canvas = RgbImage::from_pixel(width.max(1), height.max(1), BACKGROUND);
        if let Some(font) = &self.font {
            draw_centered(&mut canvas, font, self.size_px, caption);
        }
        canvas
    }
}

fn draw_centered(canvas: &mut RgbImage, font: &Font, size_px: f32, caption: &str) {
    let (ascent, descent) = font
        .horizontal_line_metrics(size_px)
        .map(|metrics| (metrics.ascent, metrics.descent))
        .unwrap_or((size_px * 0.8, -size_px * 0.2));

    let text_width: f32 = caption
        .chars()
        .map(|character| font.metrics(character, size_px).advance_width)
        .sum();
    let text_height = ascent - descent;

    let mut pen_x = ((canvas.width() as f32 - text_width) / 2.0).round() as i32;
    let top = ((canvas.height() as f32 - text_height) / 2.0).round() as i32;
    let baseline = top + ascent.round() as i32;

    for character in caption.chars() {
        let (metrics, coverage) = font.rasterize(character, size_px);
        let glyph_left = pen_x + metrics.xmin;
        let glyph_top = baseline - (metrics.ymin + metrics.height as i32);

        for row in 0..metrics.height {
            for column in 0..metrics.width {
                let alpha = coverage[row * metrics.width + column];
                if alpha == 0 {
                    continue;
                }
                let x = glyph_left + column as i32;
                let y = glyph_top + row as i32;
                if x < 0 || y < 0 || x >= canvas.width() as i32 || y >= canvas.height() as i32 {
                    continue;
                }
                let pixel = canvas.get_pixel_mut(x as u32, y as u32);
                *pixel = blend(*pixel, FOREGROUND, alpha);
            }
        }

        pen_x += metrics.advance_width.round() as i32;
    }
}

fn blend(background: Rgb<u8>, foreground: Rgb<u8>, alpha: u8) -> Rgb<u8> {
    let alpha = u16::from(alpha);
    let mix = |bg: u8, fg: u8| -> u8 {
        ((u16::from(bg) * (255 - alpha) + u16::from(fg) * alpha) / 255) as u8
    };
    Rgb([
        mix(background[0], foreground[0]),
        mix(background[1], foreground[1]),
        mix(background[2], foreground[2]),
    ])
}
