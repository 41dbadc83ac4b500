//! Linux framebuffer display.
//!
//! Small SPI panels on single-board computers are usually exposed by the
//! kernel as a framebuffer device (`/dev/fb1` for an `fbtft` panel) with its
//! geometry in sysfs, and their backlight under `/sys/class/backlight`.
//! [`FramebufferDisplay`] drives such a panel with plain file writes: no
//! ioctls, no memory mapping, no vendor library.
//!
//! Supported pixel layouts are 16 bpp RGB565 and 32 bpp XRGB8888, both
//! little-endian. Frames of a different size are scaled to the panel.

use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use image::{DynamicImage, imageops::FilterType};

use crate::display::{DisplaySink, DisplaySize};
use crate::error::FramecastError;

const GRAPHICS_CLASS: &str = "/sys/class/graphics";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Geometry {
    width: u32,
    height: u32,
    bytes_per_pixel: u32,
    stride: u32,
}

impl Geometry {
    fn frame_len(&self) -> usize {
        self.stride as usize * self.height as usize
    }
}

/// A [`DisplaySink`] writing to a Linux framebuffer device.
///
/// # Example
///
/// ```no_run
/// use framecast::{DisplaySink, FramebufferDisplay};
///
/// let mut panel = FramebufferDisplay::new("/dev/fb1")
///     .with_backlight("/sys/class/backlight/soc:backlight");
/// let size = panel.init()?;
/// println!("panel size: {size:?}");
/// # Ok::<(), framecast::FramecastError>(())
/// ```
#[derive(Debug)]
pub struct FramebufferDisplay {
    device: PathBuf,
    sysfs_dir: PathBuf,
    backlight_dir: Option<PathBuf>,
    file: Option<File>,
    geometry: Option<Geometry>,
    max_brightness: u32,
}

impl FramebufferDisplay {
    /// Create a sink for `device`. The sysfs directory is derived from the
    /// device name (`/dev/fb1` → `/sys/class/graphics/fb1`).
    pub fn new(device: impl Into<PathBuf>) -> Self {
        let device = device.into();
        let sysfs_dir = device
            .file_name()
            .map(|name| Path::new(GRAPHICS_CLASS).join(name))
            .unwrap_or_else(|| PathBuf::from(GRAPHICS_CLASS).join("fb0"));

        Self {
            device,
            sysfs_dir,
            backlight_dir: None,
            file: None,
            geometry: None,
            max_brightness: 100,
        }
    }

    /// Read the geometry from `directory` instead of the derived sysfs path.
    #[must_use]
    pub fn with_sysfs_dir(mut self, directory: impl Into<PathBuf>) -> Self {
        self.sysfs_dir = directory.into();
        self
    }

    /// Control the backlight through a `/sys/class/backlight/<name>`
    /// directory.
    #[must_use]
    pub fn with_backlight(mut self, directory: impl Into<PathBuf>) -> Self {
        self.backlight_dir = Some(directory.into());
        self
    }

    fn read_geometry(&self) -> Result<Geometry, FramecastError> {
        let virtual_size = read_sysfs(&self.sysfs_dir.join("virtual_size"))?;
        let (width, height) = virtual_size
            .split_once(',')
            .and_then(|(w, h)| Some((w.trim().parse().ok()?, h.trim().parse().ok()?)))
            .ok_or_else(|| {
                FramecastError::DisplayUnavailable(format!(
                    "unreadable framebuffer size '{virtual_size}'"
                ))
            })?;

        let bits_per_pixel: u32 = read_sysfs(&self.sysfs_dir.join("bits_per_pixel"))?
            .parse()
            .map_err(|_| {
                FramecastError::DisplayUnavailable("unreadable bits_per_pixel".to_string())
            })?;

        if bits_per_pixel != 16 && bits_per_pixel != 32 {
            return Err(FramecastError::DisplayUnavailable(format!(
                "unsupported framebuffer depth {bits_per_pixel} bpp"
            )));
        }
        let bytes_per_pixel = bits_per_pixel / 8;

        // Drivers that pad rows publish the real line length as `stride`.
        let stride = read_sysfs(&self.sysfs_dir.join("stride"))
            .ok()
            .and_then(|value| value.parse().ok())
            .filter(|&stride: &u32| stride >= width * bytes_per_pixel)
            .unwrap_or(width * bytes_per_pixel);

        Ok(Geometry {
            width,
            height,
            bytes_per_pixel,
            stride,
        })
    }

    fn write_frame(&mut self, bytes: &[u8]) -> Result<(), FramecastError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| FramecastError::display_operation("write", "device not open"))?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(bytes)?;
        file.flush()?;
        Ok(())
    }

    fn geometry(&self) -> Result<Geometry, FramecastError> {
        self.geometry
            .ok_or_else(|| FramecastError::display_operation("write", "display not initialised"))
    }
}

impl DisplaySink for FramebufferDisplay {
    fn name(&self) -> &str {
        "framebuffer"
    }

    fn init(&mut self) -> Result<Option<DisplaySize>, FramecastError> {
        let geometry = self.read_geometry()?;
        let file = OpenOptions::new()
            .write(true)
            .open(&self.device)
            .map_err(|error| {
                FramecastError::DisplayUnavailable(format!(
                    "cannot open {}: {}",
                    self.device.display(),
                    error
                ))
            })?;

        if let Some(directory) = &self.backlight_dir {
            match read_sysfs(&directory.join("max_brightness")).map(|value| value.parse::<u32>()) {
                Ok(Ok(max)) if max > 0 => self.max_brightness = max,
                _ => log::warn!(
                    "No max_brightness under {}, assuming 100",
                    directory.display()
                ),
            }
        }

        log::debug!(
            "Framebuffer {} is {}x{} at {} bpp (stride {})",
            self.device.display(),
            geometry.width,
            geometry.height,
            geometry.bytes_per_pixel * 8,
            geometry.stride
        );

        self.file = Some(file);
        self.geometry = Some(geometry);
        Ok(Some(DisplaySize::new(geometry.width, geometry.height)))
    }

    fn show_image(&mut self, image: &DynamicImage) -> Result<(), FramecastError> {
        let geometry = self.geometry()?;
        let bytes = encode_frame(image, geometry);
        self.write_frame(&bytes)
    }

    fn set_backlight(&mut self, percent: u8) -> Result<(), FramecastError> {
        let directory = self
            .backlight_dir
            .as_ref()
            .ok_or(FramecastError::UnsupportedOperation("set_backlight"))?;
        let level = u32::from(percent.min(100)) * self.max_brightness / 100;
        fs::write(directory.join("brightness"), level.to_string())?;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), FramecastError> {
        let geometry = self.geometry()?;
        let zeros = vec![0_u8; geometry.frame_len()];
        self.write_frame(&zeros)
    }

    fn teardown(&mut self) -> Result<(), FramecastError> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
        }
        self.geometry = None;
        Ok(())
    }
}

fn read_sysfs(path: &Path) -> Result<String, FramecastError> {
    fs::read_to_string(path)
        .map(|value| value.trim().to_string())
        .map_err(|error| {
            FramecastError::DisplayUnavailable(format!("cannot read {}: {}", path.display(), error))
        })
}

fn encode_frame(image: &DynamicImage, geometry: Geometry) -> Vec<u8> {
    let rgb = if image.width() == geometry.width && image.height() == geometry.height {
        image.to_rgb8()
    } else {
        image
            .resize_exact(geometry.width, geometry.height, FilterType::Triangle)
            .to_rgb8()
    };

    let mut bytes = vec![0_u8; geometry.frame_len()];
    for (y, row) in rgb.rows().enumerate() {
        let line = &mut bytes[y * geometry.stride as usize..];
        for (x, pixel) in row.enumerate() {
            let [r, g, b] = pixel.0;
            let offset = x * geometry.bytes_per_pixel as usize;
            if geometry.bytes_per_pixel == 2 {
                let packed =
                    (u16::from(r >> 3) << 11) | (u16::from(g >> 2) << 5) | u16::from(b >> 3);
                line[offset..offset + 2].copy_from_slice(&packed.to_le_bytes());
            } else {
                line[offset..offset + 4].copy_from_slice(&[b, g, r, 0xFF]);
            }
        }
    }
    bytes
}
