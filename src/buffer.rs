//! Read-ahead frame buffer.
//!
//! [`FrameBuffer`] holds a window of decoded frames so the display path never
//! waits on PNG decoding or storage latency mid-tick. A fill loads up to
//! `capacity` frames starting at the buffer's path cursor and wrapping around
//! the end of the [`FrameSet`], so a set shorter than the buffer simply loops
//! inside one fill.
//!
//! The buffer never decides on its own that it is stale. The playback loop
//! calls [`reset`](FrameBuffer::reset) when the frame set changes or a
//! conversion has just finished, and the next fill starts again from the
//! first frame.

use std::path::{Path, PathBuf};

use image::DynamicImage;

use crate::error::FramecastError;
use crate::frame_set::FrameSet;

/// A decoded frame together with the file it came from.
#[derive(Debug, Clone)]
pub struct BufferedFrame {
    path: PathBuf,
    image: DynamicImage,
}

impl BufferedFrame {
    /// The frame file this image was decoded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The decoded image.
    pub fn image(&self) -> &DynamicImage {
        &self.image
    }
}

/// Decode up to `capacity` frames from `frames`, starting at `cursor`.
///
/// Indices wrap modulo the frame-set length. Decoding stops at the first
/// file that fails to decode; that file still counts as visited, so the
/// returned cursor points just past it and the next call moves on instead of
/// retrying the same broken frame.
///
/// Returns the decoded frames and the cursor for the next call. An empty
/// frame set yields no frames and cursor 0.
pub fn load_window(
    frames: &FrameSet,
    cursor: usize,
    capacity: usize,
) -> (Vec<BufferedFrame>, usize) {
    if frames.is_empty() {
        return (Vec::new(), 0);
    }

    let total = frames.len();
    let start = cursor % total;
    let mut loaded = Vec::with_capacity(capacity);
    let mut visited = 0;

    while visited < capacity {
        let index = (start + visited) % total;
        visited += 1;

        // `index` is always in range because of the modulo above.
        let Some(path) = frames.get(index) else {
            break;
        };

        match image::open(path) {
            Ok(image) => loaded.push(BufferedFrame {
                path: path.to_path_buf(),
                image,
            }),
            Err(error) => {
                log::warn!("Skipping frame {}: {}", path.display(), error);
                break;
            }
        }
    }

    (loaded, (start + visited) % total)
}

/// A finite window of decoded frames with a read cursor and a path cursor.
///
/// The read cursor walks the loaded frames; the path cursor remembers where
/// in the frame set the next fill should start.
#[derive(Debug)]
pub struct FrameBuffer {
    capacity: usize,
    frames: Vec<BufferedFrame>,
    read_cursor: usize,
    path_cursor: usize,
    resets: u64,
}

impl FrameBuffer {
    /// Create an empty buffer holding at most `capacity` frames per fill.
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            frames: Vec::with_capacity(capacity),
            read_cursor: 0,
            path_cursor: 0,
            resets: 0,
        }
    }

    /// Maximum number of frames loaded per fill.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of frames loaded by the last fill.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// `true` when nothing is loaded.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// `true` when every loaded frame has been consumed (or none is loaded).
    pub fn is_exhausted(&self) -> bool {
        self.read_cursor >= self.frames.len()
    }

    /// Index of the next frame [`next_frame`](FrameBuffer::next_frame) will return.
    pub fn read_cursor(&self) -> usize {
        self.read_cursor
    }

    /// Position in the frame set where the next fill starts.
    pub fn path_cursor(&self) -> usize {
        self.path_cursor
    }

    /// How many times [`reset`](FrameBuffer::reset) has been called.
    pub fn resets(&self) -> u64 {
        self.resets
    }

    /// Replace the buffer contents with a fresh window from `frames`.
    ///
    /// Returns the number of frames loaded.
    ///
    /// # Errors
    ///
    /// Returns [`FramecastError::NoFrames`] for an empty frame set, which
    /// also rewinds the path cursor. Returns
    /// [`FramecastError::NoFramesDecoded`] when the set has frames but not
    /// one of them could be decoded; the path cursor has still advanced past
    /// the failing file.
    pub fn fill(&mut self, frames: &FrameSet) -> Result<usize, FramecastError> {
        self.frames.clear();
        self.read_cursor = 0;

        if frames.is_empty() {
            self.path_cursor = 0;
            return Err(FramecastError::NoFrames);
        }

        let start = self.path_cursor;
        let (loaded, next_cursor) = load_window(frames, start, self.capacity);
        self.path_cursor = next_cursor;

        if loaded.is_empty() {
            let path = frames
                .get(start % frames.len())
                .map(Path::to_path_buf)
                .unwrap_or_default();
            return Err(FramecastError::NoFramesDecoded { path });
        }

        log::debug!(
            "Buffered {} frame(s) from index {} (next fill at {})",
            loaded.len(),
            start,
            next_cursor
        );
        self.frames = loaded;
        Ok(self.frames.len())
    }

    /// Fill the buffer only if every loaded frame has been consumed.
    ///
    /// Returns the number of frames available to read.
    ///
    /// # Errors
    ///
    /// Same as [`fill`](FrameBuffer::fill).
    pub fn ensure_filled(&mut self, frames: &FrameSet) -> Result<usize, FramecastError> {
        if self.is_exhausted() {
            self.fill(frames)
        } else {
            Ok(self.frames.len() - self.read_cursor)
        }
    }

    /// Consume the next frame. `None` marks the end of the buffer; call
    /// [`ensure_filled`](FrameBuffer::ensure_filled) before reading again.
    pub fn next_frame(&mut self) -> Option<&BufferedFrame> {
        let frame = self.frames.get(self.read_cursor)?;
        self.read_cursor += 1;
        Some(frame)
    }

    /// Drop every loaded frame and rewind both cursors.
    pub fn reset(&mut self) {
        self.frames.clear();
        self.read_cursor = 0;
        self.path_cursor = 0;
        self.resets += 1;
    }
}
