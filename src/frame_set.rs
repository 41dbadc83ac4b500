//! Frame discovery.
//!
//! The converter writes one PNG per frame into a flat directory, named
//! `frame_0001.png`, `frame_0002.png`, ... with a fixed-width zero-padded
//! index. [`FrameSetResolver`] lists those files and returns them as an
//! ordered [`FrameSet`]; because the indices are zero-padded, lexicographic
//! order is playback order.
//!
//! Two resolutions compare equal only when they list the same paths in the
//! same order. The playback loop uses that equality to notice that a new
//! video has replaced the old one without any explicit event.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const FRAME_PREFIX: &str = "frame_";
const FRAME_EXTENSION: &str = ".png";

/// An ordered, immutable list of frame files.
///
/// Cloning is cheap; the path list is shared. A frame set is never edited in
/// place, a fresh one is resolved on every loop iteration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FrameSet {
    frames: Arc<[PathBuf]>,
}

impl FrameSet {
    /// Build a frame set from paths that are already in playback order.
    pub fn from_paths(frames: Vec<PathBuf>) -> Self {
        Self {
            frames: frames.into(),
        }
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// `true` when no frames were found.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// The frame at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&Path> {
        self.frames.get(index).map(PathBuf::as_path)
    }

    /// Iterate over frame paths in playback order.
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.frames.iter().map(PathBuf::as_path)
    }

    /// All frame paths in playback order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.frames
    }
}

/// Lists the frame files in a directory.
#[derive(Debug, Clone)]
pub struct FrameSetResolver {
    directory: PathBuf,
}

impl FrameSetResolver {
    /// Create a resolver for `directory`.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// The directory being resolved.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Resolve the current frame set.
    ///
    /// Never fails: a missing or unreadable directory, or one without any
    /// matching file, yields an empty set. Entries that vanish while being
    /// listed (the converter clears the directory before writing) are
    /// skipped.
    pub fn resolve(&self) -> FrameSet {
        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(error) => {
                log::debug!(
                    "Cannot list frames in {}: {}",
                    self.directory.display(),
                    error
                );
                return FrameSet::default();
            }
        };

        let mut frames: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_ok_and(|kind| !kind.is_dir()))
            .filter(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| frame_index(name).is_some())
            })
            .map(|entry| entry.path())
            .collect();

        frames.sort();
        FrameSet::from_paths(frames)
    }
}

/// Parse the index out of a frame file name such as `frame_0042.png`.
///
/// Returns `None` for names that do not follow the `frame_<digits>.png`
/// convention.
///
/// ```
/// use framecast::frame_set::frame_index;
///
/// assert_eq!(frame_index("frame_0042.png"), Some(42));
/// assert_eq!(frame_index("frame_.png"), None);
/// assert_eq!(frame_index("thumb_0001.png"), None);
/// ```
pub fn frame_index(file_name: &str) -> Option<u64> {
    let digits = file_name
        .strip_prefix(FRAME_PREFIX)?
        .strip_suffix(FRAME_EXTENSION)?;

    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }

    digits.parse().ok()
}

/// File name the converter gives the frame with the given 1-based index.
///
/// ```
/// use framecast::frame_set::frame_file_name;
///
/// assert_eq!(frame_file_name(7), "frame_0007.png");
/// ```
pub fn frame_file_name(index: u64) -> String {
    format!("{FRAME_PREFIX}{index:04}{FRAME_EXTENSION}")
}
