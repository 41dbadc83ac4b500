//! Uploaded video library.
//!
//! [`VideoLibrary`] manages the directory uploaded videos are stored in, and
//! remembers two names across restarts in flat one-line text files: the
//! video played last and the video chosen as the default. At start-up the
//! default wins if it still exists, otherwise the last-played video.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::FramecastError;

/// Extensions accepted as uploaded videos, compared case-insensitively.
pub const ALLOWED_EXTENSIONS: &[&str] = &["mp4"];

const LAST_PLAYED_FILE: &str = "last_played.txt";
const DEFAULT_VIDEO_FILE: &str = "default_video.txt";

/// `true` if `name` has one of the [`ALLOWED_EXTENSIONS`].
///
/// ```
/// use framecast::library::is_allowed_video;
///
/// assert!(is_allowed_video("clip.MP4"));
/// assert!(!is_allowed_video("clip.mov"));
/// assert!(!is_allowed_video("mp4"));
/// ```
pub fn is_allowed_video(name: &str) -> bool {
    name.rsplit_once('.').is_some_and(|(stem, extension)| {
        !stem.is_empty()
            && ALLOWED_EXTENSIONS
                .iter()
                .any(|allowed| extension.eq_ignore_ascii_case(allowed))
    })
}

/// The uploads directory plus the last-played and default state files.
#[derive(Debug, Clone)]
pub struct VideoLibrary {
    uploads_directory: PathBuf,
    state_directory: PathBuf,
}

impl VideoLibrary {
    /// Create a library over `uploads_directory`, keeping state files in
    /// `state_directory`.
    pub fn new(uploads_directory: impl Into<PathBuf>, state_directory: impl Into<PathBuf>) -> Self {
        Self {
            uploads_directory: uploads_directory.into(),
            state_directory: state_directory.into(),
        }
    }

    /// The uploads directory.
    pub fn uploads_directory(&self) -> &Path {
        &self.uploads_directory
    }

    /// Create the uploads and state directories if they are missing.
    pub fn ensure_directories(&self) -> Result<(), FramecastError> {
        fs::create_dir_all(&self.uploads_directory)?;
        fs::create_dir_all(&self.state_directory)?;
        Ok(())
    }

    /// Names of the uploaded videos, sorted. A missing uploads directory
    /// lists as empty.
    pub fn list(&self) -> Result<Vec<String>, FramecastError> {
        let entries = match fs::read_dir(&self.uploads_directory) {
            Ok(entries) => entries,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(error.into()),
        };

        let mut videos = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if is_allowed_video(name) {
                    videos.push(name.to_string());
                }
            }
        }

        videos.sort();
        Ok(videos)
    }

    /// Full path of the uploaded video `name`.
    ///
    /// # Errors
    ///
    /// Returns [`FramecastError::UnsupportedVideoFormat`] for names that are
    /// not plain file names or lack an allowed extension, and
    /// [`FramecastError::VideoNotFound`] if the file does not exist.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, FramecastError> {
        let is_plain = !name.is_empty()
            && Path::new(name).file_name().and_then(|file| file.to_str()) == Some(name);
        if !is_plain || !is_allowed_video(name) {
            return Err(FramecastError::UnsupportedVideoFormat(name.to_string()));
        }

        let path = self.uploads_directory.join(name);
        if !path.is_file() {
            return Err(FramecastError::VideoNotFound(path));
        }
        Ok(path)
    }

    /// Delete the uploaded video `name`, clearing any state file naming it.
    pub fn delete(&self, name: &str) -> Result<(), FramecastError> {
        let path = self.resolve(name)?;
        fs::remove_file(&path)?;
        log::info!("Deleted {}", path.display());

        if self.default_video().as_deref() == Some(name) {
            self.clear_default_video()?;
        }
        if self.last_played().as_deref() == Some(name) {
            self.remove_state(LAST_PLAYED_FILE)?;
        }
        Ok(())
    }

    /// The video played most recently, if recorded.
    pub fn last_played(&self) -> Option<String> {
        self.read_state(LAST_PLAYED_FILE)
    }

    /// Record `name` as the video played most recently.
    pub fn set_last_played(&self, name: &str) -> Result<(), FramecastError> {
        self.write_state(LAST_PLAYED_FILE, name)
    }

    /// The default video, if one was chosen.
    pub fn default_video(&self) -> Option<String> {
        self.read_state(DEFAULT_VIDEO_FILE)
    }

    /// Choose `name` as the default video. It must exist in the library.
    pub fn set_default_video(&self, name: &str) -> Result<(), FramecastError> {
        self.resolve(name)?;
        self.write_state(DEFAULT_VIDEO_FILE, name)
    }

    /// Forget the default video.
    pub fn clear_default_video(&self) -> Result<(), FramecastError> {
        self.remove_state(DEFAULT_VIDEO_FILE)
    }

    /// The video to play at start-up: the default if it still exists,
    /// otherwise the last-played video if that still exists.
    pub fn startup_video(&self) -> Option<String> {
        [self.default_video(), self.last_played()]
            .into_iter()
            .flatten()
            .find(|name| self.resolve(name).is_ok())
    }

    fn read_state(&self, file: &str) -> Option<String> {
        let path = self.state_directory.join(file);
        match fs::read_to_string(&path) {
            Ok(contents) => {
                let name = contents.trim();
                (!name.is_empty()).then(|| name.to_string())
            }
            Err(error) if error.kind() == ErrorKind::NotFound => None,
            Err(error) => {
                log::warn!("Cannot read {}: {}", path.display(), error);
                None
            }
        }
    }

    fn write_state(&self, file: &str, name: &str) -> Result<(), FramecastError> {
        fs::create_dir_all(&self.state_directory)?;
        fs::write(self.state_directory.join(file), format!("{name}\n"))?;
        Ok(())
    }

    fn remove_state(&self, file: &str) -> Result<(), FramecastError> {
        match fs::remove_file(self.state_directory.join(file)) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }
}
