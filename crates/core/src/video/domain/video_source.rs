use std::fmt;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

use crate::shared::constants::{is_video_extension, VIDEO_EXTENSIONS};

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("unsupported video extension {extension:?}; expected one of {}", VIDEO_EXTENSIONS.join(", "))]
    UnsupportedExtension { extension: String },
    #[error("failed to stage upload: {0}")]
    Io(#[from] io::Error),
}

/// Where a detection session pulls its frames from.
#[derive(Debug)]
pub enum VideoSource {
    Camera { index: u32 },
    File(PathBuf),
    Upload(UploadedVideo),
}

impl VideoSource {
    pub fn is_camera(&self) -> bool {
        matches!(self, VideoSource::Camera { .. })
    }
}

impl fmt::Display for VideoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VideoSource::Camera { index } => write!(f, "camera {index}"),
            VideoSource::File(path) => write!(f, "{}", path.display()),
            VideoSource::Upload(upload) => write!(f, "upload {}", upload.name()),
        }
    }
}

/// A user-supplied video copied into a temporary file.
///
/// The temp file keeps the original extension so container probing works,
/// and is deleted when this value is dropped.
#[derive(Debug)]
pub struct UploadedVideo {
    file: NamedTempFile,
    name: String,
}

impl UploadedVideo {
    /// Copies `reader` into a fresh temp file named after `name`'s extension.
    pub fn stage(name: &str, mut reader: impl Read) -> Result<Self, UploadError> {
        let extension = extension_of(name);
        if !is_video_extension(&extension) {
            return Err(UploadError::UnsupportedExtension { extension });
        }

        let mut file = tempfile::Builder::new()
            .prefix("headcount-")
            .suffix(&format!(".{extension}"))
            .tempfile()?;
        let bytes = io::copy(&mut reader, &mut file)?;
        file.flush()?;
        log::debug!("Staged {name} ({bytes} bytes) at {}", file.path().display());

        Ok(Self {
            file,
            name: name.to_string(),
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, UploadError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = extension_of(&name);
        if !is_video_extension(&extension) {
            return Err(UploadError::UnsupportedExtension { extension });
        }
        Self::stage(&name, File::open(path)?)
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Original file name as supplied by the user.
    pub fn name(&self) -> &str {
        &self.name
    }
}

fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}
