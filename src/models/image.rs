//! Image file references produced by directory discovery.

use std::path::{Path, PathBuf};

/// Image formats accepted for annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    /// Match a file extension (without the dot), ignoring case.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            _ => None,
        }
    }

    /// MIME type used in the data URI sent to the inference service.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }
}

/// A candidate image file found under the scan root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageReference {
    path: PathBuf,
    extension: String,
    format: ImageFormat,
}

impl ImageReference {
    /// Build a reference if the path has an eligible extension.
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        let format = ImageFormat::from_extension(&extension)?;
        Some(Self {
            path,
            extension,
            format,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lowercase extension, without the leading dot.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// The path as stored in both sinks.
    pub fn file_path(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}
