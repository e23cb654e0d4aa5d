//! Image discovery: recursive scan of a root directory for annotatable files.
//!
//! The scan is lazy. Entries that cannot be read (permission errors, broken
//! links, vanished files) are logged and skipped so that siblings are still
//! visited. Only an invalid root is an error.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::models::ImageReference;

/// Errors raised before a scan can start.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("image root does not exist: {0}")]
    NotFound(PathBuf),

    #[error("image root is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("cannot read image root {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Lazily walks a directory tree, yielding eligible images.
pub struct ImageLocator {
    root: PathBuf,
    walker: walkdir::IntoIter,
}

impl ImageLocator {
    /// Validate `root` and prepare a scan.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, DiscoveryError> {
        let root = root.as_ref().to_path_buf();
        let metadata = std::fs::metadata(&root).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                DiscoveryError::NotFound(root.clone())
            } else {
                DiscoveryError::Io {
                    path: root.clone(),
                    source,
                }
            }
        })?;
        if !metadata.is_dir() {
            return Err(DiscoveryError::NotADirectory(root));
        }

        debug!("Scanning {} for images", root.display());
        let walker = WalkDir::new(&root).follow_links(false).into_iter();
        Ok(Self { root, walker })
    }
}

impl Iterator for ImageLocator {
    type Item = ImageReference;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| self.root.display().to_string());
                    warn!("Skipping unreadable entry {}: {}", path, e);
                    continue;
                }
            };

            if entry.path_is_symlink() {
                // Linked files count; linked directories are never descended.
                match std::fs::metadata(entry.path()) {
                    Ok(target) if target.is_file() => {}
                    Ok(_) => continue,
                    Err(e) => {
                        warn!("Skipping broken link {}: {}", entry.path().display(), e);
                        continue;
                    }
                }
            } else if !entry.file_type().is_file() {
                continue;
            }

            if let Some(image) = ImageReference::from_path(entry.into_path()) {
                return Some(image);
            }
        }
    }
}
