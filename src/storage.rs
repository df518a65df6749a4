// SPDX-License-Identifier: MPL-2.0

//! Storage utilities for captured photos

use crate::backends::camera::PhotoFormat;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Destination for captured photos
///
/// Saving is fire-and-forget: failures are logged by the implementation and
/// never reach the capture session.
pub trait PhotoLibrary: Send + Sync {
    /// Persist the photo produced by capture `id`
    fn save(&self, id: Uuid, data: Arc<[u8]>, format: PhotoFormat);
}

/// Writes photos as files into one directory
#[derive(Debug, Clone)]
pub struct FilesystemPhotoLibrary {
    directory: PathBuf,
}

impl FilesystemPhotoLibrary {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Write a photo synchronously and return its path
    ///
    /// Files are named `IMG_<timestamp>_<id prefix>.<ext>`, with the prefix
    /// taken from the capture identifier.
    pub fn write_photo(
        &self,
        id: Uuid,
        data: &[u8],
        format: PhotoFormat,
    ) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(&self.directory)?;

        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let id = id.simple().to_string();
        let filename = format!("IMG_{}_{}.{}", timestamp, &id[..8], format.extension());
        let filepath = self.directory.join(filename);

        std::fs::write(&filepath, data)?;
        Ok(filepath)
    }
}

impl PhotoLibrary for FilesystemPhotoLibrary {
    fn save(&self, id: Uuid, data: Arc<[u8]>, format: PhotoFormat) {
        let library = self.clone();
        let write = move || match library.write_photo(id, &data, format) {
            Ok(path) => info!(%id, path = %path.display(), %format, "Photo saved successfully"),
            Err(e) => warn!(%id, error = %e, %format, "Failed to save photo"),
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                // Write to disk in background task (I/O-bound)
                handle.spawn_blocking(write);
            }
            Err(_) => {
                debug!("No async runtime, saving photo inline");
                write();
            }
        }
    }
}
