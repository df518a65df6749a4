// SPDX-License-Identifier: MPL-2.0

//! Async photo capture pipeline
//!
//! ```text
//! PhotoOutput → CaptureCompletion → on_capture_complete → PhotoLibrary
//!                                        │
//!                                        ├─ JPEG: decode to DynamicImage, then save
//!                                        └─ Raw:  save bytes as delivered
//! ```
//!
//! Failures are returned to the caller and nothing is persisted. Completion
//! handling runs on its own task (see [`PhotoPipeline::spawn_completion`]),
//! so a caller that stops waiting never loses a photo.

pub mod capture;

pub use capture::{
    CaptureCompletion, CaptureRequest, CaptureResult, CapturedSample, PendingCapture,
    PhotoSettings,
};

use crate::backends::camera::PhotoFormat;
use crate::errors::CaptureError;
use crate::storage::PhotoLibrary;
use chrono::{DateTime, Local};
use futures::channel::oneshot;
use image::{DynamicImage, GenericImageView, ImageFormat};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, error, info};
use uuid::Uuid;

/// A finished capture, ready for display
#[derive(Debug, Clone)]
pub struct CapturedPhoto {
    /// Identifier of the capture that produced this photo
    pub id: Uuid,
    pub format: PhotoFormat,
    /// Bytes as delivered by the capture subsystem
    pub data: Arc<[u8]>,
    /// Decoded image; `None` for raw captures, which are not decoded
    pub image: Option<Arc<DynamicImage>>,
    pub captured_at: DateTime<Local>,
}

impl CapturedPhoto {
    /// Pixel dimensions of the decoded image
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.image.as_ref().map(|image| image.dimensions())
    }
}

/// Completion handling stage of the capture pipeline
#[derive(Clone)]
pub struct PhotoPipeline {
    library: Arc<dyn PhotoLibrary>,
}

impl PhotoPipeline {
    pub fn new(library: Arc<dyn PhotoLibrary>) -> Self {
        Self { library }
    }

    /// Handle the result of a capture
    ///
    /// # Returns
    /// * `Ok(CapturedPhoto)` - Sample decoded (JPEG) and handed to the library
    /// * `Err(CaptureError::CaptureFailed)` - Capture failed or JPEG could not be decoded
    pub async fn on_capture_complete(
        &self,
        id: Uuid,
        result: CaptureResult,
    ) -> Result<CapturedPhoto, CaptureError> {
        let sample = match result {
            CaptureResult::Success(sample) => sample,
            CaptureResult::Failure(reason) => {
                error!(%id, reason = %reason, "Error capturing photo");
                return Err(CaptureError::CaptureFailed(reason));
            }
        };

        let image = match sample.format {
            PhotoFormat::Jpeg => Some(Arc::new(decode_jpeg(Arc::clone(&sample.data)).await?)),
            PhotoFormat::Raw(format) => {
                debug!(format = %format, size = sample.data.len(), "Raw sample, skipping decode");
                None
            }
        };

        self.library.save(id, Arc::clone(&sample.data), sample.format);

        let photo = CapturedPhoto {
            id,
            format: sample.format,
            data: sample.data,
            image,
            captured_at: Local::now(),
        };

        info!(
            %id,
            format = %photo.format,
            size = photo.data.len(),
            dimensions = ?photo.dimensions(),
            "Photo captured"
        );

        Ok(photo)
    }

    /// Run [`on_capture_complete`](Self::on_capture_complete) once the
    /// capture's result arrives
    ///
    /// The returned receiver yields the outcome. Dropping it does not stop
    /// the photo from being decoded and saved.
    pub fn spawn_completion(
        &self,
        handle: &Handle,
        id: Uuid,
        result: oneshot::Receiver<CaptureResult>,
    ) -> oneshot::Receiver<Result<CapturedPhoto, CaptureError>> {
        let (sender, receiver) = oneshot::channel();
        let pipeline = self.clone();

        handle.spawn(async move {
            let outcome = match result.await {
                Ok(result) => pipeline.on_capture_complete(id, result).await,
                Err(_) => Err(CaptureError::CaptureFailed(
                    "capture completion channel closed".to_string(),
                )),
            };
            if sender.send(outcome).is_err() {
                debug!(%id, "Nobody waiting for capture, photo handled anyway");
            }
        });

        receiver
    }
}

impl std::fmt::Debug for PhotoPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhotoPipeline").finish_non_exhaustive()
    }
}

/// Decode JPEG bytes on a blocking task
async fn decode_jpeg(data: Arc<[u8]>) -> Result<DynamicImage, CaptureError> {
    tokio::task::spawn_blocking(move || {
        image::load_from_memory_with_format(&data, ImageFormat::Jpeg)
            .map_err(|e| CaptureError::CaptureFailed(format!("JPEG decoding failed: {}", e)))
    })
    .await
    .map_err(|e| CaptureError::CaptureFailed(format!("Decode task error: {}", e)))?
}
