// SPDX-License-Identifier: MPL-2.0

//! Photo capture requests and completion delivery
//!
//! A [`CaptureRequest`] is negotiated against the photo output's raw formats
//! into [`PhotoSettings`]. The output receives a [`CaptureCompletion`] that
//! delivers exactly one [`CaptureResult`] to the photo pipeline, whose outcome
//! reaches the caller's [`PendingCapture`].

use super::CapturedPhoto;
use crate::backends::camera::{FlashMode, PhotoFormat, RawPixelFormat};
use crate::config::Config;
use crate::errors::CaptureError;
use futures::channel::oneshot;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// What the caller wants from one capture
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRequest {
    /// Preferred raw format; used when the output offers it
    pub raw_pixel_format: Option<RawPixelFormat>,
    /// Still image stabilization (forced off for raw captures)
    pub stabilization_enabled: bool,
    pub flash_mode: FlashMode,
}

impl Default for CaptureRequest {
    fn default() -> Self {
        Self {
            raw_pixel_format: None,
            stabilization_enabled: true,
            flash_mode: FlashMode::Auto,
        }
    }
}

impl CaptureRequest {
    /// Request using the configured flash and stabilization defaults
    pub fn from_config(config: &Config) -> Self {
        Self {
            stabilization_enabled: config.stabilization,
            flash_mode: config.flash_mode,
            ..Self::default()
        }
    }

    pub fn with_flash_mode(mut self, flash_mode: FlashMode) -> Self {
        self.flash_mode = flash_mode;
        self
    }

    pub fn with_raw_pixel_format(mut self, format: RawPixelFormat) -> Self {
        self.raw_pixel_format = Some(format);
        self
    }

    pub fn with_stabilization(mut self, enabled: bool) -> Self {
        self.stabilization_enabled = enabled;
        self
    }
}

/// Settings handed to the photo output for one capture
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoSettings {
    pub unique_id: Uuid,
    /// Raw format to capture, or `None` for the default encoded format
    pub raw_pixel_format: Option<RawPixelFormat>,
    pub auto_still_image_stabilization: bool,
    /// Always set; the output is attached with high resolution enabled
    pub high_resolution_photo: bool,
    pub flash_mode: FlashMode,
}

impl PhotoSettings {
    /// Negotiate a request against the raw formats the output offers
    ///
    /// With any raw format available the capture is raw (the requested one if
    /// offered, else the first) and stabilization is turned off, since it
    /// cannot be applied to raw data. Otherwise the capture is encoded and the
    /// requested stabilization is kept. High resolution and the requested
    /// flash mode are always carried over.
    pub fn negotiate(request: &CaptureRequest, available_raw: &[RawPixelFormat]) -> Self {
        let raw_pixel_format = request
            .raw_pixel_format
            .filter(|wanted| available_raw.contains(wanted))
            .or_else(|| available_raw.first().copied());

        let auto_still_image_stabilization = match raw_pixel_format {
            Some(_) => false,
            None => request.stabilization_enabled,
        };

        Self {
            unique_id: Uuid::new_v4(),
            raw_pixel_format,
            auto_still_image_stabilization,
            high_resolution_photo: true,
            flash_mode: request.flash_mode,
        }
    }

    /// Format the capture will be delivered in
    pub fn output_format(&self) -> PhotoFormat {
        match self.raw_pixel_format {
            Some(format) => PhotoFormat::Raw(format),
            None => PhotoFormat::Jpeg,
        }
    }
}

/// Sample data delivered by a successful capture
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedSample {
    pub data: Arc<[u8]>,
    pub format: PhotoFormat,
}

impl CapturedSample {
    pub fn new(data: impl Into<Arc<[u8]>>, format: PhotoFormat) -> Self {
        Self {
            data: data.into(),
            format,
        }
    }
}

/// Outcome of one capture
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureResult {
    Success(CapturedSample),
    Failure(String),
}

impl CaptureResult {
    pub fn is_success(&self) -> bool {
        matches!(self, CaptureResult::Success(_))
    }
}

type FinishHook = Box<dyn FnOnce(Uuid, bool) + Send>;

/// One-shot completion handed to the photo output
///
/// `complete` consumes the handle, so a result can be delivered at most once.
/// Dropping the handle without completing delivers a failure, so the waiting
/// side always hears back exactly once.
pub struct CaptureCompletion {
    id: Uuid,
    sender: Option<oneshot::Sender<CaptureResult>>,
    on_finish: Option<FinishHook>,
}

impl CaptureCompletion {
    /// Create a completion and the receiver its result is delivered to
    pub fn channel(id: Uuid) -> (Self, oneshot::Receiver<CaptureResult>) {
        let (sender, receiver) = oneshot::channel();
        let completion = Self {
            id,
            sender: Some(sender),
            on_finish: None,
        };
        (completion, receiver)
    }

    /// Run `hook` just before the result is delivered
    pub fn on_finish(mut self, hook: impl FnOnce(Uuid, bool) + Send + 'static) -> Self {
        self.on_finish = Some(Box::new(hook));
        self
    }

    /// Identifier of the capture this completion belongs to
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Deliver the capture result
    pub fn complete(mut self, result: CaptureResult) {
        self.deliver(result);
    }

    fn deliver(&mut self, result: CaptureResult) {
        let Some(sender) = self.sender.take() else {
            return;
        };

        if let Some(hook) = self.on_finish.take() {
            hook(self.id, result.is_success());
        }

        debug!(id = %self.id, success = result.is_success(), "Delivering capture result");
        if sender.send(result).is_err() {
            debug!(id = %self.id, "Capture result receiver already gone");
        }
    }
}

impl Drop for CaptureCompletion {
    fn drop(&mut self) {
        if self.sender.is_some() {
            warn!(id = %self.id, "Capture completion dropped without a result");
            self.deliver(CaptureResult::Failure(
                "capture completion dropped without a result".to_string(),
            ));
        }
    }
}

impl std::fmt::Debug for CaptureCompletion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureCompletion")
            .field("id", &self.id)
            .field("delivered", &self.sender.is_none())
            .finish()
    }
}

/// Caller's handle on an in-flight capture
#[derive(Debug)]
pub struct PendingCapture {
    settings: PhotoSettings,
    receiver: oneshot::Receiver<Result<CapturedPhoto, CaptureError>>,
    timeout: Duration,
}

impl PendingCapture {
    pub fn new(
        settings: PhotoSettings,
        receiver: oneshot::Receiver<Result<CapturedPhoto, CaptureError>>,
        timeout: Duration,
    ) -> Self {
        Self {
            settings,
            receiver,
            timeout,
        }
    }

    pub fn id(&self) -> Uuid {
        self.settings.unique_id
    }

    /// Settings the capture was issued with
    pub fn settings(&self) -> &PhotoSettings {
        &self.settings
    }

    /// Wait for the processed photo, up to the configured bound
    ///
    /// A timeout only ends this wait. The capture is not cancelled: the
    /// session stays busy until the backend delivers, and the photo is still
    /// decoded and saved.
    pub async fn wait(self) -> Result<CapturedPhoto, CaptureError> {
        match tokio::time::timeout(self.timeout, self.receiver).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(CaptureError::CaptureFailed(
                "capture completion channel closed".to_string(),
            )),
            Err(_) => {
                warn!(id = %self.settings.unique_id, timeout = ?self.timeout, "Capture timed out");
                Err(CaptureError::Timeout(self.timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_negotiate_raw_disables_stabilization() {
        let request = CaptureRequest::default();
        let settings = PhotoSettings::negotiate(
            &request,
            &[RawPixelFormat::BAYER_GRBG14, RawPixelFormat::BAYER_RGGB14],
        );
        assert_eq!(settings.raw_pixel_format, Some(RawPixelFormat::BAYER_GRBG14));
        assert!(!settings.auto_still_image_stabilization);
        assert!(settings.high_resolution_photo);
        assert_eq!(settings.output_format(), PhotoFormat::Raw(RawPixelFormat::BAYER_GRBG14));
    }

    #[test]
    fn test_negotiate_without_raw_keeps_stabilization() {
        let request = CaptureRequest::default().with_flash_mode(FlashMode::Off);
        let settings = PhotoSettings::negotiate(&request, &[]);
        assert_eq!(settings.raw_pixel_format, None);
        assert!(settings.auto_still_image_stabilization);
        assert_eq!(settings.flash_mode, FlashMode::Off);
        assert_eq!(settings.output_format(), PhotoFormat::Jpeg);

        let settings = PhotoSettings::negotiate(&request.with_stabilization(false), &[]);
        assert!(!settings.auto_still_image_stabilization);
    }

    #[test]
    fn test_negotiate_prefers_requested_raw_format() {
        let request = CaptureRequest::default().with_raw_pixel_format(RawPixelFormat::BAYER_RGGB14);
        let offered = [RawPixelFormat::BAYER_GRBG14, RawPixelFormat::BAYER_RGGB14];
        let settings = PhotoSettings::negotiate(&request, &offered);
        assert_eq!(settings.raw_pixel_format, Some(RawPixelFormat::BAYER_RGGB14));

        // Not offered: first available wins
        let request = CaptureRequest::default().with_raw_pixel_format(RawPixelFormat::BAYER_BGGR14);
        let settings = PhotoSettings::negotiate(&request, &offered);
        assert_eq!(settings.raw_pixel_format, Some(RawPixelFormat::BAYER_GRBG14));
    }

    #[test]
    fn test_negotiated_ids_are_unique() {
        let request = CaptureRequest::default();
        let a = PhotoSettings::negotiate(&request, &[]);
        let b = PhotoSettings::negotiate(&request, &[]);
        assert_ne!(a.unique_id, b.unique_id);
    }

    #[tokio::test]
    async fn test_completion_delivers_once_and_runs_hook_first() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let calls_hook = Arc::clone(&calls);
        let id = Uuid::new_v4();

        let (completion, receiver) = CaptureCompletion::channel(id);
        let completion = completion.on_finish(move |finished, success| {
            calls_hook.lock().unwrap().push((finished, success));
        });

        completion.complete(CaptureResult::Failure("sensor error".to_string()));

        assert_eq!(
            receiver.await.unwrap(),
            CaptureResult::Failure("sensor error".to_string())
        );
        assert_eq!(*calls.lock().unwrap(), vec![(id, false)]);
    }

    #[tokio::test]
    async fn test_dropped_completion_delivers_failure() {
        let (completion, receiver) = CaptureCompletion::channel(Uuid::new_v4());
        drop(completion);
        assert!(matches!(receiver.await, Ok(CaptureResult::Failure(_))));
    }

    #[tokio::test]
    async fn test_pending_capture_times_out() {
        let settings = PhotoSettings::negotiate(&CaptureRequest::default(), &[]);
        let (sender, receiver) = oneshot::channel();
        let pending = PendingCapture::new(settings, receiver, Duration::from_millis(20));

        let result = pending.wait().await;
        assert!(matches!(
            result,
            Err(CaptureError::Timeout(after)) if after == Duration::from_millis(20)
        ));
        drop(sender);
    }

    #[tokio::test]
    async fn test_pending_capture_receives_outcome() {
        let settings = PhotoSettings::negotiate(&CaptureRequest::default(), &[]);
        let id = settings.unique_id;
        let (sender, receiver) = oneshot::channel();
        let pending = PendingCapture::new(settings, receiver, Duration::from_secs(5));

        let photo = CapturedPhoto {
            id,
            format: PhotoFormat::Raw(RawPixelFormat::BAYER_RGGB14),
            data: Arc::from(vec![1u8, 2, 3]),
            image: None,
            captured_at: chrono::Local::now(),
        };
        sender.send(Ok(photo)).unwrap();

        let photo = pending.wait().await.unwrap();
        assert_eq!(photo.id, id);
        assert_eq!(photo.data.len(), 3);
    }

    #[tokio::test]
    async fn test_pending_capture_surfaces_failure() {
        let settings = PhotoSettings::negotiate(&CaptureRequest::default(), &[]);
        let (sender, receiver) = oneshot::channel();
        let pending = PendingCapture::new(settings, receiver, Duration::from_secs(5));

        sender
            .send(Err(CaptureError::CaptureFailed("sensor error".to_string())))
            .unwrap();

        assert!(matches!(
            pending.wait().await,
            Err(CaptureError::CaptureFailed(reason)) if reason == "sensor error"
        ));
    }
}
