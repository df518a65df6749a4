// SPDX-License-Identifier: GPL-3.0-only

//! Simulated camera backend
//!
//! An in-process stand-in for the platform camera stack. Devices enforce the
//! configuration lock and exposure limits the way real hardware does; the
//! photo output synthesizes JPEG or raw samples and can hold completions
//! back so callers can observe a capture in flight.

use super::{
    BackendError, BackendResult, CameraBackend, CaptureDevice, DeviceCapabilities,
    DevicePosition, DeviceType, PhotoFormat, PhotoOutput, RawPixelFormat,
};
use crate::authorization::{AuthorizationStatus, Authorizer};
use crate::pipelines::photo::{CaptureCompletion, CaptureResult, CapturedSample, PhotoSettings};
use image::{ImageError, RgbImage};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

// Slack for values that went through an f64 seconds round trip
const DURATION_TOLERANCE: Duration = Duration::from_micros(1);
const ISO_TOLERANCE: f32 = 0.5;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Exposure as last written to a simulated device
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExposureWrite {
    pub duration: Duration,
    pub iso: f32,
}

/// Simulated capture device
pub struct SimulatedDevice {
    unique_id: String,
    name: String,
    device_type: DeviceType,
    position: DevicePosition,
    capabilities: Mutex<DeviceCapabilities>,
    locked: AtomicBool,
    // Written field by field so torn updates would be observable
    duration: Mutex<Duration>,
    iso: Mutex<f32>,
    writes: Mutex<Vec<ExposureWrite>>,
    reject_exposure: Mutex<Option<String>>,
}

impl SimulatedDevice {
    pub fn new(device_type: DeviceType, name: impl Into<String>) -> Self {
        let capabilities = DeviceCapabilities {
            min_iso: 22.0,
            max_iso: 704.0,
            min_exposure_duration: Duration::from_micros(14),
            max_exposure_duration: Duration::from_secs(1),
        };
        let name = name.into();
        Self {
            unique_id: format!("simulated:{}", name.to_lowercase().replace(' ', "-")),
            name,
            device_type,
            position: DevicePosition::Back,
            capabilities: Mutex::new(capabilities),
            locked: AtomicBool::new(false),
            duration: Mutex::new(Duration::from_millis(33)),
            iso: Mutex::new(100.0),
            writes: Mutex::new(Vec::new()),
            reject_exposure: Mutex::new(None),
        }
    }

    /// Back-facing dual camera
    pub fn dual() -> Self {
        Self::new(DeviceType::BuiltInDualCamera, "Back Dual Camera")
    }

    /// Back-facing wide-angle camera
    pub fn wide_angle() -> Self {
        Self::new(DeviceType::BuiltInWideAngleCamera, "Back Camera")
    }

    pub fn with_position(mut self, position: DevicePosition) -> Self {
        self.position = position;
        self.unique_id = format!("{}:{}", self.unique_id, position);
        self
    }

    pub fn with_capabilities(self, capabilities: DeviceCapabilities) -> Self {
        *lock(&self.capabilities) = capabilities;
        self
    }

    /// Current ISO and duration as a starting point
    pub fn with_current_exposure(self, duration: Duration, iso: f32) -> Self {
        *lock(&self.duration) = duration;
        *lock(&self.iso) = iso;
        self
    }

    /// Simulate an active format change
    pub fn set_capabilities(&self, capabilities: DeviceCapabilities) {
        *lock(&self.capabilities) = capabilities;
    }

    /// Make the next exposure change fail with `reason`
    pub fn reject_next_exposure(&self, reason: impl Into<String>) {
        *lock(&self.reject_exposure) = Some(reason.into());
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::SeqCst)
    }

    /// Every exposure change accepted so far, oldest first
    pub fn exposure_writes(&self) -> Vec<ExposureWrite> {
        lock(&self.writes).clone()
    }

    /// Exposure currently applied
    pub fn current_exposure(&self) -> ExposureWrite {
        ExposureWrite {
            duration: *lock(&self.duration),
            iso: *lock(&self.iso),
        }
    }
}

impl CaptureDevice for SimulatedDevice {
    fn unique_id(&self) -> &str {
        &self.unique_id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn device_type(&self) -> DeviceType {
        self.device_type
    }

    fn position(&self) -> DevicePosition {
        self.position
    }

    fn capabilities(&self) -> DeviceCapabilities {
        *lock(&self.capabilities)
    }

    fn iso(&self) -> f32 {
        *lock(&self.iso)
    }

    fn exposure_duration(&self) -> Duration {
        *lock(&self.duration)
    }

    fn try_lock_for_configuration(&self) -> BackendResult<()> {
        self.locked
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(|_| BackendError::Busy)
    }

    fn unlock_for_configuration(&self) {
        self.locked.store(false, Ordering::SeqCst);
    }

    fn set_custom_exposure(&self, duration: Duration, iso: f32) -> BackendResult<()> {
        if !self.is_locked() {
            return Err(BackendError::NotLocked);
        }
        if let Some(reason) = lock(&self.reject_exposure).take() {
            return Err(BackendError::Other(reason));
        }

        let caps = self.capabilities();
        if iso < caps.min_iso - ISO_TOLERANCE || iso > caps.max_iso + ISO_TOLERANCE {
            return Err(BackendError::Unsupported(format!("ISO {} out of range", iso)));
        }
        if duration + DURATION_TOLERANCE < caps.min_exposure_duration
            || duration > caps.max_exposure_duration + DURATION_TOLERANCE
        {
            return Err(BackendError::Unsupported(format!(
                "exposure duration {:?} out of range",
                duration
            )));
        }

        *lock(&self.duration) = duration;
        std::thread::yield_now();
        *lock(&self.iso) = iso;

        let write = self.current_exposure();
        lock(&self.writes).push(write);
        debug!(device = %self.unique_id, ?duration, iso, "Custom exposure set");
        Ok(())
    }
}

/// When a simulated capture reports back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionMode {
    /// Complete inside `capture_photo`
    Immediate,
    /// Hold completions until [`SimulatedPhotoOutput::complete_next`] and friends
    Deferred,
    /// Complete immediately with a failure
    Failing(String),
}

/// Simulated still photo output
pub struct SimulatedPhotoOutput {
    raw_formats: Vec<RawPixelFormat>,
    high_resolution: AtomicBool,
    mode: CompletionMode,
    image_size: (u32, u32),
    issued: Mutex<Vec<PhotoSettings>>,
    pending: Mutex<VecDeque<(PhotoSettings, CaptureCompletion)>>,
}

impl Default for SimulatedPhotoOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedPhotoOutput {
    /// JPEG-only output that completes immediately
    pub fn new() -> Self {
        Self {
            raw_formats: Vec::new(),
            high_resolution: AtomicBool::new(false),
            mode: CompletionMode::Immediate,
            image_size: (64, 48),
            issued: Mutex::new(Vec::new()),
            pending: Mutex::new(VecDeque::new()),
        }
    }

    pub fn with_raw_formats(mut self, formats: Vec<RawPixelFormat>) -> Self {
        self.raw_formats = formats;
        self
    }

    pub fn with_completion_mode(mut self, mode: CompletionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_image_size(mut self, width: u32, height: u32) -> Self {
        self.image_size = (width, height);
        self
    }

    /// Settings of every capture issued so far, oldest first
    pub fn issued_settings(&self) -> Vec<PhotoSettings> {
        lock(&self.issued).clone()
    }

    /// Captures waiting for completion
    pub fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }

    /// Complete the oldest held capture with a synthesized sample
    pub fn complete_next(&self) -> bool {
        let Some((settings, completion)) = self.pop_pending() else {
            return false;
        };
        completion.complete(self.sample_for(&settings));
        true
    }

    /// Fail the oldest held capture
    pub fn fail_next(&self, reason: impl Into<String>) -> bool {
        let Some((_, completion)) = self.pop_pending() else {
            return false;
        };
        completion.complete(CaptureResult::Failure(reason.into()));
        true
    }

    /// Drop the oldest held capture's completion without a result
    pub fn abandon_next(&self) -> bool {
        self.pop_pending().is_some()
    }

    // Release the queue lock before completing: completion re-enters the session
    fn pop_pending(&self) -> Option<(PhotoSettings, CaptureCompletion)> {
        lock(&self.pending).pop_front()
    }

    fn sample_for(&self, settings: &PhotoSettings) -> CaptureResult {
        let (width, height) = self.image_size;
        match settings.output_format() {
            PhotoFormat::Jpeg => match synthetic_jpeg(width, height) {
                Ok(data) => CaptureResult::Success(CapturedSample::new(data, PhotoFormat::Jpeg)),
                Err(e) => CaptureResult::Failure(format!("JPEG synthesis failed: {}", e)),
            },
            format @ PhotoFormat::Raw(_) => {
                CaptureResult::Success(CapturedSample::new(synthetic_raw(width, height), format))
            }
        }
    }
}

impl PhotoOutput for SimulatedPhotoOutput {
    fn available_raw_pixel_formats(&self) -> Vec<RawPixelFormat> {
        self.raw_formats.clone()
    }

    fn set_high_resolution_capture_enabled(&self, enabled: bool) {
        self.high_resolution.store(enabled, Ordering::SeqCst);
    }

    fn is_high_resolution_capture_enabled(&self) -> bool {
        self.high_resolution.load(Ordering::SeqCst)
    }

    fn capture_photo(&self, settings: PhotoSettings, completion: CaptureCompletion) {
        debug!(id = %settings.unique_id, format = %settings.output_format(), "Simulated capture");
        lock(&self.issued).push(settings.clone());

        match &self.mode {
            CompletionMode::Immediate => completion.complete(self.sample_for(&settings)),
            CompletionMode::Deferred => lock(&self.pending).push_back((settings, completion)),
            CompletionMode::Failing(reason) => {
                completion.complete(CaptureResult::Failure(reason.clone()))
            }
        }
    }
}

/// Simulated capture session plumbing
pub struct SimulatedBackend {
    devices: Vec<Arc<SimulatedDevice>>,
    output: Arc<SimulatedPhotoOutput>,
    running: AtomicBool,
    inputs: Mutex<Vec<String>>,
    input_failure: Option<String>,
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedBackend {
    /// Backend with no devices and a JPEG-only photo output
    pub fn new() -> Self {
        Self {
            devices: Vec::new(),
            output: Arc::new(SimulatedPhotoOutput::new()),
            running: AtomicBool::new(false),
            inputs: Mutex::new(Vec::new()),
            input_failure: None,
        }
    }

    pub fn with_device(mut self, device: impl Into<Arc<SimulatedDevice>>) -> Self {
        self.devices.push(device.into());
        self
    }

    pub fn with_photo_output(mut self, output: impl Into<Arc<SimulatedPhotoOutput>>) -> Self {
        self.output = output.into();
        self
    }

    /// Make `add_input` fail
    pub fn with_input_failure(mut self, reason: impl Into<String>) -> Self {
        self.input_failure = Some(reason.into());
        self
    }

    pub fn photo_output(&self) -> Arc<SimulatedPhotoOutput> {
        Arc::clone(&self.output)
    }

    /// Identifiers of attached inputs
    pub fn inputs(&self) -> Vec<String> {
        lock(&self.inputs).clone()
    }
}

impl CameraBackend for SimulatedBackend {
    fn default_device(
        &self,
        device_type: DeviceType,
        position: DevicePosition,
    ) -> Option<Arc<dyn CaptureDevice>> {
        self.devices
            .iter()
            .find(|device| device.device_type() == device_type && device.position() == position)
            .map(|device| Arc::clone(device) as Arc<dyn CaptureDevice>)
    }

    fn add_input(&self, device: &Arc<dyn CaptureDevice>) -> BackendResult<()> {
        if let Some(reason) = &self.input_failure {
            return Err(BackendError::Other(reason.clone()));
        }
        lock(&self.inputs).push(device.unique_id().to_string());
        Ok(())
    }

    fn add_photo_output(&self) -> BackendResult<Arc<dyn PhotoOutput>> {
        Ok(Arc::clone(&self.output) as Arc<dyn PhotoOutput>)
    }

    fn start_running(&self) -> BackendResult<()> {
        self.running.store(true, Ordering::SeqCst);
        info!("Simulated session running");
        Ok(())
    }

    fn stop_running(&self) {
        self.running.store(false, Ordering::SeqCst);
        lock(&self.inputs).clear();
        info!("Simulated session stopped");
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Simulated permission prompt
pub struct SimulatedAuthorizer {
    status: Mutex<AuthorizationStatus>,
    grant_on_prompt: bool,
    prompts: AtomicUsize,
}

impl SimulatedAuthorizer {
    /// Authorizer already in `status`
    pub fn new(status: AuthorizationStatus) -> Self {
        Self {
            status: Mutex::new(status),
            grant_on_prompt: false,
            prompts: AtomicUsize::new(0),
        }
    }

    /// Undetermined authorizer whose prompt answers `grant`
    pub fn prompting(grant: bool) -> Self {
        Self {
            grant_on_prompt: grant,
            ..Self::new(AuthorizationStatus::NotDetermined)
        }
    }

    /// Number of times the user was prompted
    pub fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

impl Authorizer for SimulatedAuthorizer {
    fn authorization_status(&self) -> AuthorizationStatus {
        *lock(&self.status)
    }

    fn request_access(&self, completion: Box<dyn FnOnce(bool) + Send>) {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        *lock(&self.status) = if self.grant_on_prompt {
            AuthorizationStatus::Authorized
        } else {
            AuthorizationStatus::Denied
        };
        completion(self.grant_on_prompt);
    }
}

/// Gradient test image encoded as JPEG
pub fn synthetic_jpeg(width: u32, height: u32) -> Result<Vec<u8>, ImageError> {
    let image = RgbImage::from_fn(width, height, |x, y| {
        let r = (x * 255 / width.max(1)) as u8;
        let g = (y * 255 / height.max(1)) as u8;
        image::Rgb([r, g, 128])
    });

    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, 90);
    encoder.encode(
        image.as_raw(),
        image.width(),
        image.height(),
        image::ExtendedColorType::Rgb8,
    )?;
    Ok(buffer)
}

/// 16-bit little-endian ramp standing in for Bayer sensor data
pub fn synthetic_raw(width: u32, height: u32) -> Vec<u8> {
    (0..width * height)
        .flat_map(|i| ((i % 16384) as u16).to_le_bytes())
        .collect()
}
