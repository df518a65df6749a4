// SPDX-License-Identifier: GPL-3.0-only

//! Capture session controller
//!
//! Owns the selected device and the photo output, applies manual exposure
//! under the device's configuration lock, and issues still captures.
//!
//! ```text
//! slider ──> ExposureCurve / map_iso ──> apply_exposure ──> ConfigurationLock ──> device
//! capture_photo ──> PhotoOutput ──> CaptureCompletion ──> PendingCapture ──> PhotoPipeline
//! ```
//!
//! At most one capture is in flight. State changes, exposure changes and
//! finished captures are published on a broadcast channel (see [`subscribe`]).
//!
//! [`subscribe`]: CaptureSession::subscribe

pub mod state;

pub use state::{SessionEvent, SessionStartup, SessionState};

use crate::authorization::{Authorizer, check_authorization};
use crate::backends::camera::{
    CameraBackend, CaptureDevice, ConfigurationLock, DeviceDescriptor, DeviceSelector,
    PhotoOutput,
};
use crate::config::Config;
use crate::constants::{DEFAULT_ISO, EVENT_CHANNEL_CAPACITY};
use crate::errors::{CameraError, CaptureError, ConfigError};
use crate::exposure::{ExposureConfig, ExposureCurve, iso_for};
use crate::pipelines::photo::{
    CaptureCompletion, CaptureRequest, CapturedPhoto, PendingCapture, PhotoPipeline,
    PhotoSettings,
};
use crate::storage::PhotoLibrary;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

struct SessionInner {
    state: SessionState,
    device: Option<Arc<dyn CaptureDevice>>,
    photo_output: Option<Arc<dyn PhotoOutput>>,
    exposure: ExposureConfig,
}

/// State shared with in-flight capture completions
struct Shared {
    inner: Mutex<SessionInner>,
    events: broadcast::Sender<SessionEvent>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn transition(&self, inner: &mut SessionInner, to: SessionState) -> Result<(), CameraError> {
        let from = inner.state;
        if !from.can_transition_to(to) {
            warn!(%from, %to, "Rejected session state transition");
            return Err(CameraError::InvalidState(from));
        }
        inner.state = to;
        debug!(%from, %to, "Session state changed");
        self.emit(SessionEvent::StateChanged { from, to });
        Ok(())
    }

    fn finish_capture(&self, id: Uuid, succeeded: bool) {
        let mut inner = self.lock();
        if inner.state == SessionState::CaptureInFlight {
            let _ = self.transition(&mut inner, SessionState::Running);
        } else {
            warn!(%id, state = %inner.state, "Capture finished outside of a capture");
        }
        self.emit(SessionEvent::CaptureFinished { id, succeeded });
    }
}

/// Camera capture session with manual exposure control
pub struct CaptureSession {
    config: Config,
    curve: ExposureCurve,
    selector: DeviceSelector,
    backend: Arc<dyn CameraBackend>,
    pipeline: PhotoPipeline,
    shared: Arc<Shared>,
}

impl CaptureSession {
    pub fn new(
        config: Config,
        backend: Arc<dyn CameraBackend>,
        library: Arc<dyn PhotoLibrary>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let exposure = ExposureConfig::new(
            config.initial_iso.unwrap_or(DEFAULT_ISO),
            config.exposure_minimum_duration,
        );

        Self {
            curve: ExposureCurve::from_config(&config),
            selector: DeviceSelector::new(config.device_preference.clone()),
            backend,
            pipeline: PhotoPipeline::new(library),
            shared: Arc::new(Shared {
                inner: Mutex::new(SessionInner {
                    state: SessionState::Idle,
                    device: None,
                    photo_output: None,
                    exposure,
                }),
                events,
            }),
            config,
        }
    }

    /// Authorize, select a device and start streaming
    ///
    /// # Returns
    /// * `Ok(SessionStartup::Running)` - Device attached and photo output ready
    /// * `Ok(SessionStartup::Unavailable)` - Camera access refused
    /// * `Err(CameraError::NoDeviceAvailable)` - No preferred device exists
    /// * `Err(CameraError::SessionSetupFailed)` - The backend refused an input or output
    pub async fn start(&self, authorizer: &dyn Authorizer) -> Result<SessionStartup, CameraError> {
        {
            let inner = self.shared.lock();
            if inner.state != SessionState::Idle {
                return Err(CameraError::InvalidState(inner.state));
            }
        }

        if !check_authorization(authorizer).await {
            warn!("Camera access denied, session unavailable");
            let mut inner = self.shared.lock();
            self.shared.transition(&mut inner, SessionState::Unavailable)?;
            return Ok(SessionStartup::Unavailable);
        }

        {
            let mut inner = self.shared.lock();
            self.shared.transition(&mut inner, SessionState::Configuring)?;
        }

        match self.configure() {
            Ok((device, output)) => {
                let descriptor = device.descriptor();
                let exposure = self.initial_exposure(device.as_ref());

                let mut inner = self.shared.lock();
                inner.device = Some(device);
                inner.photo_output = Some(output);
                inner.exposure = exposure;
                self.shared.transition(&mut inner, SessionState::Running)?;

                info!(
                    device = %descriptor.name,
                    device_type = %descriptor.device_type,
                    %exposure,
                    "Capture session running"
                );
                Ok(SessionStartup::Running(descriptor))
            }
            Err(e) => {
                error!(error = %e, "Failed to configure capture session");
                let fallback = match e {
                    CameraError::NoDeviceAvailable => SessionState::Unavailable,
                    _ => {
                        self.backend.stop_running();
                        SessionState::Idle
                    }
                };
                let mut inner = self.shared.lock();
                self.shared.transition(&mut inner, fallback)?;
                Err(e)
            }
        }
    }

    fn configure(&self) -> Result<(Arc<dyn CaptureDevice>, Arc<dyn PhotoOutput>), CameraError> {
        let device = self.selector.select(self.backend.as_ref())?;

        self.backend
            .add_input(&device)
            .map_err(|e| CameraError::SessionSetupFailed(format!("adding input: {}", e)))?;
        self.backend
            .start_running()
            .map_err(|e| CameraError::SessionSetupFailed(format!("starting session: {}", e)))?;

        let output = self
            .backend
            .add_photo_output()
            .map_err(|e| CameraError::SessionSetupFailed(format!("adding photo output: {}", e)))?;
        output.set_high_resolution_capture_enabled(true);

        debug!(
            raw_formats = output.available_raw_pixel_formats().len(),
            "Photo output attached"
        );
        Ok((device, output))
    }

    // Nothing is written to the device until the first slider change
    fn initial_exposure(&self, device: &dyn CaptureDevice) -> ExposureConfig {
        let capabilities = device.capabilities();
        let iso = self.config.initial_iso.unwrap_or_else(|| device.iso());
        let shutter = self.curve.shutter_speed_for(0.0, &capabilities);
        ExposureConfig::new(iso, shutter).clamped_to(&capabilities)
    }

    /// Stop streaming and detach the device
    ///
    /// Not allowed while a capture is in flight. Stopping a session that is
    /// idle or unavailable does nothing.
    pub fn stop(&self) -> Result<(), CameraError> {
        let mut inner = self.shared.lock();
        match inner.state {
            SessionState::Idle | SessionState::Unavailable => Ok(()),
            SessionState::Running => {
                self.backend.stop_running();
                inner.device = None;
                inner.photo_output = None;
                self.shared.transition(&mut inner, SessionState::Idle)?;
                info!("Capture session stopped");
                Ok(())
            }
            state => Err(CameraError::InvalidState(state)),
        }
    }

    /// Apply an exposure to the device
    ///
    /// Values are clamped into the device's current bounds. The stored
    /// exposure only changes when the device accepts the new values.
    pub fn apply_exposure(&self, exposure: ExposureConfig) -> Result<(), ConfigError> {
        self.configure_exposure(|_, _| exposure).map(|_| ())
    }

    /// Set ISO from a normalized slider position, keeping the shutter duration
    pub fn set_iso(&self, slider_value: f32) -> Result<ExposureConfig, ConfigError> {
        self.configure_exposure(|current, device| {
            current.with_iso(iso_for(slider_value, &device.capabilities()))
        })
    }

    /// Set shutter duration from a normalized slider position, keeping ISO
    pub fn set_shutter_speed(&self, slider_value: f64) -> Result<ExposureConfig, ConfigError> {
        let curve = self.curve;
        self.configure_exposure(move |current, device| {
            current.with_shutter_duration(
                curve.shutter_speed_for(slider_value, &device.capabilities()),
            )
        })
    }

    // Reads the stored exposure and commits the result while holding the
    // device lock, so the stored value always matches the last device write.
    fn configure_exposure(
        &self,
        update: impl FnOnce(ExposureConfig, &dyn CaptureDevice) -> ExposureConfig,
    ) -> Result<ExposureConfig, ConfigError> {
        let device = self
            .shared
            .lock()
            .device
            .clone()
            .ok_or(ConfigError::NoDevice)?;

        let guard = ConfigurationLock::acquire(device.as_ref()).map_err(|e| {
            debug!(error = %e, "Device configuration lock unavailable");
            ConfigError::from(e)
        })?;

        let current = self.shared.lock().exposure;
        let target = update(current, guard.device()).clamped_to(&guard.device().capabilities());
        let duration = target.duration().ok_or_else(|| {
            ConfigError::Rejected(format!(
                "exposure duration {} s is not representable",
                target.shutter_duration
            ))
        })?;

        guard
            .device()
            .set_custom_exposure(duration, target.iso)
            .map_err(|e| {
                warn!(error = %e, %target, "Device rejected exposure");
                ConfigError::from(e)
            })?;

        let previous = std::mem::replace(&mut self.shared.lock().exposure, target);
        if previous != target {
            self.shared.emit(SessionEvent::ExposureChanged {
                previous,
                current: target,
            });
        }
        debug!(%previous, current = %target, "Exposure applied");

        drop(guard);
        Ok(target)
    }

    /// Issue a still capture
    ///
    /// Returns once the capture has been handed to the photo output; await
    /// the returned [`PendingCapture`] for the processed photo. The result is
    /// decoded and saved on a runtime task, whether or not the caller is
    /// still waiting. Must be called from within a tokio runtime.
    pub fn capture_photo(&self, request: CaptureRequest) -> Result<PendingCapture, CaptureError> {
        let handle = Handle::try_current().map_err(|e| {
            CaptureError::CaptureFailed(format!("no async runtime to handle the capture: {}", e))
        })?;

        let (settings, output) = {
            let mut inner = self.shared.lock();
            if !inner.state.can_capture() {
                return Err(match inner.state {
                    SessionState::CaptureInFlight => {
                        debug!("Capture requested while another is in flight");
                        CaptureError::CaptureAlreadyInProgress
                    }
                    _ => CaptureError::NoOutputConfigured,
                });
            }
            let output = inner
                .photo_output
                .clone()
                .ok_or(CaptureError::NoOutputConfigured)?;

            let settings =
                PhotoSettings::negotiate(&request, &output.available_raw_pixel_formats());
            self.shared
                .transition(&mut inner, SessionState::CaptureInFlight)
                .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;
            (settings, output)
        };

        info!(
            id = %settings.unique_id,
            format = %settings.output_format(),
            stabilization = settings.auto_still_image_stabilization,
            flash = ?settings.flash_mode,
            "Capturing photo"
        );

        let (completion, receiver) = CaptureCompletion::channel(settings.unique_id);
        let shared: Weak<Shared> = Arc::downgrade(&self.shared);
        let completion = completion.on_finish(move |id, succeeded| {
            if let Some(shared) = shared.upgrade() {
                shared.finish_capture(id, succeeded);
            }
        });

        let processed = self
            .pipeline
            .spawn_completion(&handle, settings.unique_id, receiver);

        output.capture_photo(settings.clone(), completion);
        Ok(PendingCapture::new(
            settings,
            processed,
            self.config.capture_timeout(),
        ))
    }

    /// Capture a photo and wait for it to be decoded and saved
    pub async fn take_photo(&self, request: CaptureRequest) -> Result<CapturedPhoto, CaptureError> {
        self.capture_photo(request)?.wait().await
    }

    /// Exposure last applied to the device, or the initial exposure
    pub fn exposure(&self) -> ExposureConfig {
        self.shared.lock().exposure
    }

    pub fn state(&self) -> SessionState {
        self.shared.lock().state
    }

    /// Selected device, once the session is running
    pub fn device(&self) -> Option<DeviceDescriptor> {
        self.shared
            .lock()
            .device
            .as_ref()
            .map(|device| device.descriptor())
    }

    /// Receive session events from now on
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    /// Backend the session streams from, for attaching a preview
    pub fn backend(&self) -> &Arc<dyn CameraBackend> {
        &self.backend
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Request built from the configured flash and stabilization defaults
    pub fn default_request(&self) -> CaptureRequest {
        CaptureRequest::from_config(&self.config)
    }
}

impl std::fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.shared.lock();
        f.debug_struct("CaptureSession")
            .field("state", &inner.state)
            .field("exposure", &inner.exposure)
            .field("device", &inner.device.as_ref().map(|d| d.unique_id().to_string()))
            .finish_non_exhaustive()
    }
}
