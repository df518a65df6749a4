// SPDX-License-Identifier: MPL-2.0

//! Camera backend abstraction
//!
//! The capture hardware is reached only through the traits in this module.
//! A platform integration implements them; the session controller drives
//! them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │   CaptureSession    │  ← State machine, exposure, capture requests
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │ CameraBackend Trait │  ← Device lookup, inputs, outputs, streaming
//! └──────────┬──────────┘
//!            │
//!      ┌─────┴──────┐
//!      ▼            ▼
//! CaptureDevice  PhotoOutput
//! ```

pub mod selector;
pub mod simulated;
pub mod types;

pub use selector::DeviceSelector;
pub use types::*;

use crate::pipelines::photo::{CaptureCompletion, PhotoSettings};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// A physical capture device
///
/// Exposure changes must be made between [`CaptureDevice::try_lock_for_configuration`]
/// and [`CaptureDevice::unlock_for_configuration`]. Use [`ConfigurationLock`]
/// rather than calling the pair directly.
pub trait CaptureDevice: Send + Sync {
    /// Stable identifier
    fn unique_id(&self) -> &str;

    /// Human readable name
    fn name(&self) -> &str;

    fn device_type(&self) -> DeviceType;

    fn position(&self) -> DevicePosition;

    /// Exposure limits of the active format
    fn capabilities(&self) -> DeviceCapabilities;

    /// ISO the device is currently using
    fn iso(&self) -> f32;

    /// Exposure duration the device is currently using
    fn exposure_duration(&self) -> Duration;

    /// Take the exclusive configuration lock without blocking
    ///
    /// # Returns
    /// * `Ok(())` - Lock acquired
    /// * `Err(BackendError::Busy)` - Another configuration is in progress
    fn try_lock_for_configuration(&self) -> BackendResult<()>;

    /// Release the configuration lock
    fn unlock_for_configuration(&self);

    /// Switch to custom exposure with the given duration and ISO
    ///
    /// Requires the configuration lock.
    fn set_custom_exposure(&self, duration: Duration, iso: f32) -> BackendResult<()>;

    fn descriptor(&self) -> DeviceDescriptor {
        DeviceDescriptor {
            unique_id: self.unique_id().to_string(),
            name: self.name().to_string(),
            device_type: self.device_type(),
            position: self.position(),
        }
    }
}

/// Still photo output attached to a running session
pub trait PhotoOutput: Send + Sync {
    /// Raw pixel formats this output can deliver, in preference order
    fn available_raw_pixel_formats(&self) -> Vec<RawPixelFormat>;

    fn set_high_resolution_capture_enabled(&self, enabled: bool);

    fn is_high_resolution_capture_enabled(&self) -> bool;

    /// Start a capture
    ///
    /// The output must eventually consume `completion` (or drop it), which
    /// delivers the result to the session exactly once.
    fn capture_photo(&self, settings: PhotoSettings, completion: CaptureCompletion);
}

/// Capture session plumbing provided by the platform
pub trait CameraBackend: Send + Sync {
    /// Default device of the given kind at the given position, if present
    fn default_device(
        &self,
        device_type: DeviceType,
        position: DevicePosition,
    ) -> Option<Arc<dyn CaptureDevice>>;

    /// Attach the device as the session's video input
    fn add_input(&self, device: &Arc<dyn CaptureDevice>) -> BackendResult<()>;

    /// Create a photo output and attach it to the session
    fn add_photo_output(&self) -> BackendResult<Arc<dyn PhotoOutput>>;

    /// Begin streaming frames (preview and capture)
    fn start_running(&self) -> BackendResult<()>;

    /// Stop streaming and detach inputs and outputs
    fn stop_running(&self);

    fn is_running(&self) -> bool;
}

/// Scoped configuration lock on a [`CaptureDevice`]
///
/// Unlocks on drop, so every exit path (including errors) releases the lock.
pub struct ConfigurationLock<'a> {
    device: &'a dyn CaptureDevice,
}

impl<'a> ConfigurationLock<'a> {
    /// Acquire the device's configuration lock
    pub fn acquire(device: &'a dyn CaptureDevice) -> BackendResult<Self> {
        device.try_lock_for_configuration()?;
        debug!(device = device.unique_id(), "Locked device for configuration");
        Ok(Self { device })
    }

    /// The locked device
    pub fn device(&self) -> &dyn CaptureDevice {
        self.device
    }
}

impl Drop for ConfigurationLock<'_> {
    fn drop(&mut self) {
        self.device.unlock_for_configuration();
        debug!(device = self.device.unique_id(), "Unlocked device");
    }
}
