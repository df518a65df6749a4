// SPDX-License-Identifier: GPL-3.0-only

//! Capture device selection
//!
//! Walks a ranked list of device kinds for one position and returns the first
//! the backend can provide. The default ranking prefers the dual camera and
//! falls back to the standard wide-angle camera.

use super::{CameraBackend, CaptureDevice, DevicePosition, DeviceType};
use crate::errors::CameraError;
use std::sync::Arc;
use tracing::{debug, info};

/// Default ranking for the back position
pub const DEFAULT_DEVICE_PREFERENCE: [DeviceType; 2] = [
    DeviceType::BuiltInDualCamera,
    DeviceType::BuiltInWideAngleCamera,
];

/// Picks the best available capture device
#[derive(Debug, Clone)]
pub struct DeviceSelector {
    preference: Vec<DeviceType>,
    position: DevicePosition,
}

impl Default for DeviceSelector {
    fn default() -> Self {
        Self::new(DEFAULT_DEVICE_PREFERENCE.to_vec())
    }
}

impl DeviceSelector {
    /// Selector for the back position with the given ranking (best first)
    pub fn new(preference: Vec<DeviceType>) -> Self {
        Self {
            preference,
            position: DevicePosition::Back,
        }
    }

    /// Use a different position
    pub fn with_position(mut self, position: DevicePosition) -> Self {
        self.position = position;
        self
    }

    /// Select a device
    ///
    /// # Returns
    /// * `Ok(device)` - First device in ranking order that exists
    /// * `Err(CameraError::NoDeviceAvailable)` - None of the ranked kinds exist
    pub fn select(&self, backend: &dyn CameraBackend) -> Result<Arc<dyn CaptureDevice>, CameraError> {
        for device_type in &self.preference {
            match backend.default_device(*device_type, self.position) {
                Some(device) => {
                    info!(
                        device = device.name(),
                        kind = %device_type,
                        position = %self.position,
                        "Selected capture device"
                    );
                    return Ok(device);
                }
                None => {
                    debug!(kind = %device_type, position = %self.position, "Device kind not present");
                }
            }
        }

        Err(CameraError::NoDeviceAvailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::simulated::{SimulatedBackend, SimulatedDevice};

    #[test]
    fn test_prefers_dual_camera() {
        let backend = SimulatedBackend::new()
            .with_device(SimulatedDevice::wide_angle())
            .with_device(SimulatedDevice::dual());

        let device = DeviceSelector::default().select(&backend).unwrap();
        assert_eq!(device.device_type(), DeviceType::BuiltInDualCamera);
    }

    #[test]
    fn test_falls_back_to_wide_angle() {
        let backend = SimulatedBackend::new().with_device(SimulatedDevice::wide_angle());

        let device = DeviceSelector::default().select(&backend).unwrap();
        assert_eq!(device.device_type(), DeviceType::BuiltInWideAngleCamera);
    }

    #[test]
    fn test_no_device_is_fatal() {
        let backend = SimulatedBackend::new();
        let result = DeviceSelector::default().select(&backend);
        assert!(matches!(result, Err(CameraError::NoDeviceAvailable)));
    }

    #[test]
    fn test_ignores_devices_at_other_position() {
        let front = SimulatedDevice::wide_angle().with_position(DevicePosition::Front);
        let backend = SimulatedBackend::new().with_device(front);

        assert!(DeviceSelector::default().select(&backend).is_err());
        assert!(
            DeviceSelector::default()
                .with_position(DevicePosition::Front)
                .select(&backend)
                .is_ok()
        );
    }

    #[test]
    fn test_custom_ranking() {
        let backend = SimulatedBackend::new()
            .with_device(SimulatedDevice::dual())
            .with_device(SimulatedDevice::wide_angle());

        let selector = DeviceSelector::new(vec![DeviceType::BuiltInWideAngleCamera]);
        let device = selector.select(&backend).unwrap();
        assert_eq!(device.device_type(), DeviceType::BuiltInWideAngleCamera);
    }
}
