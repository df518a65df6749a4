// SPDX-License-Identifier: MPL-2.0

//! Error types for the camera application

use crate::backends::camera::BackendError;
use crate::session::SessionState;
use std::fmt;
use std::time::Duration;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Device selection and session setup errors
    Camera(CameraError),
    /// Exposure configuration errors
    Config(ConfigError),
    /// Photo capture errors
    Capture(CaptureError),
    /// Settings file errors
    Settings(String),
}

/// Device selection and session setup errors
#[derive(Debug, Clone, PartialEq)]
pub enum CameraError {
    /// None of the preferred back-facing devices exist. Fatal at startup.
    NoDeviceAvailable,
    /// The backend refused to attach the device or an output
    SessionSetupFailed(String),
    /// The operation is not valid in the session's current state
    InvalidState(SessionState),
}

/// Exposure configuration errors
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Another configuration of the device is in progress
    LockUnavailable,
    /// No device is attached to the session yet
    NoDevice,
    /// The device rejected the configuration
    Rejected(String),
}

/// Photo capture errors
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureError {
    /// The photo output has not been attached to a running session
    NoOutputConfigured,
    /// A capture is already in flight
    CaptureAlreadyInProgress,
    /// The capture subsystem reported a failure
    CaptureFailed(String),
    /// No completion arrived within the wait bound
    Timeout(Duration),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Camera(e) => write!(f, "Camera error: {}", e),
            AppError::Config(e) => write!(f, "Exposure configuration error: {}", e),
            AppError::Capture(e) => write!(f, "Capture error: {}", e),
            AppError::Settings(msg) => write!(f, "Settings error: {}", msg),
        }
    }
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::NoDeviceAvailable => {
                write!(f, "No supported back-facing capture device available")
            }
            CameraError::SessionSetupFailed(msg) => write!(f, "Session setup failed: {}", msg),
            CameraError::InvalidState(state) => {
                write!(f, "Operation not allowed while session is {}", state)
            }
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::LockUnavailable => {
                write!(f, "Device configuration lock unavailable")
            }
            ConfigError::NoDevice => write!(f, "No capture device attached"),
            ConfigError::Rejected(msg) => write!(f, "Device rejected configuration: {}", msg),
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::NoOutputConfigured => write!(f, "No photo output configured"),
            CaptureError::CaptureAlreadyInProgress => write!(f, "Capture already in progress"),
            CaptureError::CaptureFailed(msg) => write!(f, "Capture failed: {}", msg),
            CaptureError::Timeout(after) => {
                write!(f, "No capture result after {} ms", after.as_millis())
            }
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for CameraError {}
impl std::error::Error for ConfigError {}
impl std::error::Error for CaptureError {}

// Conversions from sub-errors to AppError
impl From<CameraError> for AppError {
    fn from(err: CameraError) -> Self {
        AppError::Camera(err)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<CaptureError> for AppError {
    fn from(err: CaptureError) -> Self {
        AppError::Capture(err)
    }
}

impl From<BackendError> for ConfigError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Busy => ConfigError::LockUnavailable,
            other => ConfigError::Rejected(other.to_string()),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Settings(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Settings(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_backend_maps_to_lock_unavailable() {
        assert_eq!(
            ConfigError::from(BackendError::Busy),
            ConfigError::LockUnavailable
        );
        assert!(matches!(
            ConfigError::from(BackendError::NotLocked),
            ConfigError::Rejected(_)
        ));
    }

    #[test]
    fn test_app_error_display() {
        let err: AppError = CaptureError::CaptureAlreadyInProgress.into();
        assert_eq!(
            err.to_string(),
            "Capture error: Capture already in progress"
        );

        let err: AppError = CameraError::InvalidState(SessionState::CaptureInFlight).into();
        assert!(err.to_string().contains("capture in flight"));
    }
}
