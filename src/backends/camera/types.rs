// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Kind of physical capture unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceType {
    /// Wide-angle and telephoto pair behaving as one device
    BuiltInDualCamera,
    /// Standard single wide-angle camera
    BuiltInWideAngleCamera,
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceType::BuiltInDualCamera => write!(f, "dual camera"),
            DeviceType::BuiltInWideAngleCamera => write!(f, "wide-angle camera"),
        }
    }
}

/// Which side of the device a camera faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DevicePosition {
    #[default]
    Back,
    Front,
}

impl std::fmt::Display for DevicePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DevicePosition::Back => write!(f, "back"),
            DevicePosition::Front => write!(f, "front"),
        }
    }
}

/// Exposure limits of the device's active format
///
/// A snapshot; it is re-read whenever the session needs bounds, so a format
/// change on the device is picked up on the next slider event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceCapabilities {
    pub min_iso: f32,
    pub max_iso: f32,
    pub min_exposure_duration: Duration,
    pub max_exposure_duration: Duration,
}

impl DeviceCapabilities {
    /// Shortest exposure in seconds
    pub fn min_exposure_seconds(&self) -> f64 {
        self.min_exposure_duration.as_secs_f64()
    }

    /// Longest exposure in seconds
    pub fn max_exposure_seconds(&self) -> f64 {
        self.max_exposure_duration.as_secs_f64()
    }
}

/// Raw (unprocessed sensor) pixel format, identified by its four-character code
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawPixelFormat(pub u32);

impl RawPixelFormat {
    /// 14-bit Bayer, RGGB layout
    pub const BAYER_RGGB14: Self = Self::from_fourcc(b"rgg4");
    /// 14-bit Bayer, GRBG layout
    pub const BAYER_GRBG14: Self = Self::from_fourcc(b"grb4");
    /// 14-bit Bayer, GBRG layout
    pub const BAYER_GBRG14: Self = Self::from_fourcc(b"gbr4");
    /// 14-bit Bayer, BGGR layout
    pub const BAYER_BGGR14: Self = Self::from_fourcc(b"bgg4");

    /// Build a format from a big-endian four-character code
    pub const fn from_fourcc(code: &[u8; 4]) -> Self {
        Self(u32::from_be_bytes(*code))
    }

    /// The four-character code bytes
    pub fn fourcc(&self) -> [u8; 4] {
        self.0.to_be_bytes()
    }
}

impl std::fmt::Debug for RawPixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RawPixelFormat({})", self)
    }
}

impl std::fmt::Display for RawPixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = self.fourcc();
        if code.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
            write!(f, "{}", String::from_utf8_lossy(&code))
        } else {
            write!(f, "{:#010x}", self.0)
        }
    }
}

/// Format of a captured photo sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoFormat {
    /// Encoded JPEG produced by the capture pipeline
    Jpeg,
    /// Unprocessed sensor data in the given pixel format
    Raw(RawPixelFormat),
}

impl PhotoFormat {
    /// File extension used when persisting this format
    pub fn extension(&self) -> &'static str {
        match self {
            PhotoFormat::Jpeg => "jpg",
            PhotoFormat::Raw(_) => "raw",
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, PhotoFormat::Raw(_))
    }
}

impl std::fmt::Display for PhotoFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PhotoFormat::Jpeg => write!(f, "JPEG"),
            PhotoFormat::Raw(format) => write!(f, "raw ({})", format),
        }
    }
}

/// Flash behavior for a still capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FlashMode {
    /// Let the device decide based on scene brightness
    #[default]
    Auto,
    /// Always fire
    On,
    /// Never fire
    Off,
}

/// Identity of the selected capture device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub unique_id: String,
    pub name: String,
    pub device_type: DeviceType,
    pub position: DevicePosition,
}

impl std::fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}, {})", self.name, self.device_type, self.position)
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors reported by a camera backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Another client holds the device's configuration lock
    Busy,
    /// A configuration call was made without holding the configuration lock
    NotLocked,
    /// The device or session cannot do what was asked
    Unsupported(String),
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::Busy => write!(f, "Device is locked for configuration"),
            BackendError::NotLocked => write!(f, "Device is not locked for configuration"),
            BackendError::Unsupported(msg) => write!(f, "Unsupported: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}
