// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Exponent applied to the shutter slider before scaling.
///
/// Higher values give the slider more resolution at short durations.
pub const EXPOSURE_DURATION_POWER: f64 = 5.0;

/// Shortest exposure duration (seconds) the shutter slider will produce.
///
/// Devices may report a smaller minimum, or zero; anything below this is not
/// useful for a still photo.
pub const EXPOSURE_MINIMUM_DURATION: f64 = 1.0 / 1000.0;

/// ISO used when neither the device nor the configuration provides one
pub const DEFAULT_ISO: f32 = 100.0;

/// How long a caller waits for a capture completion before giving up
pub const DEFAULT_CAPTURE_TIMEOUT: Duration = Duration::from_secs(10);

/// Buffered session events per subscriber
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Folder created under the user's pictures directory
pub const PHOTO_DIRECTORY_NAME: &str = "CustomCamera";

/// Folder created under the user's config directory
pub const CONFIG_DIRECTORY_NAME: &str = "custom-camera";

/// Configuration file name inside [`CONFIG_DIRECTORY_NAME`]
pub const CONFIG_FILE_NAME: &str = "config.json";
