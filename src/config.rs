// SPDX-License-Identifier: GPL-3.0-only

use crate::backends::camera::{DeviceType, FlashMode, selector::DEFAULT_DEVICE_PREFERENCE};
use crate::constants::{
    CONFIG_DIRECTORY_NAME, CONFIG_FILE_NAME, DEFAULT_CAPTURE_TIMEOUT, EXPOSURE_DURATION_POWER,
    EXPOSURE_MINIMUM_DURATION, PHOTO_DIRECTORY_NAME,
};
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// User configuration
///
/// Stored as JSON; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Exponent applied to the shutter slider (higher = finer control at short durations)
    pub exposure_duration_power: f64,
    /// Shortest exposure duration in seconds the shutter slider will produce
    pub exposure_minimum_duration: f64,
    /// ISO to start with; `None` keeps the device's current ISO
    pub initial_iso: Option<f32>,
    /// Back camera kinds to try, best first
    pub device_preference: Vec<DeviceType>,
    /// Flash mode for new capture requests
    pub flash_mode: FlashMode,
    /// Still image stabilization for new capture requests (ignored for raw captures)
    pub stabilization: bool,
    /// How long to wait for a capture result, in milliseconds
    pub capture_timeout_ms: u64,
    /// Where photos are written; `None` uses the user's pictures folder
    pub photo_directory: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exposure_duration_power: EXPOSURE_DURATION_POWER,
            exposure_minimum_duration: EXPOSURE_MINIMUM_DURATION,
            initial_iso: None,
            device_preference: DEFAULT_DEVICE_PREFERENCE.to_vec(),
            flash_mode: FlashMode::Auto,
            stabilization: true,
            capture_timeout_ms: DEFAULT_CAPTURE_TIMEOUT.as_millis() as u64,
            photo_directory: None,
        }
    }
}

impl Config {
    /// Default location of the configuration file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIRECTORY_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load from the default location, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            warn!("No config directory on this system, using default configuration");
            return Self::default();
        };

        if !path.exists() {
            debug!(path = %path.display(), "No configuration file, using defaults");
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Invalid configuration, using defaults");
                Self::default()
            }
        }
    }

    /// Load and validate a configuration file
    pub fn load_from(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validate()?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Write the configuration as pretty JSON, creating parent directories
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        debug!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Reject values the exposure mapper and session cannot work with
    pub fn validate(&self) -> AppResult<()> {
        if !self.exposure_duration_power.is_finite() || self.exposure_duration_power <= 0.0 {
            return Err(AppError::Settings(format!(
                "exposure_duration_power must be positive, got {}",
                self.exposure_duration_power
            )));
        }
        if !self.exposure_minimum_duration.is_finite() || self.exposure_minimum_duration < 0.0 {
            return Err(AppError::Settings(format!(
                "exposure_minimum_duration must be a non-negative number of seconds, got {}",
                self.exposure_minimum_duration
            )));
        }
        if let Some(iso) = self
            .initial_iso
            .filter(|iso| !iso.is_finite() || *iso <= 0.0)
        {
            return Err(AppError::Settings(format!(
                "initial_iso must be positive, got {}",
                iso
            )));
        }
        if self.capture_timeout_ms == 0 {
            return Err(AppError::Settings(
                "capture_timeout_ms must be at least 1 millisecond".to_string(),
            ));
        }
        if self.device_preference.is_empty() {
            return Err(AppError::Settings(
                "device_preference must name at least one device type".to_string(),
            ));
        }
        Ok(())
    }

    /// Bounded wait for capture completion
    pub fn capture_timeout(&self) -> Duration {
        Duration::from_millis(self.capture_timeout_ms)
    }

    /// Directory photos are written to
    pub fn photo_directory(&self) -> PathBuf {
        self.photo_directory
            .clone()
            .unwrap_or_else(default_photo_directory)
    }
}

/// `~/Pictures/CustomCamera`, or `./CustomCamera` when there is no pictures folder
pub fn default_photo_directory() -> PathBuf {
    dirs::picture_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(PHOTO_DIRECTORY_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{ "initial_iso": 200.0 }"#).unwrap();
        assert_eq!(config.initial_iso, Some(200.0));
        assert_eq!(config.exposure_duration_power, EXPOSURE_DURATION_POWER);
        assert_eq!(config.device_preference, DEFAULT_DEVICE_PREFERENCE.to_vec());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = Config {
            exposure_duration_power: 0.0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            exposure_minimum_duration: -0.5,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            device_preference: Vec::new(),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            initial_iso: Some(f32::NAN),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            capture_timeout_ms: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_capture_timeout() {
        let config = Config {
            capture_timeout_ms: 250,
            ..Config::default()
        };
        assert_eq!(config.capture_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_explicit_photo_directory() {
        let config = Config {
            photo_directory: Some(PathBuf::from("/tmp/shots")),
            ..Config::default()
        };
        assert_eq!(config.photo_directory(), PathBuf::from("/tmp/shots"));
    }
}
