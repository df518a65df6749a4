// SPDX-License-Identifier: GPL-3.0-only

//! Exposure mapping
//!
//! Converts normalized slider positions (0.0 to 1.0) into ISO and exposure
//! duration values inside the bounds reported by the device's active format.
//!
//! ISO maps linearly. Shutter duration is warped by a power curve first,
//! which spends most of the slider's travel on short durations:
//!
//! ```text
//! p        = slider ^ duration_power
//! duration = p * (max(max_dev, floor) - max(min_dev, floor)) + max(min_dev, floor)
//! ```

use crate::backends::camera::DeviceCapabilities;
use crate::config::Config;
use crate::constants::{EXPOSURE_DURATION_POWER, EXPOSURE_MINIMUM_DURATION};
use std::time::Duration;

/// Manual exposure values for the device
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExposureConfig {
    /// Sensor sensitivity
    pub iso: f32,
    /// Exposure duration in seconds
    pub shutter_duration: f64,
}

impl ExposureConfig {
    pub fn new(iso: f32, shutter_duration: f64) -> Self {
        Self {
            iso,
            shutter_duration,
        }
    }

    /// Clamp both values into the device's reported bounds
    ///
    /// Never panics, even for inverted bounds or NaN input.
    pub fn clamped_to(&self, capabilities: &DeviceCapabilities) -> Self {
        Self {
            iso: clamp_f32(self.iso, capabilities.min_iso, capabilities.max_iso),
            shutter_duration: clamp_f64(
                self.shutter_duration,
                capabilities.min_exposure_seconds(),
                capabilities.max_exposure_seconds(),
            ),
        }
    }

    /// Exposure duration as a `Duration`, or `None` if it is not representable
    pub fn duration(&self) -> Option<Duration> {
        Duration::try_from_secs_f64(self.shutter_duration).ok()
    }

    /// Replace the ISO
    pub fn with_iso(self, iso: f32) -> Self {
        Self { iso, ..self }
    }

    /// Replace the shutter duration
    pub fn with_shutter_duration(self, shutter_duration: f64) -> Self {
        Self {
            shutter_duration,
            ..self
        }
    }
}

impl std::fmt::Display for ExposureConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ISO {:.0}, {:.6} s", self.iso, self.shutter_duration)
    }
}

/// Tunable shape of the shutter slider
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExposureCurve {
    /// Exponent applied to the slider position
    pub duration_power: f64,
    /// Shortest useful duration in seconds
    pub minimum_duration: f64,
}

impl Default for ExposureCurve {
    fn default() -> Self {
        Self {
            duration_power: EXPOSURE_DURATION_POWER,
            minimum_duration: EXPOSURE_MINIMUM_DURATION,
        }
    }
}

impl ExposureCurve {
    pub fn new(duration_power: f64, minimum_duration: f64) -> Self {
        Self {
            duration_power,
            minimum_duration,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.exposure_duration_power,
            config.exposure_minimum_duration,
        )
    }

    /// Map a slider position to an exposure duration in seconds
    pub fn map_shutter_speed(
        &self,
        slider_value: f64,
        min_exposure_duration: f64,
        max_exposure_duration: f64,
    ) -> f64 {
        let p = normalize_slider(slider_value).powf(self.duration_power);

        let min_seconds = min_exposure_duration.max(self.minimum_duration);
        let max_seconds = max_exposure_duration.max(self.minimum_duration);

        p * (max_seconds - min_seconds) + min_seconds
    }

    /// Map a slider position to a duration within the device's bounds
    pub fn shutter_speed_for(&self, slider_value: f64, capabilities: &DeviceCapabilities) -> f64 {
        self.map_shutter_speed(
            slider_value,
            capabilities.min_exposure_seconds(),
            capabilities.max_exposure_seconds(),
        )
    }
}

/// Map a slider position to an ISO value between the device's limits
pub fn map_iso(slider_value: f32, min_iso: f32, max_iso: f32) -> f32 {
    normalize_slider_f32(slider_value) * (max_iso - min_iso) + min_iso
}

/// Map a slider position to an ISO value within the device's bounds
pub fn iso_for(slider_value: f32, capabilities: &DeviceCapabilities) -> f32 {
    map_iso(slider_value, capabilities.min_iso, capabilities.max_iso)
}

/// Map a slider position to an exposure duration in seconds
///
/// Uses [`EXPOSURE_DURATION_POWER`] as the curve exponent and `floor_duration`
/// as the shortest allowed duration.
pub fn map_shutter_speed(
    slider_value: f64,
    min_exposure_duration: f64,
    max_exposure_duration: f64,
    floor_duration: f64,
) -> f64 {
    ExposureCurve::new(EXPOSURE_DURATION_POWER, floor_duration).map_shutter_speed(
        slider_value,
        min_exposure_duration,
        max_exposure_duration,
    )
}

// Slider input outside [0, 1] (or NaN) is pinned to the nearest end.
fn normalize_slider(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

fn normalize_slider_f32(value: f32) -> f32 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

fn clamp_f32(value: f32, min: f32, max: f32) -> f32 {
    if value.is_nan() {
        return min;
    }
    value.max(min).min(max)
}

fn clamp_f64(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        return min;
    }
    value.max(min).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps() -> DeviceCapabilities {
        DeviceCapabilities {
            min_iso: 22.0,
            max_iso: 704.0,
            min_exposure_duration: Duration::from_micros(200),
            max_exposure_duration: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_iso_endpoints() {
        assert_eq!(map_iso(0.0, 22.0, 704.0), 22.0);
        assert_eq!(map_iso(1.0, 22.0, 704.0), 704.0);
        assert_eq!(map_iso(0.5, 100.0, 300.0), 200.0);
    }

    #[test]
    fn test_iso_out_of_range_slider_is_pinned() {
        assert_eq!(map_iso(-0.5, 22.0, 704.0), 22.0);
        assert_eq!(map_iso(1.5, 22.0, 704.0), 704.0);
        assert_eq!(map_iso(f32::NAN, 22.0, 704.0), 22.0);
    }

    #[test]
    fn test_shutter_half_slider() {
        let value = map_shutter_speed(0.5, 0.0002, 1.0, 0.001);
        let expected = 0.5f64.powi(5) * (1.0 - 0.001) + 0.001;
        assert!((value - expected).abs() < 1e-12);
        assert!((value - 0.0321).abs() < 1e-3);
    }

    #[test]
    fn test_shutter_floor_replaces_zero_minimum() {
        assert!((map_shutter_speed(0.0, 0.0, 0.5, 0.001) - 0.001).abs() < 1e-12);
    }

    #[test]
    fn test_shutter_floor_above_device_maximum() {
        // Both ends collapse onto the floor
        assert_eq!(map_shutter_speed(0.0, 0.0001, 0.0005, 0.001), 0.001);
        assert_eq!(map_shutter_speed(1.0, 0.0001, 0.0005, 0.001), 0.001);
    }

    #[test]
    fn test_custom_curve_power() {
        let linear = ExposureCurve::new(1.0, 0.001);
        let value = linear.map_shutter_speed(0.5, 0.0, 1.001);
        assert!((value - 0.501).abs() < 1e-12);
    }

    #[test]
    fn test_clamped_to_capabilities() {
        let clamped = ExposureConfig::new(5000.0, 10.0).clamped_to(&caps());
        assert_eq!(clamped.iso, 704.0);
        assert_eq!(clamped.shutter_duration, 1.0);

        let clamped = ExposureConfig::new(1.0, 0.0).clamped_to(&caps());
        assert_eq!(clamped.iso, 22.0);
        assert!((clamped.shutter_duration - 0.0002).abs() < 1e-12);
    }

    #[test]
    fn test_clamp_handles_inverted_bounds() {
        let inverted = DeviceCapabilities {
            min_iso: 800.0,
            max_iso: 100.0,
            ..caps()
        };
        // No panic; result is one of the bounds
        let clamped = ExposureConfig::new(400.0, 0.01).clamped_to(&inverted);
        assert!(clamped.iso == 100.0 || clamped.iso == 800.0);
    }

    #[test]
    fn test_duration_conversion() {
        let config = ExposureConfig::new(100.0, 0.25);
        assert_eq!(config.duration(), Some(Duration::from_millis(250)));
        assert_eq!(ExposureConfig::new(100.0, -1.0).duration(), None);
    }

    #[test]
    fn test_shutter_speed_for_capabilities() {
        let curve = ExposureCurve::default();
        assert!((curve.shutter_speed_for(0.0, &caps()) - 0.001).abs() < 1e-12);
        assert!((curve.shutter_speed_for(1.0, &caps()) - 1.0).abs() < 1e-12);
    }
}
