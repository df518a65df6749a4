// SPDX-License-Identifier: MPL-2.0

//! Custom Camera - manual exposure still capture
//!
//! This library provides the core of a camera app with manual ISO and
//! shutter-speed control: device selection, slider-to-exposure mapping and a
//! capture session that applies exposure and takes photos.
//!
//! # Architecture
//!
//! - [`backends`]: Camera backend traits and the simulated backend
//! - [`exposure`]: Slider to ISO / shutter duration mapping
//! - [`session`]: Capture session state machine
//! - [`pipelines`]: Capture completion handling
//! - [`authorization`]: Camera permission check
//! - [`config`]: User configuration handling
//! - [`storage`]: Photo library
//!
//! # Example
//!
//! ```ignore
//! let session = CaptureSession::new(config, backend, library);
//! session.start(&authorizer).await?;
//! session.set_iso(0.5)?;
//! session.set_shutter_speed(0.25)?;
//! let photo = session.take_photo(session.default_request()).await?;
//! ```

pub mod authorization;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod exposure;
pub mod pipelines;
pub mod session;
pub mod storage;

// Re-export commonly used types
pub use config::Config;
pub use errors::{AppError, AppResult, CameraError, CaptureError, ConfigError};
pub use exposure::{ExposureConfig, ExposureCurve};
pub use session::{CaptureSession, SessionEvent, SessionStartup, SessionState};
