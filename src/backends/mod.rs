// SPDX-License-Identifier: MPL-2.0

//! Backend abstraction layer for camera capture
//!
//! The capture session talks to hardware only through the traits in
//! [`camera`], so a platform stack or the in-process simulator can sit
//! underneath it:
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               Capture Session                │
//! └────────────────────┬────────────────────────┘
//!                      │
//! ┌────────────────────┴────────────────────────┐
//! │              Backend Layer                   │
//! │  ┌───────────────┐   ┌──────────────────┐   │
//! │  │ CameraBackend │   │  CaptureDevice   │   │
//! │  └───────────────┘   └──────────────────┘   │
//! │  ┌───────────────┐   ┌──────────────────┐   │
//! │  │  PhotoOutput  │   │    Simulated     │   │
//! │  └───────────────┘   └──────────────────┘   │
//! └─────────────────────────────────────────────┘
//! ```

pub mod camera;
