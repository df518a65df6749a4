// SPDX-License-Identifier: GPL-3.0-only

//! Capture session state machine
//!
//! ```text
//! Idle ──start──> Configuring ──attached──> Running ──capture──> CaptureInFlight
//!  │  ▲                                      ▲  │                     │
//!  │  └───────────────stop───────────────────┼──┘                     │
//!  │                                         └──────result────────────┘
//!  └──access denied / no device──> Unavailable
//! ```

use crate::backends::camera::DeviceDescriptor;
use crate::exposure::ExposureConfig;
use uuid::Uuid;

/// Lifecycle of a capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Not started
    Idle,
    /// Device and outputs being attached
    Configuring,
    /// Streaming frames, ready to capture
    Running,
    /// One capture issued and not yet completed
    CaptureInFlight,
    /// Camera access was refused; terminal
    Unavailable,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Configuring => write!(f, "configuring"),
            SessionState::Running => write!(f, "running"),
            SessionState::CaptureInFlight => write!(f, "capture in flight"),
            SessionState::Unavailable => write!(f, "unavailable"),
        }
    }
}

impl SessionState {
    /// Whether the state machine allows moving to `next`
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, Configuring)
                | (Idle, Unavailable)
                | (Configuring, Running)
                | (Configuring, Idle)
                | (Configuring, Unavailable)
                | (Running, CaptureInFlight)
                | (Running, Idle)
                | (CaptureInFlight, Running)
        )
    }

    /// Whether a capture may be issued now
    pub fn can_capture(&self) -> bool {
        matches!(self, SessionState::Running)
    }
}

/// Notification published on the session's event channel
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StateChanged {
        from: SessionState,
        to: SessionState,
    },
    /// The device's exposure changed to a new value
    ExposureChanged {
        previous: ExposureConfig,
        current: ExposureConfig,
    },
    CaptureFinished {
        id: Uuid,
        succeeded: bool,
    },
}

/// Outcome of starting a session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionStartup {
    /// Streaming from the selected device
    Running(DeviceDescriptor),
    /// Camera access refused; the session will not start
    Unavailable,
}
