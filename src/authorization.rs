// SPDX-License-Identifier: GPL-3.0-only

//! Camera access authorization
//!
//! The platform reports one of four states. Only `Authorized` and a granted
//! prompt allow the session to start; everything else leaves the camera
//! unavailable.

use futures::channel::oneshot;
use tracing::{debug, info, warn};

/// Camera permission state reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStatus {
    /// The user has not been asked yet
    NotDetermined,
    /// Access is blocked by policy (e.g. parental controls) and cannot be requested
    Restricted,
    /// The user previously refused access
    Denied,
    /// The user previously granted access
    Authorized,
}

/// Platform permission prompt
pub trait Authorizer: Send + Sync {
    fn authorization_status(&self) -> AuthorizationStatus;

    /// Ask the user for access; `completion` receives the answer
    fn request_access(&self, completion: Box<dyn FnOnce(bool) + Send>);
}

/// Resolve whether the camera may be used, prompting if needed
pub async fn check_authorization(authorizer: &dyn Authorizer) -> bool {
    match authorizer.authorization_status() {
        AuthorizationStatus::Authorized => {
            debug!("Camera access previously granted");
            true
        }
        AuthorizationStatus::NotDetermined => {
            info!("Requesting camera access");
            let (sender, receiver) = oneshot::channel();
            authorizer.request_access(Box::new(move |granted| {
                let _ = sender.send(granted);
            }));
            // A prompt that never answers counts as a refusal
            let granted = receiver.await.unwrap_or(false);
            info!(granted, "Camera access request answered");
            granted
        }
        AuthorizationStatus::Denied => {
            warn!("Camera access denied");
            false
        }
        AuthorizationStatus::Restricted => {
            warn!("Camera access restricted");
            false
        }
    }
}
