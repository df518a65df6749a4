// SPDX-License-Identifier: GPL-3.0-only

//! Headless demo: start a session on the simulated backend, move the ISO and
//! shutter sliders, and take one photo into the configured photo directory.

use custom_camera::backends::camera::simulated::{
    SimulatedAuthorizer, SimulatedBackend, SimulatedDevice, SimulatedPhotoOutput,
};
use custom_camera::errors::CameraError;
use custom_camera::storage::FilesystemPhotoLibrary;
use custom_camera::{CaptureSession, Config, SessionEvent, SessionStartup};
use std::sync::Arc;
use tracing::{error, info};

const DEMO_ISO_SLIDER: f32 = 0.25;
const DEMO_SHUTTER_SLIDER: f64 = 0.5;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=custom_camera=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let config = Config::load();

    let backend = SimulatedBackend::new()
        .with_device(SimulatedDevice::dual())
        .with_device(SimulatedDevice::wide_angle())
        .with_photo_output(SimulatedPhotoOutput::new().with_image_size(640, 480));
    let library = Arc::new(FilesystemPhotoLibrary::new(config.photo_directory()));
    let authorizer = SimulatedAuthorizer::prompting(true);

    let directory = library.directory().to_path_buf();
    let session = CaptureSession::new(config, Arc::new(backend), library);
    let mut events = session.subscribe();

    match session.start(&authorizer).await {
        Ok(SessionStartup::Running(device)) => println!("Using camera: {}", device.name),
        Ok(SessionStartup::Unavailable) => {
            println!("Camera unavailable: access was not granted");
            return Ok(());
        }
        Err(CameraError::NoDeviceAvailable) => {
            error!("No supported back-facing camera found");
            return Err(CameraError::NoDeviceAvailable.into());
        }
        Err(e) => return Err(e.into()),
    }

    session.set_iso(DEMO_ISO_SLIDER)?;
    session.set_shutter_speed(DEMO_SHUTTER_SLIDER)?;
    println!("Exposure: {}", session.exposure());

    let photo = session.take_photo(session.default_request()).await?;
    match photo.dimensions() {
        Some((width, height)) => println!("Captured {} photo ({}x{})", photo.format, width, height),
        None => println!("Captured {} photo ({} bytes)", photo.format, photo.data.len()),
    }
    println!("Saving to: {}", directory.display());

    session.stop()?;

    while let Ok(event) = events.try_recv() {
        if let SessionEvent::StateChanged { from, to } = event {
            info!(%from, %to, "Session state changed");
        }
    }

    Ok(())
}
