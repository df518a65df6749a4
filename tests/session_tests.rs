// SPDX-License-Identifier: MPL-2.0

//! Integration tests for the capture session

use custom_camera::authorization::AuthorizationStatus;
use custom_camera::backends::camera::simulated::{
    CompletionMode, ExposureWrite, SimulatedAuthorizer, SimulatedBackend, SimulatedDevice,
    SimulatedPhotoOutput,
};
use custom_camera::backends::camera::{CaptureDevice, PhotoFormat, RawPixelFormat};
use custom_camera::errors::{CaptureError, ConfigError};
use custom_camera::pipelines::photo::CaptureRequest;
use custom_camera::storage::FilesystemPhotoLibrary;
use custom_camera::{CaptureSession, Config, ExposureConfig, SessionEvent, SessionState};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

fn authorized() -> SimulatedAuthorizer {
    SimulatedAuthorizer::new(AuthorizationStatus::Authorized)
}

async fn running_session(
    device: Arc<SimulatedDevice>,
    output: SimulatedPhotoOutput,
    config: Config,
) -> (CaptureSession, Arc<SimulatedPhotoOutput>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let backend = SimulatedBackend::new()
        .with_device(device)
        .with_photo_output(output);
    let output = backend.photo_output();
    let library = Arc::new(FilesystemPhotoLibrary::new(dir.path()));

    let session = CaptureSession::new(config, Arc::new(backend), library);
    session.start(&authorized()).await.unwrap();
    (session, output, dir)
}

// Saving runs in the background; poll until files show up
async fn saved_files(dir: &Path) -> Vec<PathBuf> {
    for _ in 0..100 {
        let files: Vec<PathBuf> = std::fs::read_dir(dir)
            .unwrap()
            .flatten()
            .map(|entry| entry.path())
            .collect();
        if !files.is_empty() {
            return files;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    Vec::new()
}

fn named_for(path: &Path, id: Uuid) -> bool {
    let prefix = &id.simple().to_string()[..8];
    path.file_name()
        .map(|name| name.to_string_lossy().contains(prefix))
        .unwrap_or(false)
}

#[tokio::test]
async fn test_concurrent_exposure_changes_stay_consistent() {
    let device = Arc::new(SimulatedDevice::dual());
    let (session, _output, _dir) =
        running_session(Arc::clone(&device), SimulatedPhotoOutput::new(), Config::default()).await;

    let a = ExposureConfig::new(100.0, 0.01);
    let b = ExposureConfig::new(400.0, 0.25);

    std::thread::scope(|scope| {
        for config in [a, b] {
            let session = &session;
            scope.spawn(move || {
                for _ in 0..200 {
                    match session.apply_exposure(config) {
                        Ok(()) => {}
                        Err(e) => assert_eq!(e, ConfigError::LockUnavailable),
                    }
                }
            });
        }
    });

    let submitted = [a, b].map(|config| ExposureWrite {
        duration: config.duration().unwrap(),
        iso: config.iso,
    });
    let writes = device.exposure_writes();
    assert!(!writes.is_empty());
    for write in &writes {
        assert!(submitted.contains(write), "Torn exposure write: {:?}", write);
    }

    // Stored exposure matches what the device last accepted
    let last = *writes.last().unwrap();
    let stored = session.exposure();
    assert_eq!(stored.iso, last.iso);
    assert_eq!(stored.duration(), Some(last.duration));
    assert!(!device.is_locked());
}

#[tokio::test]
async fn test_jpeg_capture_is_decoded_and_saved() {
    let (session, output, dir) = running_session(
        Arc::new(SimulatedDevice::dual()),
        SimulatedPhotoOutput::new().with_image_size(40, 30),
        Config::default(),
    )
    .await;

    let photo = session.take_photo(CaptureRequest::default()).await.unwrap();
    assert_eq!(photo.format, PhotoFormat::Jpeg);
    assert_eq!(photo.dimensions(), Some((40, 30)));

    let settings = &output.issued_settings()[0];
    assert_eq!(settings.raw_pixel_format, None);
    assert!(settings.auto_still_image_stabilization);
    assert_eq!(photo.id, settings.unique_id);

    let files = saved_files(dir.path()).await;
    assert_eq!(files.len(), 1);
    assert!(named_for(&files[0], photo.id));
}

#[tokio::test]
async fn test_capture_and_wait_saves_photo() {
    let (session, output, dir) = running_session(
        Arc::new(SimulatedDevice::dual()),
        SimulatedPhotoOutput::new().with_completion_mode(CompletionMode::Deferred),
        Config::default(),
    )
    .await;

    let pending = session.capture_photo(CaptureRequest::default()).unwrap();
    let id = pending.id();
    output.complete_next();

    let photo = pending.wait().await.unwrap();
    assert_eq!(photo.id, id);

    let files = saved_files(dir.path()).await;
    assert_eq!(files.len(), 1);
    assert!(named_for(&files[0], id));
}

#[tokio::test]
async fn test_requested_raw_format_is_used_when_offered() {
    let output = SimulatedPhotoOutput::new()
        .with_raw_formats(vec![RawPixelFormat::BAYER_GRBG14, RawPixelFormat::BAYER_BGGR14]);
    let (session, _output, _dir) =
        running_session(Arc::new(SimulatedDevice::dual()), output, Config::default()).await;

    let request = CaptureRequest::default().with_raw_pixel_format(RawPixelFormat::BAYER_BGGR14);
    let photo = session.take_photo(request).await.unwrap();

    assert_eq!(photo.format, PhotoFormat::Raw(RawPixelFormat::BAYER_BGGR14));
    assert!(photo.image.is_none());
}

#[tokio::test]
async fn test_in_flight_capture_still_completes_after_rejection() {
    let (session, output, _dir) = running_session(
        Arc::new(SimulatedDevice::dual()),
        SimulatedPhotoOutput::new().with_completion_mode(CompletionMode::Deferred),
        Config::default(),
    )
    .await;
    let mut events = session.subscribe();

    let first = session.capture_photo(CaptureRequest::default()).unwrap();
    let id = first.id();
    assert_eq!(
        session.capture_photo(CaptureRequest::default()).unwrap_err(),
        CaptureError::CaptureAlreadyInProgress
    );

    output.complete_next();
    assert_eq!(first.wait().await.unwrap().id, id);

    let mut finished = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::CaptureFinished { id, succeeded } = event {
            finished.push((id, succeeded));
        }
    }
    assert_eq!(finished, vec![(id, true)]);

    // Session accepts the next capture
    let next = session.capture_photo(CaptureRequest::default()).unwrap();
    output.complete_next();
    assert!(next.wait().await.is_ok());
}

#[tokio::test]
async fn test_abandoned_capture_reports_failure() {
    let (session, output, _dir) = running_session(
        Arc::new(SimulatedDevice::dual()),
        SimulatedPhotoOutput::new().with_completion_mode(CompletionMode::Deferred),
        Config::default(),
    )
    .await;

    let pending = session.capture_photo(CaptureRequest::default()).unwrap();
    assert!(output.abandon_next());

    assert!(matches!(
        pending.wait().await,
        Err(CaptureError::CaptureFailed(_))
    ));
    assert_eq!(session.state(), SessionState::Running);
}

#[tokio::test]
async fn test_timed_out_capture_is_still_saved() {
    let config = Config {
        capture_timeout_ms: 20,
        ..Config::default()
    };
    let (session, output, dir) = running_session(
        Arc::new(SimulatedDevice::dual()),
        SimulatedPhotoOutput::new().with_completion_mode(CompletionMode::Deferred),
        config,
    )
    .await;

    let result = session.take_photo(CaptureRequest::default()).await;
    assert_eq!(
        result.unwrap_err(),
        CaptureError::Timeout(Duration::from_millis(20))
    );
    assert_eq!(session.state(), SessionState::CaptureInFlight);

    // Late completion returns the session to running and is still persisted
    let id = output.issued_settings()[0].unique_id;
    assert!(output.complete_next());
    assert_eq!(session.state(), SessionState::Running);

    let files = saved_files(dir.path()).await;
    assert_eq!(files.len(), 1);
    assert!(named_for(&files[0], id));
}

#[tokio::test]
async fn test_exposure_is_clamped_after_format_change() {
    let device = Arc::new(SimulatedDevice::dual());
    let (session, _output, _dir) =
        running_session(Arc::clone(&device), SimulatedPhotoOutput::new(), Config::default()).await;

    let mut caps = device.capabilities();
    caps.max_iso = 200.0;
    device.set_capabilities(caps);

    session.apply_exposure(ExposureConfig::new(600.0, 0.01)).unwrap();
    assert_eq!(session.exposure().iso, 200.0);
    assert_eq!(device.current_exposure().iso, 200.0);
}

#[tokio::test]
async fn test_configured_initial_iso() {
    let config = Config {
        initial_iso: Some(320.0),
        ..Config::default()
    };
    let (session, _output, _dir) =
        running_session(Arc::new(SimulatedDevice::dual()), SimulatedPhotoOutput::new(), config)
            .await;

    assert_eq!(session.exposure().iso, 320.0);
}
