//! Capture orchestration tests
//!
//! Drives `CaptureEngine` against scripted devices to check retry order,
//! early exit, failure aggregation and cancellation.

use sessioncam::capture::CaptureEngine;
use sessioncam::negotiation::Backend;
use sessioncam::testing::{black_frame, gradient_frame, ScriptedDevice, ScriptedRead};
use sessioncam::{AttemptOutcome, CameraError, CaptureEvent, CaptureRequest, NegotiationConfig};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn negotiation(backends: &[&str], attempts: u32) -> NegotiationConfig {
    NegotiationConfig {
        backend_order: backends.iter().map(|s| s.to_string()).collect(),
        pixel_formats: vec!["auto".to_string()],
        convert_rgb_mode: "auto".to_string(),
        resolutions: vec!["auto".to_string()],
        attempts_per_combination: attempts,
        warmup_frames: 6,
    }
}

fn request() -> CaptureRequest {
    CaptureRequest::new(CaptureEvent::Unlock, "test-host").with_camera_index(1)
}

#[tokio::test]
async fn test_falls_through_open_failure_and_black_frame() {
    // Backend A fails to open on both of its attempts; B is black on attempt 1
    // and good on attempt 2
    let device = ScriptedDevice::new()
        .failing_open(Backend::MediaFoundation)
        .with_reads(0, vec![ScriptedRead::Frame(black_frame(64, 48))])
        .with_reads(1, vec![ScriptedRead::Frame(gradient_frame(64, 48))]);
    let engine = CaptureEngine::new(device, negotiation(&["msmf", "v4l2", "any"], 2));

    let result = engine
        .capture_once(&request(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.diagnostics.attempts, 4);
    assert_eq!(result.diagnostics.backend, "v4l2");
    assert_eq!(result.diagnostics.failure_code, None);
    assert_eq!(result.error_message, None);
    assert_eq!(result.camera_device_name, "camera-index-1");
    assert_eq!(result.diagnostics.selected_camera_index, Some(1));
    assert_eq!(result.diagnostics.used_camera_index, 1);

    let outcomes: Vec<(String, u32, AttemptOutcome)> = result
        .diagnostics
        .attempt_details
        .iter()
        .map(|d| (d.backend.clone(), d.attempt, d.outcome))
        .collect();
    assert_eq!(
        outcomes,
        vec![
            ("msmf".to_string(), 1, AttemptOutcome::OpenFailed),
            ("msmf".to_string(), 2, AttemptOutcome::OpenFailed),
            ("v4l2".to_string(), 1, AttemptOutcome::BlackFrame),
            ("v4l2".to_string(), 2, AttemptOutcome::Success),
        ]
    );

    let bytes = result.image_bytes.as_ref().unwrap();
    assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    assert!(!result.diagnostics.final_frame_stats.unwrap().is_black_frame);
}

#[tokio::test]
async fn test_only_one_open_per_failed_combination_when_attempts_is_one() {
    let device = ScriptedDevice::new()
        .failing_open(Backend::MediaFoundation)
        .failing_open(Backend::Video4Linux)
        .with_reads(0, vec![ScriptedRead::Frame(gradient_frame(32, 32))]);
    let engine = CaptureEngine::new(device, negotiation(&["msmf", "v4l2", "any"], 1));

    let result = engine
        .capture_once(&request(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.diagnostics.attempts, 3);
    assert_eq!(result.diagnostics.backend, "any");
    assert_eq!(engine.device().open_count(), 3);
}

#[tokio::test]
async fn test_exhaustion_reports_last_attempt() {
    // Every session reads nothing; the final combination ends with a fault
    let device = ScriptedDevice::new()
        .failing_open(Backend::MediaFoundation)
        .with_reads(1, vec![ScriptedRead::Fault("sensor unplugged".to_string())])
        .with_default_read(ScriptedRead::Empty);
    let engine = CaptureEngine::new(device, negotiation(&["msmf", "any"], 2))
        .with_backoff(Duration::from_millis(1));

    let result = engine
        .capture_once(&request(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(!result.success);
    assert!(result.image_bytes.is_none());
    assert_eq!(result.diagnostics.attempts, 4);
    assert_eq!(result.diagnostics.attempt_details.len(), 4);

    let last = result.diagnostics.attempt_details.last().unwrap();
    assert_eq!(last.outcome, AttemptOutcome::Exception);
    assert_eq!(result.diagnostics.failure_code.as_deref(), Some("exception"));
    assert_eq!(result.error_message, last.message);
    assert!(result.error_message.unwrap().contains("sensor unplugged"));

    let outcomes: Vec<AttemptOutcome> = result
        .diagnostics
        .attempt_details
        .iter()
        .map(|d| d.outcome)
        .collect();
    assert_eq!(
        outcomes,
        vec![
            AttemptOutcome::OpenFailed,
            AttemptOutcome::OpenFailed,
            AttemptOutcome::ReadFailed,
            AttemptOutcome::Exception,
        ]
    );
}

#[tokio::test]
async fn test_read_failed_message() {
    let device = ScriptedDevice::new();
    let engine = CaptureEngine::new(device, negotiation(&["any"], 1));

    let result = engine
        .capture_once(&request(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.diagnostics.failure_code.as_deref(), Some("read_failed"));
    assert_eq!(
        result.error_message.as_deref(),
        Some("Unable to read frame from camera.")
    );
    // Warmup reads happen on the single open
    assert_eq!(engine.device().read_count(), 6);
    assert_eq!(engine.device().close_count(), 1);
}

#[tokio::test]
async fn test_cancelled_before_first_attempt() {
    let device = ScriptedDevice::new().with_default_read(ScriptedRead::Frame(gradient_frame(8, 8)));
    let engine = CaptureEngine::new(device, negotiation(&["any"], 2));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = engine.capture_once(&request(), &cancel).await;

    assert!(matches!(result, Err(CameraError::Cancelled)));
    assert_eq!(engine.device().open_count(), 0);
}

#[tokio::test]
async fn test_cancel_during_attempt_stops_at_backoff() {
    let cancel = CancellationToken::new();
    let device = ScriptedDevice::new()
        .cancel_on_open(cancel.clone())
        .with_default_read(ScriptedRead::Frame(black_frame(8, 8)));
    let engine = CaptureEngine::new(device, negotiation(&["v4l2", "any"], 3))
        .with_backoff(Duration::from_secs(30));

    let result = tokio::time::timeout(
        Duration::from_secs(10),
        engine.capture_once(&request(), &cancel),
    )
    .await
    .expect("cancellation should interrupt the backoff");

    assert!(matches!(result, Err(CameraError::Cancelled)));
    // The in-flight attempt ran to completion and released the device
    assert_eq!(engine.device().open_count(), 1);
    assert_eq!(engine.device().close_count(), 1);
}

#[tokio::test]
async fn test_cancel_during_final_attempt_still_reports_failure() {
    let cancel = CancellationToken::new();
    let device = ScriptedDevice::new()
        .cancel_on_open(cancel.clone())
        .with_default_read(ScriptedRead::Frame(black_frame(8, 8)));
    let engine = CaptureEngine::new(device, negotiation(&["any"], 1));

    let result = engine.capture_once(&request(), &cancel).await.unwrap();

    // Nothing was left to try, so the finished search is reported as exhausted
    assert!(!result.success);
    assert_eq!(result.diagnostics.attempts, 1);
    assert_eq!(result.diagnostics.failure_code.as_deref(), Some("black_frame"));
    assert_eq!(engine.device().close_count(), 1);
}

#[tokio::test]
async fn test_hints_reach_the_device() {
    let device = ScriptedDevice::new().with_default_read(ScriptedRead::Frame(gradient_frame(32, 24)));
    let mut config = negotiation(&["v4l2"], 1);
    config.pixel_formats = vec!["MJPG".to_string()];
    config.resolutions = vec!["1280x720".to_string()];
    config.convert_rgb_mode = "false".to_string();
    let engine = CaptureEngine::new(device, config);

    let result = engine
        .capture_once(&request(), &CancellationToken::new())
        .await
        .unwrap();
    assert!(result.success);

    let calls = engine.device().open_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].index, 1);
    assert_eq!(calls[0].backend, Backend::Video4Linux);
    assert_eq!(calls[0].hints.resolution(), Some((1280, 720)));
    assert_eq!(calls[0].hints.force_convert_rgb, Some(false));

    let detail = &result.diagnostics.attempt_details[0];
    assert_eq!(detail.requested_pixel_format, "MJPG");
    assert_eq!(detail.requested_resolution, "1280x720");
    assert_eq!(detail.requested_convert_rgb_mode, "false");
    assert_eq!(detail.actual_pixel_format.as_deref(), Some("MJPG"));
    assert_eq!(detail.actual_width, Some(1280));
}

#[tokio::test]
async fn test_post_processing_applies_to_encoded_output() {
    let device = ScriptedDevice::new().with_default_read(ScriptedRead::Frame(gradient_frame(640, 480)));
    let engine = CaptureEngine::new(device, negotiation(&["any"], 1));
    let request = CaptureRequest::new(CaptureEvent::Logon, "desk-01")
        .with_max_width(320)
        .with_watermark("%H:%M");

    let result = engine
        .capture_once(&request, &CancellationToken::new())
        .await
        .unwrap();

    let decoded = image::load_from_memory(result.image_bytes.as_ref().unwrap()).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (320, 240));
    // Stats describe the frame as read, before resizing
    assert_eq!(result.diagnostics.final_frame_stats.unwrap().width, 640);
}

#[tokio::test]
async fn test_diagnostics_serialize_camel_case() {
    let device = ScriptedDevice::new();
    let engine = CaptureEngine::new(device, negotiation(&["any"], 1));
    let result = engine
        .capture_once(&request(), &CancellationToken::new())
        .await
        .unwrap();

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["cameraDeviceName"], "camera-index-1");
    assert_eq!(json["diagnostics"]["failureCode"], "read_failed");
    assert_eq!(json["diagnostics"]["attemptDetails"][0]["outcome"], "read_failed");
    assert!(json.get("imageBytes").is_none());
}
