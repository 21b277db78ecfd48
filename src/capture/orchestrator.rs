use crate::config::{NegotiationConfig, SessionCamConfig};
use crate::encoder::encode_jpeg;
use crate::errors::CameraError;
use crate::negotiation::{plan_combinations, Backend, CaptureCombination};
use crate::platform::{CameraDevice, NegotiatedFormat};
use crate::processing::post_process;
use crate::quality::{analyze_frame, black_frame_message, BlackFrameThresholds};
use crate::session::{run_session, SessionOutcome};
use crate::types::{
    AttemptDiagnostics, AttemptOutcome, CaptureDiagnostics, CaptureRequest, CaptureResult,
    FrameStats,
};
use bytes::Bytes;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Pause between retries of the same combination
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(120);

/// Failure code used when no attempt was recorded at all
pub const DEFAULT_FAILURE_CODE: &str = "capture_failed";

const OPEN_FAILED_MESSAGE: &str = "Unable to open selected camera device.";
const READ_FAILED_MESSAGE: &str = "Unable to read frame from camera.";
const ENCODE_FAILED_MESSAGE: &str = "Unable to encode captured frame as JPEG.";
const GENERIC_FAILURE_MESSAGE: &str = "Camera capture failed.";

/// Negotiation search position
#[derive(Debug)]
enum SearchState {
    Planning,
    Attempting { combination: usize, attempt: u32 },
    Succeeded(Vec<u8>),
    Exhausted,
}

/// Where the search goes after a failed attempt
fn after_failure(
    combination: usize,
    attempt: u32,
    attempts_per_combination: u32,
    combination_count: usize,
) -> SearchState {
    if attempt < attempts_per_combination {
        SearchState::Attempting {
            combination,
            attempt: attempt + 1,
        }
    } else if combination + 1 < combination_count {
        SearchState::Attempting {
            combination: combination + 1,
            attempt: 1,
        }
    } else {
        SearchState::Exhausted
    }
}

/// What a single attempt produced on the blocking pool
#[derive(Debug)]
struct AttemptReport {
    outcome: AttemptOutcome,
    negotiated: NegotiatedFormat,
    frame_stats: Option<FrameStats>,
    message: Option<String>,
    image: Option<Vec<u8>>,
}

impl AttemptReport {
    fn failed(outcome: AttemptOutcome, negotiated: NegotiatedFormat, message: String) -> Self {
        Self {
            outcome,
            negotiated,
            frame_stats: None,
            message: Some(message),
            image: None,
        }
    }
}

/// Open, stabilize, analyze, post-process and encode: one cell of the search matrix
fn run_attempt<D: CameraDevice>(
    device: &D,
    index: u32,
    combination: &CaptureCombination,
    warmup_frames: u32,
    request: &CaptureRequest,
    thresholds: &BlackFrameThresholds,
) -> AttemptReport {
    let (frame, negotiated) = match run_session(device, index, combination, warmup_frames) {
        SessionOutcome::Captured { frame, negotiated } => (frame, negotiated),
        SessionOutcome::OpenFailed(error) => {
            debug!("Open of camera {} failed: {}", index, error);
            return AttemptReport::failed(
                AttemptOutcome::OpenFailed,
                NegotiatedFormat::default(),
                OPEN_FAILED_MESSAGE.to_string(),
            );
        }
        SessionOutcome::ReadFailed { negotiated } => {
            return AttemptReport::failed(
                AttemptOutcome::ReadFailed,
                negotiated,
                READ_FAILED_MESSAGE.to_string(),
            );
        }
        SessionOutcome::Faulted { error, negotiated } => {
            return AttemptReport::failed(AttemptOutcome::Exception, negotiated, error.detail());
        }
    };

    let stats = analyze_frame(&frame, thresholds);
    if stats.is_black_frame {
        return AttemptReport {
            outcome: AttemptOutcome::BlackFrame,
            negotiated,
            frame_stats: Some(stats),
            message: Some(black_frame_message(&stats, thresholds)),
            image: None,
        };
    }

    let processed = post_process(frame, request);
    match encode_jpeg(&processed, request.jpeg_quality) {
        Ok(bytes) => AttemptReport {
            outcome: AttemptOutcome::Success,
            negotiated,
            frame_stats: Some(stats),
            message: None,
            image: Some(bytes),
        },
        Err(error) => {
            debug!("Encoding frame from camera {} failed: {}", index, error);
            AttemptReport {
                outcome: AttemptOutcome::EncodeFailed,
                negotiated,
                frame_stats: Some(stats),
                message: Some(ENCODE_FAILED_MESSAGE.to_string()),
                image: None,
            }
        }
    }
}

fn join_error_message(error: JoinError) -> String {
    if !error.is_panic() {
        return format!("Capture attempt did not complete: {}", error);
    }
    let payload = error.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("Capture attempt panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("Capture attempt panicked: {}", message)
    } else {
        "Capture attempt panicked".to_string()
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis().min(u64::MAX as u128) as u64
}

/// Bounded search over capture combinations for one usable frame.
///
/// The engine keeps no state between calls. Callers must not run two
/// captures against the same physical camera concurrently.
pub struct CaptureEngine<D: CameraDevice + 'static> {
    device: Arc<D>,
    negotiation: NegotiationConfig,
    thresholds: BlackFrameThresholds,
    backoff: Duration,
}

impl<D: CameraDevice + 'static> CaptureEngine<D> {
    pub fn new(device: D, negotiation: NegotiationConfig) -> Self {
        Self::with_shared_device(Arc::new(device), negotiation)
    }

    pub fn with_shared_device(device: Arc<D>, negotiation: NegotiationConfig) -> Self {
        Self {
            device,
            negotiation,
            thresholds: BlackFrameThresholds::default(),
            backoff: DEFAULT_BACKOFF,
        }
    }

    /// Engine using the negotiation and quality sections of a loaded config
    pub fn from_config(device: D, config: &SessionCamConfig) -> Self {
        Self::new(device, config.negotiation.clone()).with_thresholds(config.quality)
    }

    pub fn with_thresholds(mut self, thresholds: BlackFrameThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn device(&self) -> &Arc<D> {
        &self.device
    }

    pub fn negotiation(&self) -> &NegotiationConfig {
        &self.negotiation
    }

    /// Capture one frame, trying combinations in planned order until one succeeds.
    ///
    /// Every retryable failure is folded into the returned diagnostics; the
    /// only error is [`CameraError::Cancelled`], checked before each attempt
    /// and during backoff.
    pub async fn capture_once(
        &self,
        request: &CaptureRequest,
        cancel: &CancellationToken,
    ) -> Result<CaptureResult, CameraError> {
        let started = Instant::now();
        let capture_id = Uuid::new_v4();
        let index = request.resolved_camera_index();
        let attempts_per_combination = self.negotiation.attempts_per_combination.max(1);
        let shared_request = Arc::new(request.clone());

        let mut combinations: Vec<CaptureCombination> = Vec::new();
        let mut details: Vec<AttemptDiagnostics> = Vec::new();
        let mut state = SearchState::Planning;

        let image = loop {
            match state {
                SearchState::Planning => {
                    combinations = plan_combinations(&self.negotiation);
                    info!(
                        "Capture {} ({}) on camera {}: {} combination(s) x {} attempt(s)",
                        capture_id,
                        request.event,
                        index,
                        combinations.len(),
                        attempts_per_combination
                    );
                    state = SearchState::Attempting {
                        combination: 0,
                        attempt: 1,
                    };
                }
                SearchState::Attempting {
                    combination,
                    attempt,
                } => {
                    let Some(current) = combinations.get(combination).cloned() else {
                        state = SearchState::Exhausted;
                        continue;
                    };

                    if cancel.is_cancelled() {
                        info!("Capture {} cancelled after {} attempt(s)", capture_id, details.len());
                        return Err(CameraError::Cancelled);
                    }

                    let attempt_started = Instant::now();
                    let report = self
                        .attempt(index, &current, Arc::clone(&shared_request))
                        .await;
                    let detail = AttemptDiagnostics {
                        camera_index: index,
                        backend: current.backend_name().to_string(),
                        requested_pixel_format: current.pixel_format.clone(),
                        requested_resolution: current.resolution.clone(),
                        requested_convert_rgb_mode: current.convert_rgb_mode.clone(),
                        attempt,
                        duration_ms: elapsed_ms(attempt_started),
                        outcome: report.outcome,
                        actual_pixel_format: report.negotiated.pixel_format,
                        actual_width: report.negotiated.width,
                        actual_height: report.negotiated.height,
                        frame_stats: report.frame_stats,
                        message: if report.outcome.is_success() {
                            Some(format!(
                                "Captured frame via {} (attempt {}).",
                                current.backend.display_name(),
                                attempt
                            ))
                        } else {
                            report.message
                        },
                    };
                    log_attempt(&detail);
                    details.push(detail);

                    if let Some(image) = report.image {
                        state = SearchState::Succeeded(image);
                        continue;
                    }

                    if attempt < attempts_per_combination {
                        self.wait_backoff(cancel).await?;
                    }
                    state = after_failure(
                        combination,
                        attempt,
                        attempts_per_combination,
                        combinations.len(),
                    );
                }
                SearchState::Succeeded(image) => break Some(image),
                SearchState::Exhausted => break None,
            }
        };

        Ok(self.finish(capture_id, request, index, details, image, elapsed_ms(started)))
    }

    async fn attempt(
        &self,
        index: u32,
        combination: &CaptureCombination,
        request: Arc<CaptureRequest>,
    ) -> AttemptReport {
        let device = Arc::clone(&self.device);
        let job_combination = combination.clone();
        let warmup_frames = self.negotiation.warmup_frames;
        let thresholds = self.thresholds;

        let job = tokio::task::spawn_blocking(move || {
            run_attempt(
                device.as_ref(),
                index,
                &job_combination,
                warmup_frames,
                &request,
                &thresholds,
            )
        });

        match job.await {
            Ok(report) => report,
            Err(error) => AttemptReport::failed(
                AttemptOutcome::Exception,
                NegotiatedFormat::default(),
                join_error_message(error),
            ),
        }
    }

    /// Wait before retrying; no device handle is held here
    async fn wait_backoff(&self, cancel: &CancellationToken) -> Result<(), CameraError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(CameraError::Cancelled),
            _ = tokio::time::sleep(self.backoff) => Ok(()),
        }
    }

    fn finish(
        &self,
        capture_id: Uuid,
        request: &CaptureRequest,
        index: u32,
        details: Vec<AttemptDiagnostics>,
        image: Option<Vec<u8>>,
        total_duration_ms: u64,
    ) -> CaptureResult {
        let last = details.last();
        let backend = last
            .map(|d| d.backend.clone())
            .unwrap_or_else(|| Backend::Any.name().to_string());
        let final_frame_stats = details.iter().rev().find_map(|d| d.frame_stats);

        let (success, error_message, failure_code) = match (&image, last) {
            (Some(_), _) => (true, None, None),
            (None, Some(last)) => (
                false,
                Some(
                    last.message
                        .clone()
                        .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string()),
                ),
                Some(last.outcome.as_str().to_string()),
            ),
            (None, None) => (
                false,
                Some(GENERIC_FAILURE_MESSAGE.to_string()),
                Some(DEFAULT_FAILURE_CODE.to_string()),
            ),
        };

        let diagnostics = CaptureDiagnostics {
            capture_id,
            selected_camera_index: request.camera_index,
            used_camera_index: index,
            backend,
            attempts: details.len(),
            total_duration_ms,
            final_frame_stats,
            attempt_details: details,
            failure_code,
        };

        if success {
            info!(
                "Capture {} succeeded via {} after {} attempt(s) in {} ms",
                capture_id, diagnostics.backend, diagnostics.attempts, total_duration_ms
            );
        } else {
            warn!(
                "Capture {} failed after {} attempt(s) in {} ms: {} ({})",
                capture_id,
                diagnostics.attempts,
                total_duration_ms,
                error_message.as_deref().unwrap_or_default(),
                diagnostics.failure_code.as_deref().unwrap_or_default()
            );
        }

        CaptureResult {
            success,
            image_bytes: image.map(Bytes::from),
            error_message,
            camera_device_name: request.device_label(),
            diagnostics,
        }
    }
}

fn log_attempt(detail: &AttemptDiagnostics) {
    info!(
        "Attempt {} via {} [{} / {} / convert={}] -> {} in {} ms (actual {} {}x{})",
        detail.attempt,
        detail.backend,
        detail.requested_pixel_format,
        detail.requested_resolution,
        detail.requested_convert_rgb_mode,
        detail.outcome,
        detail.duration_ms,
        detail.actual_pixel_format.as_deref().unwrap_or("?"),
        detail.actual_width.map_or_else(|| "?".to_string(), |w| w.to_string()),
        detail.actual_height.map_or_else(|| "?".to_string(), |h| h.to_string()),
    );
    if let Some(stats) = &detail.frame_stats {
        info!(
            "Frame {}x{} mean={:.1} min={:.1} max={:.1} darkRatio={:.3} black={}",
            stats.width,
            stats.height,
            stats.mean_luma,
            stats.min_luma,
            stats.max_luma,
            stats.dark_pixel_ratio,
            stats.is_black_frame
        );
    }
    if let Some(message) = &detail.message {
        debug!("Attempt {} message: {}", detail.attempt, message);
    }
}
