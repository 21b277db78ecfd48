//! Core data types shared by the capture engine
//!
//! Requests flow in, diagnostics and results flow out. Everything that may end
//! up in a JSON sidecar derives `Serialize` with camelCase field names.

use crate::config::SessionCamConfig;
use crate::errors::CameraError;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Session event that triggered a capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureEvent {
    Logon,
    Unlock,
    Lock,
    Manual,
}

impl CaptureEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureEvent::Logon => "logon",
            CaptureEvent::Unlock => "unlock",
            CaptureEvent::Lock => "lock",
            CaptureEvent::Manual => "manual",
        }
    }
}

impl fmt::Display for CaptureEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaptureEvent {
    type Err = CameraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "logon" => Ok(CaptureEvent::Logon),
            "unlock" => Ok(CaptureEvent::Unlock),
            "lock" => Ok(CaptureEvent::Lock),
            "manual" => Ok(CaptureEvent::Manual),
            other => Err(CameraError::ConfigError(format!(
                "unknown capture event '{}' (expected logon, unlock, lock or manual)",
                other
            ))),
        }
    }
}

/// One capture invocation, built by the caller and never mutated
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRequest {
    pub event: CaptureEvent,
    /// Frames wider than this are downscaled; `None` keeps the native width
    pub max_width: Option<u32>,
    /// Normalized JPEG quality (0.0-1.0)
    pub jpeg_quality: f64,
    /// Preferred camera index; `None` means index 0
    pub camera_index: Option<u32>,
    pub watermark_enabled: bool,
    /// chrono strftime pattern for the watermark timestamp
    pub watermark_format: String,
    pub hostname: String,
}

impl CaptureRequest {
    pub fn new(event: CaptureEvent, hostname: impl Into<String>) -> Self {
        Self {
            event,
            max_width: None,
            jpeg_quality: 0.85,
            camera_index: None,
            watermark_enabled: false,
            watermark_format: crate::processing::FALLBACK_TIMESTAMP_FORMAT.to_string(),
            hostname: hostname.into(),
        }
    }

    /// Limit output width; 0 means no limit
    pub fn with_max_width(mut self, max_width: u32) -> Self {
        self.max_width = Some(max_width).filter(|w| *w > 0);
        self
    }

    pub fn with_quality(mut self, quality: f64) -> Self {
        self.jpeg_quality = quality;
        self
    }

    pub fn with_camera_index(mut self, index: u32) -> Self {
        self.camera_index = Some(index);
        self
    }

    pub fn with_watermark(mut self, format: impl Into<String>) -> Self {
        self.watermark_enabled = true;
        self.watermark_format = format.into();
        self
    }

    /// Build a request from the loaded configuration
    pub fn from_config(
        event: CaptureEvent,
        config: &SessionCamConfig,
        hostname: impl Into<String>,
    ) -> Self {
        Self {
            event,
            max_width: config.capture.max_width.filter(|w| *w > 0),
            jpeg_quality: config.capture.jpeg_quality,
            camera_index: config.capture.camera_index,
            watermark_enabled: config.watermark.enabled,
            watermark_format: config.watermark.format.clone(),
            hostname: hostname.into(),
        }
    }

    /// Index actually opened
    pub fn resolved_camera_index(&self) -> u32 {
        self.camera_index.unwrap_or(0)
    }

    pub fn device_label(&self) -> String {
        format!("camera-index-{}", self.resolved_camera_index())
    }
}

/// Brightness statistics of one frame on an 8-bit luma scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameStats {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub mean_luma: f64,
    pub min_luma: f64,
    pub max_luma: f64,
    pub dark_pixel_ratio: f64,
    pub is_black_frame: bool,
}

/// How a single attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    OpenFailed,
    ReadFailed,
    BlackFrame,
    EncodeFailed,
    Exception,
    Success,
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptOutcome::OpenFailed => "open_failed",
            AttemptOutcome::ReadFailed => "read_failed",
            AttemptOutcome::BlackFrame => "black_frame",
            AttemptOutcome::EncodeFailed => "encode_failed",
            AttemptOutcome::Exception => "exception",
            AttemptOutcome::Success => "success",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Success)
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of one attempt against one combination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptDiagnostics {
    pub camera_index: u32,
    pub backend: String,
    pub requested_pixel_format: String,
    pub requested_resolution: String,
    pub requested_convert_rgb_mode: String,
    /// 1-based within its combination
    pub attempt: u32,
    pub duration_ms: u64,
    pub outcome: AttemptOutcome,
    pub actual_pixel_format: Option<String>,
    pub actual_width: Option<u32>,
    pub actual_height: Option<u32>,
    pub frame_stats: Option<FrameStats>,
    pub message: Option<String>,
}

/// Aggregate diagnostics for a whole negotiation sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureDiagnostics {
    pub capture_id: Uuid,
    pub selected_camera_index: Option<u32>,
    pub used_camera_index: u32,
    pub backend: String,
    pub attempts: usize,
    pub total_duration_ms: u64,
    pub final_frame_stats: Option<FrameStats>,
    pub attempt_details: Vec<AttemptDiagnostics>,
    /// `None` on success
    pub failure_code: Option<String>,
}

/// Terminal value of a capture invocation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureResult {
    pub success: bool,
    #[serde(skip)]
    pub image_bytes: Option<Bytes>,
    pub error_message: Option<String>,
    pub camera_device_name: String,
    pub diagnostics: CaptureDiagnostics,
}

impl CaptureResult {
    pub fn image_len(&self) -> usize {
        self.image_bytes.as_ref().map_or(0, |b| b.len())
    }
}
