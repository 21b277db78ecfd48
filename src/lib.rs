//! SessionCam: unattended still capture for session events
//!
//! This crate captures a single usable still image from a locally attached
//! camera when a session event fires (logon, unlock, lock or a manual
//! trigger). Camera drivers are unpredictable, so capture is a bounded search:
//!
//! - plan every (backend, pixel format, resolution, conversion mode) combination
//! - open the device once per attempt and let the sensor settle
//! - reject black or near-black frames
//! - resize, watermark and JPEG-encode the first usable frame
//! - record diagnostics for every attempt made
//!
//! # Usage
//! ```rust,no_run
//! use sessioncam::{CaptureEngine, CaptureEvent, CaptureRequest, NokhwaDevice, SessionCamConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), sessioncam::CameraError> {
//! let config = SessionCamConfig::load_or_default();
//! let engine = CaptureEngine::from_config(NokhwaDevice, &config);
//! let request = CaptureRequest::from_config(CaptureEvent::Manual, &config, "workstation");
//!
//! let result = engine.capture_once(&request, &CancellationToken::new()).await?;
//! println!("success: {}, attempts: {}", result.success, result.diagnostics.attempts);
//! # Ok(())
//! # }
//! ```
pub mod capture;
pub mod config;
pub mod encoder;
pub mod errors;
pub mod negotiation;
pub mod platform;
pub mod processing;
pub mod quality;
pub mod session;
pub mod types;

// Testing utilities - synthetic frames and scripted devices for offline testing
pub mod testing;

// Re-exports for convenience
pub use capture::CaptureEngine;
pub use crate::config::{NegotiationConfig, SessionCamConfig};
pub use errors::CameraError;
pub use negotiation::{plan_combinations, Backend, CaptureCombination};
pub use platform::{list_devices, CameraDevice, DeviceInfo, NokhwaDevice};
pub use quality::{analyze_frame, BlackFrameThresholds};
pub use types::{
    AttemptDiagnostics, AttemptOutcome, CaptureDiagnostics, CaptureEvent, CaptureRequest,
    CaptureResult, FrameStats,
};

/// Initialize logging, defaulting to `sessioncam=info` when `RUST_LOG` is unset
pub fn init_logging() {
    let env = env_logger::Env::default().default_filter_or("sessioncam=info");
    let _ = env_logger::Builder::from_env(env).try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
        default_backends: Backend::platform_default_order()
            .iter()
            .map(|b| b.name().to_string())
            .collect(),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub default_backends: Vec<String>,
}
