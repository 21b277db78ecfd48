//! Configuration management for SessionCam
//!
//! Provides loading, saving, validation and environment overlays for capture
//! output settings, watermarking, backend negotiation and black-frame
//! thresholds. The capture engine itself only ever reads these values.

use crate::errors::CameraError;
use crate::negotiation::{parse_resolution, Backend};
use crate::quality::BlackFrameThresholds;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Prefix for environment overrides, e.g. `SESSIONCAM__CAPTURE__JPEG_QUALITY=0.9`
pub const ENV_PREFIX: &str = "SESSIONCAM";

const PIXEL_FORMATS: [&str; 6] = ["auto", "MJPG", "YUY2", "YUYV", "NV12", "GRAY"];
const CONVERT_MODES: [&str; 3] = ["auto", "true", "false"];

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionCamConfig {
    pub capture: CaptureSettings,
    pub watermark: WatermarkSettings,
    pub negotiation: NegotiationConfig,
    pub quality: BlackFrameThresholds,
}

/// Output settings for the captured still
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Preferred camera index (unset = 0)
    pub camera_index: Option<u32>,
    /// Downscale frames wider than this; 0 disables resizing
    pub max_width: Option<u32>,
    /// JPEG quality (0.0-1.0)
    pub jpeg_quality: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkSettings {
    pub enabled: bool,
    /// chrono strftime pattern
    pub format: String,
}

/// Backend/format/resolution search space for one capture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NegotiationConfig {
    /// Tried in order; recognized tokens are `msmf`, `v4l2`, `any`
    pub backend_order: Vec<String>,
    /// `auto` or a four-character code such as `MJPG`
    pub pixel_formats: Vec<String>,
    /// `auto`, `true` or `false`
    pub convert_rgb_mode: String,
    /// `auto` or `<width>x<height>`
    pub resolutions: Vec<String>,
    /// 1-5
    pub attempts_per_combination: u32,
    /// 0-30
    pub warmup_frames: u32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            camera_index: None,
            max_width: Some(1280),
            jpeg_quality: 0.85,
        }
    }
}

impl Default for WatermarkSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            format: crate::processing::FALLBACK_TIMESTAMP_FORMAT.to_string(),
        }
    }
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            backend_order: default_backend_order(),
            pixel_formats: vec![
                "auto".to_string(),
                "MJPG".to_string(),
                "YUY2".to_string(),
                "NV12".to_string(),
            ],
            convert_rgb_mode: "auto".to_string(),
            resolutions: vec![
                "auto".to_string(),
                "1280x720".to_string(),
                "640x480".to_string(),
            ],
            attempts_per_combination: 2,
            warmup_frames: 6,
        }
    }
}

fn default_backend_order() -> Vec<String> {
    Backend::platform_default_order()
        .iter()
        .map(|b| b.name().to_string())
        .collect()
}

impl NegotiationConfig {
    /// Collect every problem instead of stopping at the first
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if !(1..=5).contains(&self.attempts_per_combination) {
            errors.push("negotiation.attempts_per_combination must be between 1 and 5".to_string());
        }
        if self.warmup_frames > 30 {
            errors.push("negotiation.warmup_frames must be between 0 and 30".to_string());
        }
        if self.backend_order.is_empty() {
            errors.push("negotiation.backend_order must contain at least one backend".to_string());
        }
        if self.pixel_formats.is_empty() {
            errors.push("negotiation.pixel_formats must contain at least one value".to_string());
        }
        if self.resolutions.is_empty() {
            errors.push("negotiation.resolutions must contain at least one value".to_string());
        }
        if !CONVERT_MODES
            .iter()
            .any(|m| m.eq_ignore_ascii_case(self.convert_rgb_mode.trim()))
        {
            errors.push("negotiation.convert_rgb_mode must be one of auto, true, or false".to_string());
        }

        for backend in &self.backend_order {
            if Backend::parse(backend).is_none() {
                errors.push(format!(
                    "negotiation.backend_order contains unsupported backend '{}'. Supported values: msmf, v4l2, any",
                    backend
                ));
            }
        }

        for pixel_format in &self.pixel_formats {
            if !PIXEL_FORMATS
                .iter()
                .any(|f| f.eq_ignore_ascii_case(pixel_format.trim()))
            {
                errors.push(format!(
                    "negotiation.pixel_formats contains unsupported value '{}'. Supported values: {}",
                    pixel_format,
                    PIXEL_FORMATS.join(", ")
                ));
            }
        }

        for resolution in &self.resolutions {
            let token = resolution.trim();
            if !token.eq_ignore_ascii_case("auto") && parse_resolution(token).is_none() {
                errors.push(format!(
                    "negotiation.resolutions contains invalid value '{}'. Use auto or <width>x<height>",
                    resolution
                ));
            }
        }

        errors
    }
}

impl SessionCamConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CameraError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| {
            CameraError::ConfigError(format!("Failed to read config file: {}", e))
        })?;

        let config: SessionCamConfig = toml::from_str(&contents).map_err(|e| {
            CameraError::ConfigError(format!("Failed to parse config file: {}", e))
        })?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load the TOML file (optional) and overlay `SESSIONCAM__SECTION__KEY` variables
    pub fn load_layered<P: AsRef<Path>>(path: P) -> Result<Self, CameraError> {
        let path = path.as_ref();

        let settings = ::config::Config::builder()
            .add_source(
                ::config::File::from(path)
                    .format(::config::FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("negotiation.backend_order")
                    .with_list_parse_key("negotiation.pixel_formats")
                    .with_list_parse_key("negotiation.resolutions"),
            )
            .build()
            .map_err(|e| CameraError::ConfigError(format!("Failed to assemble config: {}", e)))?;

        let config: SessionCamConfig = settings
            .try_deserialize()
            .map_err(|e| CameraError::ConfigError(format!("Failed to parse config: {}", e)))?;

        log::debug!("Resolved layered configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CameraError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                CameraError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let toml_string = toml::to_string_pretty(self).map_err(|e| {
            CameraError::ConfigError(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, toml_string).map_err(|e| {
            CameraError::ConfigError(format!("Failed to write config file: {}", e))
        })?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("sessioncam.toml")
    }

    /// Load from default location or fall back to defaults
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), CameraError> {
        let mut errors = Vec::new();

        if !(0.0..=1.0).contains(&self.capture.jpeg_quality) {
            errors.push("capture.jpeg_quality must be between 0.0 and 1.0".to_string());
        }
        if self.watermark.format.trim().is_empty() {
            errors.push("watermark.format must not be empty".to_string());
        }

        errors.extend(self.negotiation.validation_errors());
        errors.extend(self.quality.validation_errors());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(CameraError::ConfigError(errors.join("; ")))
        }
    }
}
