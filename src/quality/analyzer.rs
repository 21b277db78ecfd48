use crate::types::FrameStats;
use image::{DynamicImage, GrayImage};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

// Empirical values from consumer webcams; recalibrate against real hardware.

/// Frame is black if its brightest pixel is at or below this
pub const BLACK_MAX_LUMA_THRESHOLD: f64 = 25.0;
/// Frame is black if its mean luma is below this
pub const BLACK_MEAN_LUMA_THRESHOLD: f64 = 18.0;
/// Frame is black if at least this fraction of pixels is dark
pub const BLACK_RATIO_THRESHOLD: f64 = 0.98;
/// Pixels at or below this luma count as dark
pub const BRIGHT_PIXEL_THRESHOLD: f64 = 20.0;

/// Black-frame classification thresholds on an 8-bit luma scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlackFrameThresholds {
    pub max_luma: f64,
    pub mean_luma: f64,
    pub dark_ratio: f64,
    pub bright_pixel: f64,
}

impl Default for BlackFrameThresholds {
    fn default() -> Self {
        Self {
            max_luma: BLACK_MAX_LUMA_THRESHOLD,
            mean_luma: BLACK_MEAN_LUMA_THRESHOLD,
            dark_ratio: BLACK_RATIO_THRESHOLD,
            bright_pixel: BRIGHT_PIXEL_THRESHOLD,
        }
    }
}

impl BlackFrameThresholds {
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for (name, value) in [
            ("quality.max_luma", self.max_luma),
            ("quality.mean_luma", self.mean_luma),
            ("quality.bright_pixel", self.bright_pixel),
        ] {
            if !(0.0..=255.0).contains(&value) {
                errors.push(format!("{} must be between 0 and 255", name));
            }
        }
        if !(0.0..=1.0).contains(&self.dark_ratio) {
            errors.push("quality.dark_ratio must be between 0.0 and 1.0".to_string());
        }
        errors
    }

    /// Apply the black-frame rule to already computed statistics
    pub fn is_black(&self, max_luma: f64, mean_luma: f64, dark_pixel_ratio: f64) -> bool {
        max_luma <= self.max_luma
            || mean_luma < self.mean_luma
            || dark_pixel_ratio >= self.dark_ratio
    }
}

/// Compute luma statistics and classify the frame.
///
/// Color frames are reduced to a single brightness channel first; single
/// channel frames are used as-is.
pub fn analyze_frame(frame: &DynamicImage, thresholds: &BlackFrameThresholds) -> FrameStats {
    let luma: Cow<'_, GrayImage> = match frame.as_luma8() {
        Some(gray) => Cow::Borrowed(gray),
        None => Cow::Owned(frame.to_luma8()),
    };

    let pixels = luma.as_raw();
    let total = pixels.len();

    let (min, max, sum, bright) = pixels.iter().fold(
        (u8::MAX, u8::MIN, 0u64, 0usize),
        |(min, max, sum, bright), &value| {
            let is_bright = f64::from(value) > thresholds.bright_pixel;
            (
                min.min(value),
                max.max(value),
                sum + u64::from(value),
                bright + usize::from(is_bright),
            )
        },
    );

    let (min_luma, max_luma, mean_luma, dark_pixel_ratio) = if total == 0 {
        (0.0, 0.0, 0.0, 1.0)
    } else {
        (
            f64::from(min),
            f64::from(max),
            sum as f64 / total as f64,
            (total - bright) as f64 / total as f64,
        )
    };

    FrameStats {
        width: frame.width(),
        height: frame.height(),
        channels: frame.color().channel_count(),
        mean_luma,
        min_luma,
        max_luma,
        dark_pixel_ratio,
        is_black_frame: thresholds.is_black(max_luma, mean_luma, dark_pixel_ratio),
    }
}

/// Human-readable explanation listing the measured values against each threshold
pub fn black_frame_message(stats: &FrameStats, thresholds: &BlackFrameThresholds) -> String {
    format!(
        "Captured frame appears black or near-black. \
         mean={:.1} (threshold<{:.1}), max={:.1} (threshold<={:.1}), \
         darkRatio={:.3} (threshold>={:.3}).",
        stats.mean_luma,
        thresholds.mean_luma,
        stats.max_luma,
        thresholds.max_luma,
        stats.dark_pixel_ratio,
        thresholds.dark_ratio
    )
}
