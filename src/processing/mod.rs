/// Post-processing applied to a usable frame before encoding
///
/// 1. Downscale to the requested maximum width, keeping the aspect ratio
/// 2. Optionally stamp `"<hostname> <timestamp>"` in the bottom-right corner
pub mod resize;
pub mod watermark;

pub use resize::{resize_to_max_width, scaled_dimensions};
pub use watermark::{apply_watermark, format_timestamp, WatermarkLayout, FALLBACK_TIMESTAMP_FORMAT};

use crate::types::CaptureRequest;
use chrono::{DateTime, FixedOffset, Local};
use image::DynamicImage;

/// Resize and, if requested, watermark using the current local time
pub fn post_process(frame: DynamicImage, request: &CaptureRequest) -> DynamicImage {
    post_process_at(frame, request, &DateTime::<FixedOffset>::from(Local::now()))
}

/// Same as [`post_process`] with an explicit timestamp
pub fn post_process_at(
    frame: DynamicImage,
    request: &CaptureRequest,
    now: &DateTime<FixedOffset>,
) -> DynamicImage {
    let resized = resize_to_max_width(frame, request.max_width);
    if request.watermark_enabled {
        apply_watermark(resized, &request.hostname, &request.watermark_format, now)
    } else {
        resized
    }
}
