//! JPEG encoding of the processed frame

use crate::errors::CameraError;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use std::borrow::Cow;

/// Map normalized quality (clamped to 0.0-1.0) to a 0-100 percentage
pub fn quality_percent(quality: f64) -> u8 {
    if quality.is_nan() {
        return 0;
    }
    (quality.clamp(0.0, 1.0) * 100.0).round() as u8
}

/// Compress a frame to JPEG bytes.
///
/// Empty output is reported as an error rather than returned.
pub fn encode_jpeg(frame: &DynamicImage, quality: f64) -> Result<Vec<u8>, CameraError> {
    let percent = quality_percent(quality);

    // JPEG carries neither alpha nor 16-bit samples
    let encodable: Cow<'_, DynamicImage> = match frame {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageLuma8(_) => Cow::Borrowed(frame),
        other if other.color().channel_count() <= 2 => {
            Cow::Owned(DynamicImage::ImageLuma8(other.to_luma8()))
        }
        other => Cow::Owned(DynamicImage::ImageRgb8(other.to_rgb8())),
    };

    let mut buffer = Vec::new();
    // The codec has no quality-0 table
    let encoder = JpegEncoder::new_with_quality(&mut buffer, percent.max(1));
    encodable.write_with_encoder(encoder)?;

    if buffer.is_empty() {
        return Err(CameraError::EncodingError(
            "encoder produced no output".to_string(),
        ));
    }

    log::debug!(
        "Encoded {}x{} frame at quality {} -> {} bytes",
        frame.width(),
        frame.height(),
        percent,
        buffer.len()
    );
    Ok(buffer)
}
