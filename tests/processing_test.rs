//! Post-processing and encoding tests

use chrono::{DateTime, FixedOffset, TimeZone};
use image::{DynamicImage, GenericImageView, RgbImage};
use proptest::prelude::*;
use sessioncam::encoder::{encode_jpeg, quality_percent};
use sessioncam::processing::{
    format_timestamp, post_process_at, resize_to_max_width, scaled_dimensions,
};
use sessioncam::testing::gradient_frame;
use sessioncam::{CaptureEvent, CaptureRequest};

fn noon() -> DateTime<FixedOffset> {
    FixedOffset::west_opt(5 * 3600)
        .unwrap()
        .with_ymd_and_hms(2025, 11, 2, 12, 0, 0)
        .unwrap()
}

#[test]
fn test_resize_leaves_narrow_frames_alone() {
    let frame = gradient_frame(800, 600);
    let out = resize_to_max_width(frame, Some(1280));
    assert_eq!(out.dimensions(), (800, 600));
}

#[test]
fn test_resize_scales_wide_frames() {
    let out = resize_to_max_width(gradient_frame(1920, 1080), Some(1280));
    assert_eq!(out.dimensions(), (1280, 720));
}

#[test]
fn test_invalid_watermark_format_does_not_fail_capture() {
    let request = CaptureRequest::new(CaptureEvent::Lock, "kiosk").with_watermark("%!");
    let out = post_process_at(gradient_frame(400, 300), &request, &noon());
    assert_eq!(out.dimensions(), (400, 300));
    assert_eq!(format_timestamp(&noon(), "%!"), "2025-11-02 12:00:00 -05:00");
}

#[test]
fn test_watermark_disabled_leaves_pixels_untouched() {
    let frame = gradient_frame(200, 100);
    let request = CaptureRequest::new(CaptureEvent::Manual, "kiosk");
    let out = post_process_at(frame.clone(), &request, &noon());
    assert_eq!(out.to_rgb8(), frame.to_rgb8());
}

#[test]
fn test_watermark_changes_bottom_right_only() {
    let frame = gradient_frame(640, 360);
    let request = CaptureRequest::new(CaptureEvent::Manual, "kiosk").with_watermark("%H:%M");
    let out = post_process_at(frame.clone(), &request, &noon()).to_rgb8();
    let original = frame.to_rgb8();

    assert_eq!(out.get_pixel(5, 5), original.get_pixel(5, 5));
    let changed = (560..640)
        .flat_map(|x| (300..360).map(move |y| (x, y)))
        .any(|(x, y)| out.get_pixel(x, y) != original.get_pixel(x, y));
    assert!(changed);
}

#[test]
fn test_encode_then_decode_keeps_dimensions() {
    let frame = DynamicImage::ImageRgb8(RgbImage::new(97, 31));
    let bytes = encode_jpeg(&frame, 0.85).unwrap();
    let decoded = image::load_from_memory(&bytes).unwrap();
    assert_eq!(decoded.dimensions(), (97, 31));
}

#[test]
fn test_quality_extremes_still_encode() {
    let frame = gradient_frame(64, 64);
    assert_eq!(quality_percent(0.0), 0);
    assert!(!encode_jpeg(&frame, 0.0).unwrap().is_empty());
    assert!(!encode_jpeg(&frame, 1.0).unwrap().is_empty());
}

proptest! {
    /// Output width equals the limit and height tracks the aspect ratio
    #[test]
    fn scaled_dimensions_keep_aspect(
        width in 2u32..8000,
        height in 1u32..8000,
        max_width in 1u32..4000,
    ) {
        let (w, h) = scaled_dimensions(width, height, max_width);
        if width <= max_width {
            prop_assert_eq!((w, h), (width, height));
        } else {
            prop_assert_eq!(w, max_width);
            let exact = f64::from(height) * f64::from(max_width) / f64::from(width);
            prop_assert!((f64::from(h) - exact).abs() <= 1.0);
            prop_assert!(h >= 1);
        }
    }
}
