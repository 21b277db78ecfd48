//! Frame quality analysis tests
//!
//! Boundary behaviour of the black-frame rule and the statistics it is
//! computed from.

use image::{DynamicImage, GrayImage, Luma, Rgba, RgbaImage};
use sessioncam::quality::{analyze_frame, black_frame_message, BlackFrameThresholds};
use sessioncam::testing::{black_frame, gradient_frame, gray_frame, near_black_frame};

/// 100x100 gray frame with `dark` pixels at `dark_value`, the rest at 255
fn split_frame(dark: usize, dark_value: u8) -> DynamicImage {
    let mut pixels = vec![255u8; 10_000];
    pixels[..dark].fill(dark_value);
    DynamicImage::ImageLuma8(GrayImage::from_raw(100, 100, pixels).unwrap())
}

#[test]
fn test_all_zero_frame_is_black() {
    let stats = analyze_frame(&black_frame(64, 48), &BlackFrameThresholds::default());
    assert!(stats.is_black_frame);
    assert_eq!(stats.max_luma, 0.0);
    assert_eq!(stats.mean_luma, 0.0);
    assert_eq!(stats.dark_pixel_ratio, 1.0);
}

#[test]
fn test_dark_ratio_just_below_threshold_is_usable() {
    // 9799 / 10000 = 0.9799 < 0.98, mean ~23.7, max 255
    let stats = analyze_frame(&split_frame(9_799, 19), &BlackFrameThresholds::default());
    assert!(stats.dark_pixel_ratio < 0.98);
    assert!(stats.mean_luma >= 18.0);
    assert!(stats.max_luma > 25.0);
    assert!(!stats.is_black_frame);
}

#[test]
fn test_dark_ratio_at_threshold_is_black() {
    let stats = analyze_frame(&split_frame(9_800, 19), &BlackFrameThresholds::default());
    assert_eq!(stats.dark_pixel_ratio, 0.98);
    assert!(stats.is_black_frame);
}

#[test]
fn test_each_rule_triggers_alone() {
    let thresholds = BlackFrameThresholds::default();
    // max <= 25 even though nothing else would fire with relaxed limits
    assert!(thresholds.is_black(25.0, 100.0, 0.0));
    assert!(!thresholds.is_black(25.5, 100.0, 0.0));
    // mean < 18
    assert!(thresholds.is_black(255.0, 17.9, 0.0));
    assert!(!thresholds.is_black(255.0, 18.0, 0.0));
    // dark ratio >= 0.98
    assert!(thresholds.is_black(255.0, 100.0, 0.98));
}

#[test]
fn test_uniform_gray_levels() {
    let thresholds = BlackFrameThresholds::default();
    assert!(analyze_frame(&gray_frame(32, 32, 25), &thresholds).is_black_frame);
    assert!(!analyze_frame(&gray_frame(32, 32, 128), &thresholds).is_black_frame);
}

#[test]
fn test_near_black_sensor_output_is_rejected() {
    let stats = analyze_frame(&near_black_frame(120, 90), &BlackFrameThresholds::default());
    assert!(stats.is_black_frame);
    assert!(stats.mean_luma < 18.0);
}

#[test]
fn test_stats_report_shape_and_channels() {
    let thresholds = BlackFrameThresholds::default();
    let rgb = analyze_frame(&gradient_frame(40, 30), &thresholds);
    assert_eq!((rgb.width, rgb.height, rgb.channels), (40, 30, 3));
    assert!(rgb.min_luma <= rgb.mean_luma && rgb.mean_luma <= rgb.max_luma);

    let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([200, 200, 200, 0])));
    assert_eq!(analyze_frame(&rgba, &thresholds).channels, 4);

    let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 4, Luma([77])));
    let stats = analyze_frame(&gray, &thresholds);
    assert_eq!(stats.channels, 1);
    assert_eq!(stats.mean_luma, 77.0);
}

#[test]
fn test_overridden_thresholds_are_honored() {
    let strict = BlackFrameThresholds {
        mean_luma: 150.0,
        ..BlackFrameThresholds::default()
    };
    let stats = analyze_frame(&gray_frame(16, 16, 128), &strict);
    assert!(stats.is_black_frame);
    assert!(black_frame_message(&stats, &strict).contains("threshold<150.0"));
}

#[test]
fn test_black_frame_message_lists_measurements() {
    let thresholds = BlackFrameThresholds::default();
    let stats = analyze_frame(&black_frame(8, 8), &thresholds);
    assert_eq!(
        black_frame_message(&stats, &thresholds),
        "Captured frame appears black or near-black. mean=0.0 (threshold<18.0), \
         max=0.0 (threshold<=25.0), darkRatio=1.000 (threshold>=0.980)."
    );
}

#[test]
fn test_empty_frame_counts_as_black() {
    let empty = DynamicImage::ImageLuma8(GrayImage::new(0, 0));
    let stats = analyze_frame(&empty, &BlackFrameThresholds::default());
    assert!(stats.is_black_frame);
    assert_eq!(stats.dark_pixel_ratio, 1.0);
}
