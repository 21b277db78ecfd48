use image::imageops::FilterType;
use image::DynamicImage;

/// Target dimensions when `width` must fit within `max_width`.
///
/// Height follows `round(height * max_width / width)` and never drops below 1.
pub fn scaled_dimensions(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width == 0 || max_width == 0 || width <= max_width {
        return (width, height);
    }
    let scaled = (f64::from(height) * f64::from(max_width) / f64::from(width)).round();
    (max_width, (scaled as u32).max(1))
}

/// Downscale frames wider than `max_width`; narrower frames pass through untouched
pub fn resize_to_max_width(frame: DynamicImage, max_width: Option<u32>) -> DynamicImage {
    let Some(max_width) = max_width.filter(|w| *w > 0) else {
        return frame;
    };

    let (width, height) = (frame.width(), frame.height());
    if width <= max_width {
        return frame;
    }

    let (new_width, new_height) = scaled_dimensions(width, height, max_width);
    log::debug!(
        "Resizing frame {}x{} -> {}x{}",
        width,
        height,
        new_width,
        new_height
    );
    frame.resize_exact(new_width, new_height, FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn test_narrow_frame_unchanged() {
        let frame = DynamicImage::ImageRgb8(RgbImage::new(640, 480));
        let out = resize_to_max_width(frame, Some(1280));
        assert_eq!((out.width(), out.height()), (640, 480));
    }

    #[test]
    fn test_equal_width_unchanged() {
        let frame = DynamicImage::ImageRgb8(RgbImage::new(1280, 720));
        let out = resize_to_max_width(frame, Some(1280));
        assert_eq!((out.width(), out.height()), (1280, 720));
    }

    #[test]
    fn test_wide_frame_scaled_to_max_width() {
        let frame = DynamicImage::ImageRgb8(RgbImage::new(1920, 1080));
        let out = resize_to_max_width(frame, Some(1280));
        assert_eq!((out.width(), out.height()), (1280, 720));
    }

    #[test]
    fn test_height_rounds_to_nearest() {
        // 487 * 640 / 1001 = 311.37
        assert_eq!(scaled_dimensions(1001, 487, 640), (640, 311));
        // 3 * 2 / 4 = 1.5 -> 2
        assert_eq!(scaled_dimensions(4, 3, 2), (2, 2));
        assert_eq!(scaled_dimensions(4000, 1, 10), (10, 1));
    }

    #[test]
    fn test_no_limit_passes_through() {
        let frame = DynamicImage::ImageRgb8(RgbImage::new(4000, 3000));
        let out = resize_to_max_width(frame, None);
        assert_eq!(out.width(), 4000);
    }
}
