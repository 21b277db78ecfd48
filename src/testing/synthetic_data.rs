//! Synthetic frames with known brightness characteristics

use image::{DynamicImage, Rgb, RgbImage};

/// Gradient that varies by position, similar to a lit scene
pub fn gradient_frame(width: u32, height: u32) -> DynamicImage {
    let image = RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (64 + x % 192) as u8,
            (64 + y % 192) as u8,
            (64 + (x + y) % 192) as u8,
        ])
    });
    DynamicImage::ImageRgb8(image)
}

/// Uniform gray RGB frame
pub fn gray_frame(width: u32, height: u32, value: u8) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([value; 3])))
}

/// All-zero frame, as returned by a capped lens
pub fn black_frame(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::new(width, height))
}

/// Mostly dark frame with a few bright pixels, the typical cold-sensor output
pub fn near_black_frame(width: u32, height: u32) -> DynamicImage {
    let image = RgbImage::from_fn(width, height, |x, y| {
        if (x + y * width) % 200 == 0 {
            Rgb([255, 255, 255])
        } else {
            Rgb([6, 6, 6])
        }
    });
    DynamicImage::ImageRgb8(image)
}
