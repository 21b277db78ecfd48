use chrono::{DateTime, FixedOffset};
use font8x8::{UnicodeFonts, BASIC_FONTS, LATIN_FONTS};
use image::{DynamicImage, Rgb, RgbImage};
use std::fmt::Write;

/// Used when the configured pattern cannot be rendered
pub const FALLBACK_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S %:z";

const GLYPH_SIZE: u32 = 8;
const OUTLINE_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const FILL_COLOR: Rgb<u8> = Rgb([240, 240, 240]);

/// Format `now` with a strftime pattern, falling back to an ISO-like format
/// with numeric UTC offset when the pattern is invalid or empty.
pub fn format_timestamp(now: &DateTime<FixedOffset>, format: &str) -> String {
    if !format.trim().is_empty() {
        let mut formatted = String::new();
        if write!(formatted, "{}", now.format(format)).is_ok() {
            return formatted;
        }
    }

    log::debug!(
        "Watermark timestamp format '{}' is invalid, using fallback",
        format
    );
    now.format(FALLBACK_TIMESTAMP_FORMAT).to_string()
}

/// Sizes derived from the image width so text stays legible at any resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatermarkLayout {
    /// Pixels per glyph dot
    pub scale: u32,
    /// Extra pixels around each dot in the dark pass
    pub outline: u32,
    pub margin: u32,
}

impl WatermarkLayout {
    pub fn for_width(width: u32) -> Self {
        let scale = (f64::from(width) / 400.0).round().clamp(1.0, 4.0) as u32;
        Self {
            scale,
            outline: (width / 600).max(1),
            margin: (width / 100).max(8),
        }
    }

    pub fn text_size(&self, text: &str) -> (u32, u32) {
        let cell = GLYPH_SIZE * self.scale;
        (text.chars().count() as u32 * cell, cell)
    }

    /// Top-left corner of the text block anchored bottom-right
    pub fn origin(&self, image_width: u32, image_height: u32, text: &str) -> (i64, i64) {
        let (text_width, text_height) = self.text_size(text);
        let margin = i64::from(self.margin);
        let x = (i64::from(image_width) - i64::from(text_width) - margin).max(margin);
        let y = (i64::from(image_height) - i64::from(text_height) - margin).max(margin);
        (x, y)
    }
}

fn glyph(c: char) -> [u8; 8] {
    BASIC_FONTS
        .get(c)
        .or_else(|| LATIN_FONTS.get(c))
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

fn fill_rect(image: &mut RgbImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
    let x0 = x0.max(0);
    let y0 = y0.max(0);
    let x1 = x1.min(i64::from(image.width()));
    let y1 = y1.min(i64::from(image.height()));
    for y in y0..y1 {
        for x in x0..x1 {
            image.put_pixel(x as u32, y as u32, color);
        }
    }
}

fn draw_text(
    image: &mut RgbImage,
    text: &str,
    origin: (i64, i64),
    layout: &WatermarkLayout,
    grow: i64,
    color: Rgb<u8>,
) {
    let scale = i64::from(layout.scale);
    let cell = i64::from(GLYPH_SIZE) * scale;

    for (index, c) in text.chars().enumerate() {
        let glyph_x = origin.0 + index as i64 * cell;
        for (row, bits) in glyph(c).iter().enumerate() {
            for col in 0..GLYPH_SIZE {
                if *bits & (1u8 << col) == 0 {
                    continue;
                }
                let x = glyph_x + i64::from(col) * scale;
                let y = origin.1 + row as i64 * scale;
                fill_rect(image, x - grow, y - grow, x + scale + grow, y + scale + grow, color);
            }
        }
    }
}

/// Stamp `"<hostname> <timestamp>"` in the bottom-right corner.
///
/// A dark outline pass is drawn first, then the light fill, so the text reads
/// over both bright and dark backgrounds. The result is always RGB.
pub fn apply_watermark(
    frame: DynamicImage,
    hostname: &str,
    format: &str,
    now: &DateTime<FixedOffset>,
) -> DynamicImage {
    let text = format!("{} {}", hostname, format_timestamp(now, format));
    let mut image = frame.into_rgb8();

    let layout = WatermarkLayout::for_width(image.width());
    let origin = layout.origin(image.width(), image.height(), &text);

    draw_text(&mut image, &text, origin, &layout, i64::from(layout.outline), OUTLINE_COLOR);
    draw_text(&mut image, &text, origin, &layout, 0, FILL_COLOR);

    DynamicImage::ImageRgb8(image)
}
