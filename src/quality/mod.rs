/// Frame quality analysis
///
/// Computes brightness statistics for a captured frame and decides whether it
/// is usable. Consumer webcams frequently hand back a valid-looking but
/// near-black frame right after opening (lens cap, cold sensor, privacy
/// shutter), so such frames are classified as failures.
pub mod analyzer;

pub use analyzer::{
    analyze_frame, black_frame_message, BlackFrameThresholds, BLACK_MAX_LUMA_THRESHOLD,
    BLACK_MEAN_LUMA_THRESHOLD, BLACK_RATIO_THRESHOLD, BRIGHT_PIXEL_THRESHOLD,
};
