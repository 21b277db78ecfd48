use super::{parse_convert_mode, parse_resolution, Backend, FourCc, NegotiationHints};
use crate::config::NegotiationConfig;
use std::collections::HashSet;

/// One concrete (backend, pixel format, resolution, conversion mode) tuple
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureCombination {
    pub backend: Backend,
    /// Normalized token as configured (`auto` for blanks)
    pub pixel_format: String,
    /// Label as configured, even when it did not parse
    pub resolution: String,
    pub convert_rgb_mode: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub force_convert_rgb: Option<bool>,
    pub four_cc: Option<FourCc>,
}

impl CaptureCombination {
    /// Injected when the configured lists produce nothing usable
    pub fn fallback() -> Self {
        Self {
            backend: Backend::Any,
            pixel_format: "auto".to_string(),
            resolution: "auto".to_string(),
            convert_rgb_mode: "auto".to_string(),
            width: None,
            height: None,
            force_convert_rgb: None,
            four_cc: None,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Case-insensitive identity used for deduplication
    pub fn key(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.backend.name(),
            self.pixel_format,
            self.resolution,
            self.convert_rgb_mode
        )
        .to_ascii_lowercase()
    }

    pub fn hints(&self) -> NegotiationHints {
        NegotiationHints {
            width: self.width,
            height: self.height,
            four_cc: self.four_cc,
            force_convert_rgb: self.force_convert_rgb,
        }
    }
}

fn normalize_token(token: &str) -> String {
    let token = token.trim();
    if token.is_empty() {
        "auto".to_string()
    } else {
        token.to_string()
    }
}

/// Expand the negotiation lists into an ordered, deduplicated sequence.
///
/// Backends are the outer loop, then pixel formats, then resolutions. Unknown
/// backend tokens are skipped. The result is never empty.
pub fn plan_combinations(negotiation: &NegotiationConfig) -> Vec<CaptureCombination> {
    let convert_rgb_mode = normalize_token(&negotiation.convert_rgb_mode);
    let force_convert_rgb = parse_convert_mode(&convert_rgb_mode);

    let mut seen = HashSet::new();
    let mut result = Vec::new();

    let backends = negotiation.backend_order.iter().filter_map(|token| {
        let parsed = Backend::parse(token);
        if parsed.is_none() {
            log::debug!("Skipping unrecognized backend token '{}'", token);
        }
        parsed
    });

    for backend in backends {
        for pixel_format in &negotiation.pixel_formats {
            let pixel_format = normalize_token(pixel_format);
            let four_cc = FourCc::from_token(&pixel_format);

            for resolution in &negotiation.resolutions {
                let resolution = normalize_token(resolution);
                let parsed = if resolution.eq_ignore_ascii_case("auto") {
                    None
                } else {
                    parse_resolution(&resolution)
                };

                let combination = CaptureCombination {
                    backend,
                    pixel_format: pixel_format.clone(),
                    resolution,
                    convert_rgb_mode: convert_rgb_mode.clone(),
                    width: parsed.map(|(w, _)| w),
                    height: parsed.map(|(_, h)| h),
                    force_convert_rgb,
                    four_cc,
                };

                if seen.insert(combination.key()) {
                    result.push(combination);
                }
            }
        }
    }

    if result.is_empty() {
        result.push(CaptureCombination::fallback());
    }

    result
}
