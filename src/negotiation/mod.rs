/// Capture negotiation search space
///
/// Turns the configured backend, pixel-format, resolution and conversion-mode
/// tokens into concrete combinations. Nothing here touches a device, so the
/// whole module is testable offline.
pub mod planner;

pub use planner::{plan_combinations, CaptureCombination};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform driver interface a camera is opened through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Backend {
    /// Windows Media Foundation
    MediaFoundation,
    /// Linux Video4Linux2
    Video4Linux,
    /// Let the platform pick
    Any,
}

impl Backend {
    /// Parse a configuration token, case-insensitively
    pub fn parse(token: &str) -> Option<Backend> {
        let token = token.trim();
        if token.eq_ignore_ascii_case("msmf") {
            Some(Backend::MediaFoundation)
        } else if token.eq_ignore_ascii_case("v4l2") {
            Some(Backend::Video4Linux)
        } else if token.eq_ignore_ascii_case("any") {
            Some(Backend::Any)
        } else {
            None
        }
    }

    /// Configuration token
    pub fn name(&self) -> &'static str {
        match self {
            Backend::MediaFoundation => "msmf",
            Backend::Video4Linux => "v4l2",
            Backend::Any => "any",
        }
    }

    /// Native backend for this platform first, then automatic selection
    pub fn platform_default_order() -> Vec<Backend> {
        if cfg!(target_os = "windows") {
            vec![Backend::MediaFoundation, Backend::Any]
        } else if cfg!(target_os = "linux") {
            vec![Backend::Video4Linux, Backend::Any]
        } else {
            vec![Backend::Any]
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Backend::MediaFoundation => "Media Foundation",
            Backend::Video4Linux => "Video4Linux2",
            Backend::Any => "Automatic",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Four-character pixel format code (e.g. `MJPG`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCc([u8; 4]);

impl FourCc {
    /// Derive from a pixel-format token; `auto` and non 4-char ASCII tokens yield `None`
    pub fn from_token(token: &str) -> Option<FourCc> {
        let token = token.trim();
        if token.eq_ignore_ascii_case("auto") || !token.is_ascii() {
            return None;
        }
        let bytes: [u8; 4] = token.to_ascii_uppercase().as_bytes().try_into().ok()?;
        Some(FourCc(bytes))
    }

    pub fn as_bytes(&self) -> [u8; 4] {
        self.0
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text: String = self
            .0
            .iter()
            .map(|&b| b as char)
            .collect::<String>()
            .trim_end_matches('\0')
            .trim()
            .to_string();
        f.write_str(&text)
    }
}

/// Open-time hints derived from one combination; drivers may ignore any of them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NegotiationHints {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub four_cc: Option<FourCc>,
    pub force_convert_rgb: Option<bool>,
}

impl NegotiationHints {
    pub fn resolution(&self) -> Option<(u32, u32)> {
        self.width.zip(self.height)
    }
}

/// Parse `<width>x<height>` (either `x` or `X`); both sides must be positive
pub fn parse_resolution(token: &str) -> Option<(u32, u32)> {
    let (w, h) = token.trim().split_once(['x', 'X'])?;
    let width: u32 = w.parse().ok()?;
    let height: u32 = h.parse().ok()?;
    if width == 0 || height == 0 {
        return None;
    }
    Some((width, height))
}

/// Tri-state conversion flag from `auto` / `true` / `false`
pub fn parse_convert_mode(token: &str) -> Option<bool> {
    let token = token.trim();
    if token.eq_ignore_ascii_case("true") {
        Some(true)
    } else if token.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}
