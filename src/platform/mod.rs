//! Device-access boundary
//!
//! The capture engine only ever talks to a camera through [`CameraDevice`]:
//! open one device with one set of negotiation hints, read frames, close.
//! Production code uses the nokhwa adapter; tests use scripted stubs.

pub mod nokhwa_backend;

pub use nokhwa_backend::{list_devices, NokhwaDevice};

use crate::errors::CameraError;
use crate::negotiation::{Backend, NegotiationHints};
use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Format a device reports after open; every field is best-effort
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegotiatedFormat {
    pub pixel_format: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Enumerated camera
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub index: u32,
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Narrow open/read/close boundary over a platform camera subsystem.
///
/// Hints are only honored at open time on most drivers, so a handle is never
/// reused across attempts.
pub trait CameraDevice: Send + Sync {
    type Handle;

    /// Open `index` through `backend`, applying `hints` where the driver allows.
    ///
    /// Errors here are reported as `open_failed`.
    fn open(
        &self,
        index: u32,
        backend: Backend,
        hints: &NegotiationHints,
    ) -> Result<Self::Handle, CameraError>;

    /// Read one frame. `Ok(None)` means no frame was available this time;
    /// `Err` is a device fault.
    fn read(&self, handle: &mut Self::Handle) -> Result<Option<DynamicImage>, CameraError>;

    /// Release the handle
    fn close(&self, handle: Self::Handle);

    /// What the driver actually negotiated, for diagnostics only
    fn negotiated_format(&self, _handle: &Self::Handle) -> NegotiatedFormat {
        NegotiatedFormat::default()
    }
}
