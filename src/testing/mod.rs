//! Testing utilities for SessionCam
//!
//! Synthetic frames and a scripted [`CameraDevice`](crate::platform::CameraDevice)
//! so the whole negotiation engine can be exercised without hardware.

pub mod scripted_device;
pub mod synthetic_data;

pub use scripted_device::{ScriptedDevice, ScriptedRead};
pub use synthetic_data::{black_frame, gradient_frame, gray_frame, near_black_frame};
