//! Capture orchestration
//!
//! [`CaptureEngine`] walks the planned combinations, retrying each one a
//! bounded number of times, and returns the first usable JPEG together with
//! a diagnostics record of every attempt made.

pub mod orchestrator;

pub use orchestrator::{CaptureEngine, DEFAULT_BACKOFF, DEFAULT_FAILURE_CODE};
