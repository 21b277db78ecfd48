use thiserror::Error;

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("Camera initialization error: {0}")]
    InitializationError(String),
    #[error("Capture error: {0}")]
    CaptureError(String),
    #[error("Encoding error: {0}")]
    EncodingError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Capture cancelled")]
    Cancelled,
}

impl CameraError {
    /// Message without the category prefix, as recorded in attempt diagnostics.
    pub fn detail(&self) -> String {
        match self {
            CameraError::InitializationError(msg)
            | CameraError::CaptureError(msg)
            | CameraError::EncodingError(msg)
            | CameraError::ConfigError(msg) => msg.clone(),
            CameraError::Cancelled => "capture cancelled".to_string(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, CameraError::Cancelled)
    }
}

impl From<image::ImageError> for CameraError {
    fn from(e: image::ImageError) -> Self {
        CameraError::EncodingError(e.to_string())
    }
}
