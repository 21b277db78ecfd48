use super::{CameraDevice, DeviceInfo, NegotiatedFormat};
use crate::errors::CameraError;
use crate::negotiation::{Backend, FourCc, NegotiationHints};
use image::{DynamicImage, RgbImage};
use nokhwa::{
    pixel_format::RgbFormat,
    query,
    utils::{
        ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
        Resolution,
    },
    Camera,
};

/// nokhwa needs a resolution to match a pixel format against
const FORMAT_ONLY_RESOLUTION: (u32, u32) = (640, 480);
const REQUESTED_FPS: u32 = 30;

/// Production [`CameraDevice`] backed by nokhwa's native inputs
#[derive(Debug, Clone, Copy, Default)]
pub struct NokhwaDevice;

pub struct NokhwaHandle {
    camera: Camera,
    index: u32,
}

fn api_backend(backend: Backend) -> ApiBackend {
    match backend {
        Backend::MediaFoundation => ApiBackend::MediaFoundation,
        Backend::Video4Linux => ApiBackend::Video4Linux,
        Backend::Any => ApiBackend::Auto,
    }
}

fn frame_format(code: FourCc) -> Option<FrameFormat> {
    match &code.as_bytes() {
        b"MJPG" => Some(FrameFormat::MJPEG),
        b"YUY2" | b"YUYV" => Some(FrameFormat::YUYV),
        b"NV12" => Some(FrameFormat::NV12),
        b"GRAY" | b"Y800" => Some(FrameFormat::GRAY),
        _ => None,
    }
}

fn frame_format_token(format: FrameFormat) -> String {
    match format {
        FrameFormat::MJPEG => "MJPG".to_string(),
        FrameFormat::YUYV => "YUYV".to_string(),
        FrameFormat::NV12 => "NV12".to_string(),
        FrameFormat::GRAY => "GRAY".to_string(),
        other => format!("{:?}", other),
    }
}

fn requested_format(hints: &NegotiationHints) -> RequestedFormat<'static> {
    let wanted_format = hints.four_cc.and_then(|code| {
        let mapped = frame_format(code);
        if mapped.is_none() {
            log::debug!("Pixel format {} has no nokhwa equivalent, ignoring", code);
        }
        mapped
    });

    let format_type = match (hints.resolution(), wanted_format) {
        (None, None) => RequestedFormatType::None,
        (Some((w, h)), None) => RequestedFormatType::HighestResolution(Resolution::new(w, h)),
        (resolution, Some(format)) => {
            let (w, h) = resolution.unwrap_or(FORMAT_ONLY_RESOLUTION);
            RequestedFormatType::Closest(CameraFormat::new(
                Resolution::new(w, h),
                format,
                REQUESTED_FPS,
            ))
        }
    };

    RequestedFormat::new::<RgbFormat>(format_type)
}

impl CameraDevice for NokhwaDevice {
    type Handle = NokhwaHandle;

    fn open(
        &self,
        index: u32,
        backend: Backend,
        hints: &NegotiationHints,
    ) -> Result<NokhwaHandle, CameraError> {
        if let Some(convert) = hints.force_convert_rgb {
            // Frames are always decoded to RGB in-process
            log::debug!("Conversion hint {} handled in-process for camera {}", convert, index);
        }

        let mut camera = Camera::with_backend(
            CameraIndex::Index(index),
            requested_format(hints),
            api_backend(backend),
        )
        .map_err(|e| {
            CameraError::InitializationError(format!(
                "Unable to open camera {} via {}: {}",
                index, backend, e
            ))
        })?;

        camera.open_stream().map_err(|e| {
            CameraError::InitializationError(format!(
                "Unable to start stream on camera {}: {}",
                index, e
            ))
        })?;

        Ok(NokhwaHandle { camera, index })
    }

    fn read(&self, handle: &mut NokhwaHandle) -> Result<Option<DynamicImage>, CameraError> {
        let buffer = match handle.camera.frame() {
            Ok(buffer) => buffer,
            Err(e) => {
                log::debug!("Camera {} returned no frame: {}", handle.index, e);
                return Ok(None);
            }
        };

        let raw = buffer.buffer();
        let is_mjpeg = raw.len() >= 3 && raw[0] == 0xFF && raw[1] == 0xD8 && raw[2] == 0xFF;

        // Some drivers hand back MJPEG even when RGB was requested
        if is_mjpeg {
            return match image::load_from_memory(raw) {
                Ok(img) => Ok(Some(img)),
                Err(e) => {
                    log::debug!("Failed to decode MJPEG frame from camera {}: {}", handle.index, e);
                    Ok(None)
                }
            };
        }

        match buffer.decode_image::<RgbFormat>() {
            Ok(decoded) => {
                let (width, height) = (decoded.width(), decoded.height());
                Ok(RgbImage::from_raw(width, height, decoded.into_raw()).map(DynamicImage::ImageRgb8))
            }
            Err(e) => {
                log::debug!("Failed to decode frame from camera {}: {}", handle.index, e);
                Ok(None)
            }
        }
    }

    fn close(&self, mut handle: NokhwaHandle) {
        if let Err(e) = handle.camera.stop_stream() {
            log::debug!("Error stopping stream on camera {}: {}", handle.index, e);
        }
    }

    fn negotiated_format(&self, handle: &NokhwaHandle) -> NegotiatedFormat {
        let format = handle.camera.camera_format();
        let positive = |v: u32| (v > 0).then_some(v);
        NegotiatedFormat {
            pixel_format: Some(frame_format_token(format.format())),
            width: positive(format.width()),
            height: positive(format.height()),
        }
    }
}

/// List cameras visible to the platform's default backend
pub fn list_devices() -> Result<Vec<DeviceInfo>, CameraError> {
    let cameras = query(ApiBackend::Auto)
        .map_err(|e| CameraError::InitializationError(format!("Failed to query cameras: {}", e)))?;

    let devices = cameras
        .into_iter()
        .filter_map(|info| {
            let index = info.index().as_index().ok()?;
            let name = info.human_name();
            let description = info.description().to_string();
            Some(DeviceInfo {
                index,
                name: (!name.trim().is_empty()).then_some(name),
                description: (!description.trim().is_empty()).then_some(description),
            })
        })
        .collect::<Vec<_>>();

    log::info!("Found {} camera(s)", devices.len());
    Ok(devices)
}
