//! One device session per attempt
//!
//! A session opens the camera with one combination's hints, reads a
//! stabilized frame and releases the handle. Handles never outlive the
//! attempt that opened them.

use crate::errors::CameraError;
use crate::negotiation::CaptureCombination;
use crate::platform::{CameraDevice, NegotiatedFormat};
use image::DynamicImage;

/// Open device handle, closed when dropped
struct HandleGuard<'a, D: CameraDevice> {
    device: &'a D,
    handle: Option<D::Handle>,
}

impl<D: CameraDevice> HandleGuard<'_, D> {
    fn handle_mut(&mut self) -> &mut D::Handle {
        self.handle
            .as_mut()
            .expect("handle is only taken in drop")
    }

    fn handle(&self) -> &D::Handle {
        self.handle.as_ref().expect("handle is only taken in drop")
    }
}

impl<D: CameraDevice> Drop for HandleGuard<'_, D> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.device.close(handle);
        }
    }
}

/// Camera opened for a single attempt
pub struct DeviceSession<'a, D: CameraDevice> {
    guard: HandleGuard<'a, D>,
    index: u32,
}

impl<'a, D: CameraDevice> DeviceSession<'a, D> {
    /// Open `index` with the combination's backend and hints
    pub fn open(
        device: &'a D,
        index: u32,
        combination: &CaptureCombination,
    ) -> Result<Self, CameraError> {
        let handle = device.open(index, combination.backend, &combination.hints())?;
        Ok(Self {
            guard: HandleGuard {
                device,
                handle: Some(handle),
            },
            index,
        })
    }

    pub fn negotiated_format(&self) -> NegotiatedFormat {
        self.guard.device.negotiated_format(self.guard.handle())
    }

    /// Read up to `warmup_frames` frames (at least one) and keep the last good one.
    ///
    /// `Ok(None)` means not a single frame could be read.
    pub fn read_stabilized_frame(
        &mut self,
        warmup_frames: u32,
    ) -> Result<Option<DynamicImage>, CameraError> {
        let frame_count = warmup_frames.max(1);
        let mut latest = None;
        let device = self.guard.device;

        for i in 0..frame_count {
            match device.read(self.guard.handle_mut())? {
                Some(frame) if frame.width() > 0 && frame.height() > 0 => {
                    latest = Some(frame);
                }
                _ => {
                    log::debug!(
                        "Camera {} produced no frame on read {}/{}",
                        self.index,
                        i + 1,
                        frame_count
                    );
                }
            }
        }

        Ok(latest)
    }

    /// Release the device now instead of at end of scope
    pub fn close(self) {}
}

/// What one session produced
#[derive(Debug)]
pub enum SessionOutcome {
    OpenFailed(CameraError),
    ReadFailed {
        negotiated: NegotiatedFormat,
    },
    Faulted {
        error: CameraError,
        negotiated: NegotiatedFormat,
    },
    Captured {
        frame: DynamicImage,
        negotiated: NegotiatedFormat,
    },
}

/// Open, read a stabilized frame and close, in that order
pub fn run_session<D: CameraDevice>(
    device: &D,
    index: u32,
    combination: &CaptureCombination,
    warmup_frames: u32,
) -> SessionOutcome {
    let mut session = match DeviceSession::open(device, index, combination) {
        Ok(session) => session,
        Err(error) => return SessionOutcome::OpenFailed(error),
    };

    let negotiated = session.negotiated_format();
    let read = session.read_stabilized_frame(warmup_frames);
    session.close();

    match read {
        Ok(Some(frame)) => SessionOutcome::Captured { frame, negotiated },
        Ok(None) => SessionOutcome::ReadFailed { negotiated },
        Err(error) => SessionOutcome::Faulted { error, negotiated },
    }
}
