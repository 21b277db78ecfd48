//! Scripted camera device
//!
//! Each successful open starts a new session; reads for that session are
//! served from the script registered under its 0-based session number.
//! Sessions without a script read the default entry, or nothing.

use crate::errors::CameraError;
use crate::negotiation::{Backend, NegotiationHints};
use crate::platform::{CameraDevice, NegotiatedFormat};
use image::DynamicImage;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// One scripted response to `read`
#[derive(Debug, Clone)]
pub enum ScriptedRead {
    Frame(DynamicImage),
    Empty,
    Fault(String),
    Panic(String),
}

/// Recorded `open` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenCall {
    pub index: u32,
    pub backend: Backend,
    pub hints: NegotiationHints,
}

#[derive(Debug)]
pub struct ScriptedHandle {
    session: usize,
    hints: NegotiationHints,
}

#[derive(Default)]
pub struct ScriptedDevice {
    failing_backends: Vec<Backend>,
    scripts: Mutex<HashMap<usize, VecDeque<ScriptedRead>>>,
    default_read: Option<ScriptedRead>,
    cancel_on_open: Option<CancellationToken>,
    opens: Mutex<Vec<OpenCall>>,
    sessions: AtomicUsize,
    reads: AtomicUsize,
    closes: AtomicUsize,
}

impl ScriptedDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the reads of the `session`-th successful open
    pub fn with_reads(self, session: usize, reads: Vec<ScriptedRead>) -> Self {
        self.scripts
            .lock()
            .expect("script lock poisoned")
            .insert(session, reads.into());
        self
    }

    /// Read returned whenever a session has no scripted entries left
    pub fn with_default_read(mut self, read: ScriptedRead) -> Self {
        self.default_read = Some(read);
        self
    }

    /// Every open through `backend` fails
    pub fn failing_open(mut self, backend: Backend) -> Self {
        self.failing_backends.push(backend);
        self
    }

    /// Trigger `token` on the first open, as if the user cancelled mid-attempt
    pub fn cancel_on_open(mut self, token: CancellationToken) -> Self {
        self.cancel_on_open = Some(token);
        self
    }

    pub fn open_calls(&self) -> Vec<OpenCall> {
        self.opens.lock().expect("open lock poisoned").clone()
    }

    pub fn open_count(&self) -> usize {
        self.opens.lock().expect("open lock poisoned").len()
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn next_read(&self, session: usize) -> Option<ScriptedRead> {
        let scripted = self
            .scripts
            .lock()
            .expect("script lock poisoned")
            .get_mut(&session)
            .and_then(|reads| reads.pop_front());
        scripted.or_else(|| self.default_read.clone())
    }
}

impl CameraDevice for ScriptedDevice {
    type Handle = ScriptedHandle;

    fn open(
        &self,
        index: u32,
        backend: Backend,
        hints: &NegotiationHints,
    ) -> Result<ScriptedHandle, CameraError> {
        self.opens.lock().expect("open lock poisoned").push(OpenCall {
            index,
            backend,
            hints: *hints,
        });

        if let Some(token) = &self.cancel_on_open {
            token.cancel();
        }

        if self.failing_backends.contains(&backend) {
            return Err(CameraError::InitializationError(format!(
                "scripted open failure on {}",
                backend
            )));
        }

        Ok(ScriptedHandle {
            session: self.sessions.fetch_add(1, Ordering::SeqCst),
            hints: *hints,
        })
    }

    fn read(&self, handle: &mut ScriptedHandle) -> Result<Option<DynamicImage>, CameraError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        match self.next_read(handle.session) {
            Some(ScriptedRead::Frame(frame)) => Ok(Some(frame)),
            Some(ScriptedRead::Empty) | None => Ok(None),
            Some(ScriptedRead::Fault(message)) => Err(CameraError::CaptureError(message)),
            Some(ScriptedRead::Panic(message)) => panic!("{}", message),
        }
    }

    fn close(&self, _handle: ScriptedHandle) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }

    /// Echoes the hints back as if the driver accepted them
    fn negotiated_format(&self, handle: &ScriptedHandle) -> NegotiatedFormat {
        NegotiatedFormat {
            pixel_format: handle.hints.four_cc.map(|code| code.to_string()),
            width: handle.hints.width,
            height: handle.hints.height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::gray_frame;

    #[test]
    fn test_sessions_read_their_own_script() {
        let device = ScriptedDevice::new()
            .with_reads(0, vec![ScriptedRead::Empty])
            .with_reads(1, vec![ScriptedRead::Frame(gray_frame(2, 2, 50))]);
        let hints = NegotiationHints::default();

        let mut first = device.open(0, Backend::Any, &hints).unwrap();
        assert!(device.read(&mut first).unwrap().is_none());
        device.close(first);

        let mut second = device.open(0, Backend::Any, &hints).unwrap();
        assert!(device.read(&mut second).unwrap().is_some());
        device.close(second);

        assert_eq!(device.open_count(), 2);
        assert_eq!(device.close_count(), 2);
    }

    #[test]
    fn test_failing_backend_records_the_call() {
        let device = ScriptedDevice::new().failing_open(Backend::MediaFoundation);
        let hints = NegotiationHints::default();
        assert!(device.open(3, Backend::MediaFoundation, &hints).is_err());
        assert!(device.open(3, Backend::Any, &hints).is_ok());
        let calls = device.open_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].backend, Backend::MediaFoundation);
        assert_eq!(calls[1].index, 3);
    }
}
