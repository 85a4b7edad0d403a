//! Capture session and its configuration transactions.
//!
//! All changes to the session's input, output, and preset go through a
//! [`SessionTransaction`]. Staged changes are applied on [`SessionTransaction::commit`];
//! dropping a transaction without committing leaves the session untouched.

use super::backend::{CaptureBackend, StreamRequest};
use super::device::DeviceInput;
use super::output::VideoDataOutput;
use super::types::{CameraError, Resolution, SessionPreset, VideoDevice, VideoFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Configuring,
    Running,
}

/// One hardware pipeline: a backend, at most one input, at most one output.
pub struct CaptureSession {
    backend: Box<dyn CaptureBackend>,
    state: SessionState,
    preset: SessionPreset,
    frame_rate: u32,
    input: Option<DeviceInput>,
    output: Option<VideoDataOutput>,
    active_format: Option<VideoFormat>,
}

impl std::fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("backend", &self.backend.name())
            .field("state", &self.state)
            .field("preset", &self.preset)
            .field("input", &self.input.as_ref().map(|i| &i.device().name))
            .field("has_output", &self.output.is_some())
            .finish_non_exhaustive()
    }
}

impl CaptureSession {
    pub fn new(backend: Box<dyn CaptureBackend>) -> Self {
        Self {
            backend,
            state: SessionState::Idle,
            preset: SessionPreset::default(),
            frame_rate: 30,
            input: None,
            output: None,
            active_format: None,
        }
    }

    pub fn backend(&self) -> &dyn CaptureBackend {
        self.backend.as_ref()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    /// Running, and the backend's stream is still alive.
    pub fn is_streaming(&self) -> bool {
        self.is_running() && self.backend.is_streaming()
    }

    pub fn preset(&self) -> SessionPreset {
        self.preset
    }

    pub fn input(&self) -> Option<&DeviceInput> {
        self.input.as_ref()
    }

    pub fn output(&self) -> Option<&VideoDataOutput> {
        self.output.as_ref()
    }

    /// Negotiated frame dimensions, zero until a format has been read.
    pub fn dimensions(&self) -> Resolution {
        self.active_format
            .map(|f| f.resolution)
            .unwrap_or(Resolution::ZERO)
    }

    pub fn active_format(&self) -> Option<VideoFormat> {
        self.active_format
    }

    /// Open a configuration transaction.
    pub fn begin_configuration(&mut self) -> SessionTransaction<'_> {
        let resume = self.state;
        self.state = SessionState::Configuring;
        SessionTransaction {
            session: self,
            resume,
            preset: None,
            frame_rate: None,
            input: None,
            output: None,
            active_format: None,
            committed: false,
        }
    }

    /// Start frame delivery. No-op while already running.
    pub fn start_running(&mut self) -> Result<(), CameraError> {
        if self.state == SessionState::Running {
            return Ok(());
        }

        let (Some(input), Some(output)) = (self.input.as_ref(), self.output.as_ref()) else {
            return Err(CameraError::NotConfigured);
        };
        let Some(sink) = output.delegate().filter(|_| output.is_enabled()).cloned() else {
            return Err(CameraError::NotConfigured);
        };

        let pixel_format = output.settings().pixel_format;
        let mut format = self.active_format.unwrap_or(VideoFormat {
            resolution: self.preset.resolution(),
            pixel_format,
            fps: self.frame_rate,
        });
        if self.frame_rate > 0 && (format.fps == 0 || self.frame_rate < format.fps) {
            format.fps = self.frame_rate;
        }

        let request = StreamRequest {
            device: input.device().clone(),
            format,
            pixel_format,
        };
        log::info!(
            "Starting {} stream on '{}' ({})",
            self.backend.name(),
            request.device.name,
            request.format
        );
        self.backend.start_stream(request, sink)?;
        self.state = SessionState::Running;
        Ok(())
    }

    /// Stop frame delivery. No-op unless running.
    pub fn stop_running(&mut self) {
        if self.state != SessionState::Running {
            return;
        }
        self.backend.stop_stream();
        self.state = SessionState::Idle;
        log::info!("Capture session stopped");
    }

    /// Stop delivery and release the output's delegate.
    pub fn shutdown(&mut self) {
        self.stop_running();
        if let Some(output) = self.output.as_mut() {
            output.clear_delegate();
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.stop_running();
    }
}

/// Staged changes to a [`CaptureSession`].
pub struct SessionTransaction<'a> {
    session: &'a mut CaptureSession,
    resume: SessionState,
    preset: Option<SessionPreset>,
    frame_rate: Option<u32>,
    input: Option<DeviceInput>,
    output: Option<VideoDataOutput>,
    active_format: Option<VideoFormat>,
    committed: bool,
}

impl SessionTransaction<'_> {
    pub fn set_preset(&mut self, preset: SessionPreset) {
        self.preset = Some(preset);
    }

    pub fn set_frame_rate(&mut self, fps: u32) {
        self.frame_rate = Some(fps);
    }

    fn effective_preset(&self) -> SessionPreset {
        self.preset.unwrap_or(self.session.preset)
    }

    pub fn can_add_input(&self, input: &DeviceInput) -> bool {
        self.session.input.is_none()
            && self.input.is_none()
            && self.session.backend.accepts_input(input)
    }

    pub fn add_input(&mut self, input: DeviceInput) -> Result<(), CameraError> {
        if !self.can_add_input(&input) {
            return Err(CameraError::InputRejected(format!(
                "session cannot take '{}'",
                input.device().name
            )));
        }
        self.input = Some(input);
        Ok(())
    }

    pub fn can_add_output(&self, output: &VideoDataOutput) -> bool {
        self.session.output.is_none()
            && self.output.is_none()
            && self.session.backend.accepts_output(output.settings())
    }

    pub fn add_output(&mut self, output: VideoDataOutput) -> Result<(), CameraError> {
        if !self.can_add_output(&output) {
            return Err(CameraError::OutputRejected(format!(
                "session cannot deliver {}",
                output.settings().pixel_format
            )));
        }
        self.output = Some(output);
        Ok(())
    }

    /// Read the device's active format under its configuration lock.
    pub fn read_active_format(&self, device: &VideoDevice) -> Result<VideoFormat, CameraError> {
        self.session
            .backend
            .read_active_format(device, self.effective_preset())
    }

    pub fn set_active_format(&mut self, format: VideoFormat) {
        self.active_format = Some(format);
    }

    /// Apply every staged change atomically.
    pub fn commit(mut self) {
        let session = &mut *self.session;
        if let Some(preset) = self.preset.take() {
            session.preset = preset;
        }
        if let Some(fps) = self.frame_rate.take() {
            session.frame_rate = fps;
        }
        if let Some(input) = self.input.take() {
            session.input = Some(input);
        }
        if let Some(output) = self.output.take() {
            session.output = Some(output);
        }
        if let Some(format) = self.active_format.take() {
            session.active_format = Some(format);
        }
        session.state = self.resume;
        self.committed = true;
    }

    /// Discard staged changes. Equivalent to dropping the transaction.
    pub fn rollback(self) {}
}

impl Drop for SessionTransaction<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.session.state = self.resume;
            log::debug!("Configuration transaction rolled back");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::output::OutputSettings;
    use crate::camera::synthetic::SyntheticBackend;

    fn session() -> (CaptureSession, VideoDevice) {
        let backend = SyntheticBackend::new();
        let device = backend.devices().unwrap().remove(0);
        (CaptureSession::new(Box::new(backend)), device)
    }

    #[test]
    fn test_commit_applies_staged_changes() {
        let (mut session, device) = session();
        let mut tx = session.begin_configuration();
        tx.set_preset(SessionPreset::Hd1280x720);
        tx.add_input(DeviceInput::new(device.clone())).unwrap();
        tx.add_output(VideoDataOutput::new(OutputSettings::default()))
            .unwrap();
        let format = tx.read_active_format(&device).unwrap();
        tx.set_active_format(format);
        tx.commit();

        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.preset(), SessionPreset::Hd1280x720);
        assert!(session.input().is_some());
        assert!(session.output().is_some());
        assert_eq!(session.dimensions(), Resolution::HD);
    }

    #[test]
    fn test_dropped_transaction_changes_nothing() {
        let (mut session, device) = session();
        {
            let mut tx = session.begin_configuration();
            tx.add_input(DeviceInput::new(device)).unwrap();
            tx.rollback();
        }
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.input().is_none());
        assert_eq!(session.dimensions(), Resolution::ZERO);
    }

    #[test]
    fn test_second_input_rejected() {
        let (mut session, device) = session();
        let mut tx = session.begin_configuration();
        tx.add_input(DeviceInput::new(device.clone())).unwrap();
        let second = DeviceInput::new(device);
        assert!(!tx.can_add_input(&second));
        assert!(matches!(
            tx.add_input(second),
            Err(CameraError::InputRejected(_))
        ));
        tx.add_output(VideoDataOutput::default()).unwrap();
        tx.commit();

        // Committed components block further attachments
        let tx = session.begin_configuration();
        assert!(!tx.can_add_output(&VideoDataOutput::default()));
        tx.rollback();
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_start_requires_input_and_output() {
        let (mut session, _) = session();
        assert!(matches!(
            session.start_running(),
            Err(CameraError::NotConfigured)
        ));
        assert_eq!(session.state(), SessionState::Idle);
    }
}
