//! Camera acquisition controller.
//!
//! Owns the capture session, wires one device input and one video data output,
//! keeps the preview surface, and feeds every delivered frame to a
//! [`FrameProcessor`] on a dedicated serial delivery context.

use std::sync::Arc;

use super::backend::CaptureBackend;
use super::delivery::{DeliveryStats, SerialQueue};
use super::device::DiscoveryQuery;
use super::orientation::{exif_orientation, ImageOrientation, OrientationSource};
use super::output::{OutputSettings, VideoDataOutput};
use super::preview::{PreviewSurface, Rect, VideoGravity};
use super::processor::FrameProcessor;
use super::session::CaptureSession;
use super::types::{CameraError, CaptureSettings, Resolution, VideoDevice};
use crate::logger::{self, Kind};

/// Lifecycle of the acquisition controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Unconfigured,
    Configuring,
    Configured,
    Running,
    Stopped,
}

/// Camera acquisition controller.
///
/// ```no_run
/// use std::sync::Arc;
/// use smoking_detection::camera::{
///     AcquisitionController, FrameStats, SharedOrientation, SyntheticBackend, CaptureSettings,
/// };
///
/// let mut controller = AcquisitionController::new(
///     Box::new(SyntheticBackend::new()),
///     CaptureSettings::default(),
///     FrameStats::new(30),
///     Arc::new(SharedOrientation::default()),
/// )?;
/// controller.configure()?;
/// controller.start_capture_session()?;
/// # Ok::<(), smoking_detection::camera::CameraError>(())
/// ```
pub struct AcquisitionController<P: FrameProcessor> {
    state: ControllerState,
    settings: CaptureSettings,
    gravity: VideoGravity,
    session: CaptureSession,
    queue: Option<SerialQueue<P>>,
    orientation: Arc<dyn OrientationSource>,
    device: Option<VideoDevice>,
    buffer_size: Resolution,
    view_bounds: Rect,
    preview: Option<PreviewSurface>,
}

impl<P: FrameProcessor> std::fmt::Debug for AcquisitionController<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcquisitionController")
            .field("state", &self.state)
            .field("settings", &self.settings)
            .field("buffer_size", &self.buffer_size)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl<P: FrameProcessor> AcquisitionController<P> {
    /// Create a controller and its delivery context.
    ///
    /// The processor moves onto the delivery thread right away; it receives
    /// frames once the session is configured and running.
    pub fn new(
        backend: Box<dyn CaptureBackend>,
        settings: CaptureSettings,
        processor: P,
        orientation: Arc<dyn OrientationSource>,
    ) -> Result<Self, CameraError> {
        let queue = SerialQueue::spawn(
            &settings.queue_label,
            settings.late_frames,
            processor,
            Arc::clone(&orientation),
        )?;

        Ok(Self {
            state: ControllerState::Unconfigured,
            settings,
            gravity: VideoGravity::default(),
            session: CaptureSession::new(backend),
            queue: Some(queue),
            orientation,
            device: None,
            buffer_size: Resolution::ZERO,
            view_bounds: Rect::default(),
            preview: None,
        })
    }

    /// Content-fill mode for the preview surface created by [`configure`](Self::configure).
    pub fn with_gravity(mut self, gravity: VideoGravity) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    /// Device selected by the last successful configuration.
    pub fn device(&self) -> Option<&VideoDevice> {
        self.device.as_ref()
    }

    /// Negotiated frame dimensions.
    ///
    /// Zero when the device lock could not be taken during configuration.
    pub fn buffer_size(&self) -> Resolution {
        self.buffer_size
    }

    pub fn preview(&self) -> Option<&PreviewSurface> {
        self.preview.as_ref()
    }

    /// Whether frames are still being produced. Turns false after a stop, or
    /// when the stream ends on its own, e.g. because the frame processor panicked.
    pub fn is_streaming(&self) -> bool {
        self.state == ControllerState::Running && self.session.is_streaming()
    }

    pub fn delivery_stats(&self) -> DeliveryStats {
        self.queue
            .as_ref()
            .map(|q| q.stats())
            .unwrap_or_default()
    }

    /// Configure the capture session.
    ///
    /// Selects the first matching device, attaches its input and a video data
    /// output inside one configuration transaction, and records the negotiated
    /// dimensions. On failure the transaction is abandoned, the error is logged,
    /// and the controller stays `Unconfigured`. Once configured, further calls
    /// are no-ops.
    ///
    /// # Errors
    ///
    /// - [`CameraError::DeviceUnavailable`] if no device matches the settings
    /// - [`CameraError::PermissionDenied`] or other backend errors if the
    ///   device input cannot be created
    /// - [`CameraError::InputRejected`] / [`CameraError::OutputRejected`] if
    ///   the session refuses the input or output
    ///
    /// A failed device lock is not an error; dimensions stay zero.
    pub fn configure(&mut self) -> Result<(), CameraError> {
        if self.state != ControllerState::Unconfigured {
            log::debug!("Capture session already configured");
            return Ok(());
        }

        self.state = ControllerState::Configuring;
        match self.configure_session() {
            Ok(()) => {
                self.preview = Some(PreviewSurface::new(self.view_bounds, self.gravity));
                self.state = ControllerState::Configured;
                log::info!(
                    "Capture session configured: {} at {}",
                    self.device.as_ref().map_or("<none>", |d| d.name.as_str()),
                    self.buffer_size
                );
                Ok(())
            }
            Err(e) => {
                logger::log(Kind::Error, &e);
                self.state = ControllerState::Unconfigured;
                Err(e)
            }
        }
    }

    fn configure_session(&mut self) -> Result<(), CameraError> {
        let query = DiscoveryQuery::from_settings(&self.settings);
        let device = self
            .session
            .backend()
            .discover_devices(&query)?
            .into_iter()
            .next()
            .ok_or(CameraError::DeviceUnavailable {
                position: query.position,
                device_type: query.primary_type(),
            })?;
        let input = self.session.backend().open_input(&device)?;

        let sink = self
            .queue
            .as_ref()
            .and_then(|q| q.sink())
            .ok_or_else(|| CameraError::StreamFailed("delivery queue is closed".to_string()))?;

        let mut tx = self.session.begin_configuration();
        tx.set_preset(self.settings.preset);
        tx.set_frame_rate(self.settings.fps);

        if !tx.can_add_input(&input) {
            return Err(CameraError::InputRejected(format!(
                "session refused '{}'",
                device.name
            )));
        }
        tx.add_input(input)?;

        let mut output = VideoDataOutput::new(OutputSettings {
            pixel_format: self.settings.pixel_format,
            late_frames: self.settings.late_frames,
        });
        if !tx.can_add_output(&output) {
            return Err(CameraError::OutputRejected(format!(
                "session refused {} output",
                self.settings.pixel_format
            )));
        }
        output.set_delegate(sink);
        output.set_enabled(true);
        tx.add_output(output)?;

        let dimensions = match tx.read_active_format(&device) {
            Ok(format) => {
                tx.set_active_format(format);
                format.resolution
            }
            Err(e) => {
                log::warn!("{}; frame dimensions default to zero", e);
                Resolution::ZERO
            }
        };
        tx.commit();

        self.buffer_size = dimensions;
        self.device = Some(device);
        Ok(())
    }

    /// Begin continuous frame delivery.
    ///
    /// No-op while running. Resumes delivery from `Stopped`.
    ///
    /// # Errors
    ///
    /// Returns [`CameraError::NotConfigured`] before a successful
    /// [`configure`](Self::configure), or the backend's error if the stream
    /// cannot be started.
    pub fn start_capture_session(&mut self) -> Result<(), CameraError> {
        match self.state {
            ControllerState::Running => Ok(()),
            ControllerState::Configured | ControllerState::Stopped => {
                self.session.start_running()?;
                self.state = ControllerState::Running;
                Ok(())
            }
            ControllerState::Unconfigured | ControllerState::Configuring => {
                Err(CameraError::NotConfigured)
            }
        }
    }

    /// Cease frame delivery. An in-flight hook call runs to completion.
    pub fn stop_capture_session(&mut self) {
        if self.state == ControllerState::Running {
            self.session.stop_running();
            self.state = ControllerState::Stopped;
        }
    }

    /// Detach and release the preview surface. Delivery keeps running.
    pub fn teardown_acquisition(&mut self) {
        if let Some(mut preview) = self.preview.take() {
            preview.detach();
            log::debug!("Preview surface torn down");
        }
    }

    /// Resize the preview to new view bounds.
    pub fn layout(&mut self, bounds: Rect) {
        self.view_bounds = bounds;
        if let Some(preview) = self.preview.as_mut() {
            preview.set_frame(bounds);
        }
    }

    /// EXIF orientation matching the device's current physical orientation.
    pub fn orientation_for_current_device(&self) -> ImageOrientation {
        exif_orientation(self.orientation.current())
    }

    /// Stop delivery, drain the delivery context, and hand back the processor.
    pub fn into_processor(mut self) -> Option<P> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Option<P> {
        self.session.shutdown();
        if self.state == ControllerState::Running {
            self.state = ControllerState::Stopped;
        }
        self.queue.take()?.shutdown()
    }
}

impl<P: FrameProcessor> Drop for AcquisitionController<P> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
