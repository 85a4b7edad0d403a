//! Capture backend abstraction.
//!
//! A backend wraps the platform media stack: it enumerates devices, builds
//! device inputs, reads the active format under the device configuration lock,
//! and streams frames into a [`FrameSink`].

use super::delivery::FrameSink;
use super::device::{DeviceInput, DiscoveryQuery};
use super::output::OutputSettings;
use super::types::{CameraError, PixelFormat, SessionPreset, VideoDevice, VideoFormat};

/// Parameters for starting a frame stream.
#[derive(Debug, Clone)]
pub struct StreamRequest {
    pub device: VideoDevice,
    /// Format negotiated during configuration
    pub format: VideoFormat,
    /// Pixel format requested by the output
    pub pixel_format: PixelFormat,
}

pub trait CaptureBackend: Send {
    /// Short backend name for diagnostics.
    fn name(&self) -> &'static str;

    /// Every device known to the backend.
    fn devices(&self) -> Result<Vec<VideoDevice>, CameraError>;

    /// Devices matching `query`, ordered by the query's device-type preference.
    fn discover_devices(&self, query: &DiscoveryQuery) -> Result<Vec<VideoDevice>, CameraError> {
        Ok(query.filter(self.devices()?))
    }

    /// Build an input for `device`.
    fn open_input(&self, device: &VideoDevice) -> Result<DeviceInput, CameraError> {
        Ok(DeviceInput::new(device.clone()))
    }

    /// Whether the session can take this input.
    fn accepts_input(&self, _input: &DeviceInput) -> bool {
        true
    }

    /// Whether the session can take an output with these settings.
    fn accepts_output(&self, _settings: &OutputSettings) -> bool {
        true
    }

    /// Lock the device for configuration and read the format it will deliver
    /// under `preset`.
    fn read_active_format(
        &self,
        device: &VideoDevice,
        preset: SessionPreset,
    ) -> Result<VideoFormat, CameraError>;

    /// Begin delivering frames into `sink`. Must not block on the first frame.
    fn start_stream(&mut self, request: StreamRequest, sink: FrameSink) -> Result<(), CameraError>;

    /// Stop delivering frames and release every [`FrameSink`] clone.
    fn stop_stream(&mut self);

    fn is_streaming(&self) -> bool;
}

/// Format a device offers for `preset`: exact resolution match preferred,
/// otherwise the smallest format at least as large, otherwise the first.
pub fn format_for_preset(device: &VideoDevice, preset: SessionPreset) -> Option<VideoFormat> {
    let target = preset.resolution();
    device
        .formats
        .iter()
        .find(|f| f.resolution == target)
        .or_else(|| {
            device
                .formats
                .iter()
                .filter(|f| f.resolution.width >= target.width && f.resolution.height >= target.height)
                .min_by_key(|f| f.resolution.pixel_count())
        })
        .or_else(|| device.formats.first())
        .copied()
}
