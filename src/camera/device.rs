//! Camera device discovery.

use super::backend::CaptureBackend;
use super::types::{CameraError, CaptureSettings, DevicePosition, DeviceType, VideoDevice};

/// Criteria for picking a capture device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryQuery {
    /// Acceptable device types, most preferred first
    pub device_types: Vec<DeviceType>,
    pub position: DevicePosition,
}

impl DiscoveryQuery {
    pub fn from_settings(settings: &CaptureSettings) -> Self {
        Self {
            device_types: settings.device_types.clone(),
            position: settings.position,
        }
    }

    pub fn matches(&self, device: &VideoDevice) -> bool {
        device.position == self.position && self.device_types.contains(&device.device_type)
    }

    /// Keep matching devices, stable-sorted by device-type preference.
    pub fn filter(&self, devices: Vec<VideoDevice>) -> Vec<VideoDevice> {
        let mut matching: Vec<VideoDevice> =
            devices.into_iter().filter(|d| self.matches(d)).collect();
        matching.sort_by_key(|d| {
            self.device_types
                .iter()
                .position(|t| *t == d.device_type)
                .unwrap_or(usize::MAX)
        });
        matching
    }

    /// Preferred device type, used in error reports.
    pub fn primary_type(&self) -> DeviceType {
        self.device_types.first().copied().unwrap_or_default()
    }
}

/// A device wrapped for attachment to a capture session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInput {
    device: VideoDevice,
}

impl DeviceInput {
    pub fn new(device: VideoDevice) -> Self {
        Self { device }
    }

    pub fn device(&self) -> &VideoDevice {
        &self.device
    }
}

/// List all devices the backend can see.
///
/// Returns an empty vector when no cameras are present (not an error).
pub fn list_devices(backend: &dyn CaptureBackend) -> Result<Vec<VideoDevice>, CameraError> {
    backend.devices()
}
