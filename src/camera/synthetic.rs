//! Synthetic capture backend.
//!
//! Produces a moving test pattern on a background thread at the negotiated
//! resolution. Devices and failure modes are configurable, which makes it the
//! backend for tests and for running the pipeline on machines without a camera.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::backend::{format_for_preset, CaptureBackend, StreamRequest};
use super::delivery::{Delivery, FrameSink};
use super::device::DeviceInput;
use super::frame_utils::test_pattern;
use super::output::OutputSettings;
use super::orientation::ImageOrientation;
use super::types::{
    CameraError, DevicePosition, DeviceType, FrameBuffer, PixelFormat, Resolution,
    SessionPreset, VideoDevice, VideoFormat,
};

/// Failure modes the synthetic backend can simulate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Faults {
    /// `open_input` fails with permission denied
    pub deny_permission: bool,
    /// Session refuses the device input
    pub reject_input: bool,
    /// Session refuses the video data output
    pub reject_output: bool,
    /// Device configuration lock cannot be taken
    pub fail_device_lock: bool,
}

struct StreamHandle {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

/// Test-pattern camera.
pub struct SyntheticBackend {
    devices: Vec<VideoDevice>,
    faults: Faults,
    frame_interval: Option<Duration>,
    produced: Arc<AtomicU64>,
    streams_started: Arc<AtomicU64>,
    stream: Option<StreamHandle>,
}

impl SyntheticBackend {
    /// Backend with a back and a front wide-angle camera.
    pub fn new() -> Self {
        Self::with_devices(vec![
            Self::device("synthetic-back", DevicePosition::Back, DeviceType::WideAngle),
            Self::device("synthetic-front", DevicePosition::Front, DeviceType::WideAngle),
        ])
    }

    pub fn with_devices(devices: Vec<VideoDevice>) -> Self {
        Self {
            devices,
            faults: Faults::default(),
            frame_interval: None,
            produced: Arc::new(AtomicU64::new(0)),
            streams_started: Arc::new(AtomicU64::new(0)),
            stream: None,
        }
    }

    /// A device offering the usual preset resolutions in NV12 at 30 fps.
    pub fn device(id: &str, position: DevicePosition, device_type: DeviceType) -> VideoDevice {
        let formats = [
            Resolution::LOW,
            Resolution::VGA,
            Resolution::HD,
            Resolution::FULL_HD,
        ]
        .into_iter()
        .map(|resolution| VideoFormat {
            resolution,
            pixel_format: PixelFormat::Nv12FullRange,
            fps: 30,
        })
        .collect();

        VideoDevice {
            id: id.to_string(),
            name: format!("Synthetic {} camera", position),
            position,
            device_type,
            formats,
        }
    }

    pub fn with_faults(mut self, faults: Faults) -> Self {
        self.faults = faults;
        self
    }

    /// Fixed delay between frames; defaults to the stream's frame rate.
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = Some(interval);
        self
    }

    /// Counter of frames handed to the sink, shared with the stream thread.
    pub fn produced_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.produced)
    }

    /// Counter of `start_stream` calls that actually spawned a stream.
    pub fn streams_started_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.streams_started)
    }
}

impl Default for SyntheticBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureBackend for SyntheticBackend {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn devices(&self) -> Result<Vec<VideoDevice>, CameraError> {
        Ok(self.devices.clone())
    }

    fn open_input(&self, device: &VideoDevice) -> Result<DeviceInput, CameraError> {
        if self.faults.deny_permission {
            return Err(CameraError::PermissionDenied);
        }
        Ok(DeviceInput::new(device.clone()))
    }

    fn accepts_input(&self, _input: &DeviceInput) -> bool {
        !self.faults.reject_input
    }

    fn accepts_output(&self, _settings: &OutputSettings) -> bool {
        !self.faults.reject_output
    }

    fn read_active_format(
        &self,
        device: &VideoDevice,
        preset: SessionPreset,
    ) -> Result<VideoFormat, CameraError> {
        if self.faults.fail_device_lock {
            return Err(CameraError::DeviceLockFailure {
                device: device.name.clone(),
                reason: "device is locked by another client".to_string(),
            });
        }
        format_for_preset(device, preset).ok_or_else(|| CameraError::DeviceLockFailure {
            device: device.name.clone(),
            reason: "device reports no formats".to_string(),
        })
    }

    fn start_stream(&mut self, request: StreamRequest, sink: FrameSink) -> Result<(), CameraError> {
        if self.stream.is_some() {
            return Ok(());
        }

        let resolution = if request.format.resolution.is_zero() {
            Resolution::VGA
        } else {
            request.format.resolution
        };
        let interval = self.frame_interval.unwrap_or_else(|| {
            Duration::from_secs_f64(1.0 / f64::from(request.format.fps.max(1)))
        });
        let pixel_format = request.pixel_format;
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let produced = Arc::clone(&self.produced);

        let thread = thread::Builder::new()
            .name(format!("synthetic-{}", request.device.id))
            .spawn(move || {
                run_stream(resolution, pixel_format, interval, sink, thread_stop, produced)
            })
            .map_err(|e| CameraError::StreamFailed(e.to_string()))?;

        self.streams_started.fetch_add(1, Ordering::SeqCst);
        self.stream = Some(StreamHandle { stop, thread });
        Ok(())
    }

    fn stop_stream(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.stop.store(true, Ordering::SeqCst);
            let _ = stream.thread.join();
        }
    }

    fn is_streaming(&self) -> bool {
        self.stream
            .as_ref()
            .is_some_and(|s| !s.thread.is_finished())
    }
}

impl Drop for SyntheticBackend {
    fn drop(&mut self) {
        self.stop_stream();
    }
}

fn run_stream(
    resolution: Resolution,
    pixel_format: PixelFormat,
    interval: Duration,
    sink: FrameSink,
    stop: Arc<AtomicBool>,
    produced: Arc<AtomicU64>,
) {
    let mut sequence = 0u64;
    let mut next_at = Instant::now();

    while !stop.load(Ordering::Relaxed) {
        let frame = FrameBuffer {
            data: test_pattern(resolution, pixel_format, sequence),
            width: resolution.width,
            height: resolution.height,
            format: pixel_format,
            timestamp: Instant::now(),
            sequence,
            orientation: ImageOrientation::Up,
        };
        produced.fetch_add(1, Ordering::Relaxed);
        if sink.deliver(frame) == Delivery::Closed {
            break;
        }
        sequence += 1;

        next_at += interval;
        let now = Instant::now();
        if next_at > now {
            thread::sleep(next_at - now);
        } else {
            next_at = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_devices() {
        let backend = SyntheticBackend::new();
        let devices = backend.devices().unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].position, DevicePosition::Back);
        assert_eq!(devices[1].position, DevicePosition::Front);
    }

    #[test]
    fn test_active_format_follows_preset() {
        let backend = SyntheticBackend::new();
        let device = &backend.devices().unwrap()[0];
        let format = backend
            .read_active_format(device, SessionPreset::Vga640x480)
            .unwrap();
        assert_eq!(format.resolution, Resolution::VGA);
    }

    #[test]
    fn test_lock_fault() {
        let backend = SyntheticBackend::new().with_faults(Faults {
            fail_device_lock: true,
            ..Faults::default()
        });
        let device = &backend.devices().unwrap()[0];
        assert!(matches!(
            backend.read_active_format(device, SessionPreset::Vga640x480),
            Err(CameraError::DeviceLockFailure { .. })
        ));
    }

    #[test]
    fn test_permission_fault() {
        let backend = SyntheticBackend::new().with_faults(Faults {
            deny_permission: true,
            ..Faults::default()
        });
        let device = &backend.devices().unwrap()[0];
        assert!(matches!(
            backend.open_input(device),
            Err(CameraError::PermissionDenied)
        ));
    }
}
