//! Real camera backend built on nokhwa.
//!
//! Desktop capture APIs do not report which way a camera faces, so every
//! camera is exposed with the position and type this backend is created with
//! (back-facing wide-angle by default).

use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, FrameFormat as NokhwaFrameFormat, RequestedFormat,
    RequestedFormatType,
};
use nokhwa::{query, Camera};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::backend::{CaptureBackend, StreamRequest};
use super::delivery::{Delivery, FrameSink};
use super::orientation::ImageOrientation;
use super::types::{
    CameraError, DevicePosition, DeviceType, FrameBuffer, PixelFormat, Resolution, SessionPreset,
    VideoDevice, VideoFormat,
};

struct StreamHandle {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

pub struct NokhwaBackend {
    position: DevicePosition,
    device_type: DeviceType,
    stream: Option<StreamHandle>,
}

impl NokhwaBackend {
    pub fn new() -> Self {
        Self::assuming(DevicePosition::Back, DeviceType::WideAngle)
    }

    /// Report every camera with the given position and type.
    pub fn assuming(position: DevicePosition, device_type: DeviceType) -> Self {
        Self {
            position,
            device_type,
            stream: None,
        }
    }
}

impl Default for NokhwaBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn camera_index(device: &VideoDevice) -> CameraIndex {
    match device.id.parse::<u32>() {
        Ok(index) => CameraIndex::Index(index),
        Err(_) => CameraIndex::String(device.id.clone()),
    }
}

fn map_open_error(e: nokhwa::NokhwaError) -> CameraError {
    let msg = e.to_string().to_lowercase();
    if msg.contains("permission")
        || msg.contains("denied")
        || msg.contains("authorization")
        || msg.contains("access")
    {
        CameraError::PermissionDenied
    } else {
        CameraError::StreamFailed(e.to_string())
    }
}

/// Try NV12 first (lowest latency), then MJPEG, then whatever the camera prefers.
fn open_camera_with_fallback(index: &CameraIndex, format: &VideoFormat) -> Result<Camera, CameraError> {
    let resolution = nokhwa::utils::Resolution::new(format.resolution.width, format.resolution.height);
    let fps = format.fps.max(1);
    let attempts = [
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(CameraFormat::new(
            resolution,
            NokhwaFrameFormat::NV12,
            fps,
        ))),
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(CameraFormat::new(
            resolution,
            NokhwaFrameFormat::MJPEG,
            fps,
        ))),
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate),
    ];

    let mut last_error = None;
    for requested in attempts {
        match Camera::new(index.clone(), requested) {
            Ok(camera) => return Ok(camera),
            Err(e) => last_error = Some(e),
        }
    }

    Err(last_error
        .map(map_open_error)
        .unwrap_or_else(|| CameraError::StreamFailed("no format accepted".to_string())))
}

/// Convert a nokhwa buffer into a frame, passing NV12 through untouched.
fn to_frame_buffer(
    buffer: &nokhwa::Buffer,
    requested: PixelFormat,
    sequence: u64,
) -> Option<FrameBuffer> {
    let resolution = buffer.resolution();
    let nv12_requested = matches!(
        requested,
        PixelFormat::Nv12FullRange | PixelFormat::Nv12VideoRange
    );

    let (data, format) =
        if nv12_requested && buffer.source_frame_format() == NokhwaFrameFormat::NV12 {
            (buffer.buffer().to_vec(), requested)
        } else {
            let decoded = buffer.decode_image::<RgbFormat>().ok()?;
            (decoded.into_raw(), PixelFormat::Rgb)
        };

    Some(FrameBuffer {
        data,
        width: resolution.width(),
        height: resolution.height(),
        format,
        timestamp: Instant::now(),
        sequence,
        orientation: ImageOrientation::Up,
    })
}

impl CaptureBackend for NokhwaBackend {
    fn name(&self) -> &'static str {
        "nokhwa"
    }

    fn devices(&self) -> Result<Vec<VideoDevice>, CameraError> {
        let devices =
            query(ApiBackend::Auto).map_err(|e| CameraError::QueryFailed(e.to_string()))?;

        Ok(devices
            .into_iter()
            .map(|d| VideoDevice {
                id: d.index().to_string(),
                name: d.human_name(),
                position: self.position,
                device_type: self.device_type,
                formats: Vec::new(),
            })
            .collect())
    }

    /// Opens the camera briefly to learn which format it settles on.
    fn read_active_format(
        &self,
        device: &VideoDevice,
        preset: SessionPreset,
    ) -> Result<VideoFormat, CameraError> {
        let requested = VideoFormat {
            resolution: preset.resolution(),
            pixel_format: PixelFormat::Nv12FullRange,
            fps: 30,
        };
        let camera = open_camera_with_fallback(&camera_index(device), &requested).map_err(|e| {
            CameraError::DeviceLockFailure {
                device: device.name.clone(),
                reason: e.to_string(),
            }
        })?;

        let format = camera.camera_format();
        Ok(VideoFormat {
            resolution: Resolution::new(format.resolution().width(), format.resolution().height()),
            pixel_format: if format.format() == NokhwaFrameFormat::NV12 {
                PixelFormat::Nv12FullRange
            } else {
                PixelFormat::Rgb
            },
            fps: format.frame_rate(),
        })
    }

    fn start_stream(&mut self, request: StreamRequest, sink: FrameSink) -> Result<(), CameraError> {
        if self.stream.is_some() {
            return Ok(());
        }

        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), CameraError>>();

        // The camera is opened inside the thread; nokhwa cameras are not Send on every platform.
        let thread = thread::Builder::new()
            .name(format!("nokhwa-{}", request.device.id))
            .spawn(move || {
                let index = camera_index(&request.device);
                let mut camera = match open_camera_with_fallback(&index, &request.format) {
                    Ok(camera) => camera,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                if let Err(e) = camera.open_stream() {
                    let _ = ready_tx.send(Err(CameraError::StreamFailed(e.to_string())));
                    return;
                }
                let _ = ready_tx.send(Ok(()));

                let mut sequence = 0u64;
                while !thread_stop.load(Ordering::Relaxed) {
                    if let Ok(raw) = camera.frame() {
                        // Frames that fail to decode are skipped
                        if let Some(frame) = to_frame_buffer(&raw, request.pixel_format, sequence) {
                            if sink.deliver(frame) == Delivery::Closed {
                                break;
                            }
                            sequence += 1;
                        }
                    } else {
                        thread::sleep(Duration::from_millis(1));
                    }
                }

                let _ = camera.stop_stream();
            })
            .map_err(|e| CameraError::StreamFailed(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.stream = Some(StreamHandle { stop, thread });
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(CameraError::StreamFailed(
                    "Capture thread terminated unexpectedly".to_string(),
                ))
            }
        }
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

impl Drop for NokhwaBackend {
    fn drop(&mut self) {
        self.stop_stream();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nokhwa::utils::Resolution as NokhwaResolution;
    use nokhwa::Buffer;

    #[test]
    fn test_nv12_passes_through() {
        let bytes = [10u8, 20, 30, 40, 128, 128];
        let raw = Buffer::new(NokhwaResolution::new(2, 2), &bytes, NokhwaFrameFormat::NV12);

        let frame = to_frame_buffer(&raw, PixelFormat::Nv12FullRange, 4).unwrap();
        assert_eq!(frame.data, bytes.to_vec());
        assert_eq!(frame.format, PixelFormat::Nv12FullRange);
        assert_eq!(frame.resolution(), Resolution::new(2, 2));
        assert_eq!(frame.sequence, 4);
    }

    #[test]
    fn test_yuyv_decodes_to_rgb() {
        // Two grey pixels sharing neutral chroma
        let bytes = [128u8, 128, 128, 128];
        let raw = Buffer::new(NokhwaResolution::new(2, 1), &bytes, NokhwaFrameFormat::YUYV);

        let frame = to_frame_buffer(&raw, PixelFormat::Nv12FullRange, 0).unwrap();
        assert_eq!(frame.format, PixelFormat::Rgb);
        assert_eq!(frame.data.len(), PixelFormat::Rgb.frame_len(Resolution::new(2, 1)));
        assert_eq!(frame.data[..3], frame.data[3..]);
    }

    #[test]
    fn test_camera_index_from_device_id() {
        let mut device = VideoDevice {
            id: "2".to_string(),
            name: "cam".to_string(),
            position: DevicePosition::Back,
            device_type: DeviceType::WideAngle,
            formats: Vec::new(),
        };
        assert_eq!(camera_index(&device), CameraIndex::Index(2));
        device.id = "/dev/video0".to_string();
        assert_eq!(camera_index(&device), CameraIndex::String("/dev/video0".to_string()));
    }

    #[test]
    fn test_permission_errors_are_recognized() {
        let err = map_open_error(nokhwa::NokhwaError::OpenDeviceError(
            "0".to_string(),
            "Permission denied".to_string(),
        ));
        assert!(matches!(err, CameraError::PermissionDenied));

        let err = map_open_error(nokhwa::NokhwaError::OpenDeviceError(
            "0".to_string(),
            "busy".to_string(),
        ));
        assert!(matches!(err, CameraError::StreamFailed(_)));
    }

    #[test]
    fn test_reports_assumed_position() {
        let backend = NokhwaBackend::assuming(DevicePosition::Front, DeviceType::External);
        match backend.devices() {
            Ok(devices) => {
                for device in devices {
                    assert_eq!(device.position, DevicePosition::Front);
                    assert_eq!(device.device_type, DeviceType::External);
                }
            }
            Err(e) => println!("SKIP: Camera query unavailable: {}", e),
        }
    }
}
