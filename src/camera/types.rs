//! Camera types and data structures.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

use super::orientation::ImageOrientation;

/// Physical placement of a camera on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DevicePosition {
    Front,
    #[default]
    Back,
    /// Position not reported by the platform (desktop webcams)
    Unspecified,
}

impl fmt::Display for DevicePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DevicePosition::Front => write!(f, "front"),
            DevicePosition::Back => write!(f, "back"),
            DevicePosition::Unspecified => write!(f, "unspecified"),
        }
    }
}

/// Kind of camera module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceType {
    #[default]
    WideAngle,
    UltraWide,
    Telephoto,
    External,
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceType::WideAngle => write!(f, "wide-angle"),
            DeviceType::UltraWide => write!(f, "ultra-wide"),
            DeviceType::Telephoto => write!(f, "telephoto"),
            DeviceType::External => write!(f, "external"),
        }
    }
}

/// Frame dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// Placeholder for dimensions that could not be read
    pub const ZERO: Resolution = Resolution {
        width: 0,
        height: 0,
    };

    /// Low resolution (320x240)
    pub const LOW: Resolution = Resolution {
        width: 320,
        height: 240,
    };

    /// VGA (640x480) - keeps per-frame processing cheap
    pub const VGA: Resolution = Resolution {
        width: 640,
        height: 480,
    };

    /// 720p
    pub const HD: Resolution = Resolution {
        width: 1280,
        height: 720,
    };

    /// 1080p
    pub const FULL_HD: Resolution = Resolution {
        width: 1920,
        height: 1080,
    };

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_zero(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Resolution preset requested from the capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionPreset {
    Low,
    #[default]
    Vga640x480,
    Hd1280x720,
    Hd1920x1080,
}

impl SessionPreset {
    pub fn resolution(self) -> Resolution {
        match self {
            SessionPreset::Low => Resolution::LOW,
            SessionPreset::Vga640x480 => Resolution::VGA,
            SessionPreset::Hd1280x720 => Resolution::HD,
            SessionPreset::Hd1920x1080 => Resolution::FULL_HD,
        }
    }
}

/// Pixel layout of a frame buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PixelFormat {
    /// 4:2:0 bi-planar YCbCr, full range. Native sensor layout, no conversion cost.
    #[default]
    Nv12FullRange,
    /// 4:2:0 bi-planar YCbCr, video range
    Nv12VideoRange,
    /// Packed BGRA, 4 bytes per pixel
    Bgra,
    /// Packed RGB, 3 bytes per pixel
    Rgb,
}

impl PixelFormat {
    /// Bytes per pixel for packed formats, `None` for planar ones.
    pub fn bytes_per_pixel(self) -> Option<usize> {
        match self {
            PixelFormat::Nv12FullRange | PixelFormat::Nv12VideoRange => None,
            PixelFormat::Bgra => Some(4),
            PixelFormat::Rgb => Some(3),
        }
    }

    /// Total buffer length for a frame of the given size.
    pub fn frame_len(self, resolution: Resolution) -> usize {
        match self.bytes_per_pixel() {
            Some(bpp) => resolution.pixel_count() * bpp,
            None => {
                let chroma_w = (resolution.width as usize).div_ceil(2);
                let chroma_h = (resolution.height as usize).div_ceil(2);
                resolution.pixel_count() + 2 * chroma_w * chroma_h
            }
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PixelFormat::Nv12FullRange => write!(f, "nv12-full-range"),
            PixelFormat::Nv12VideoRange => write!(f, "nv12-video-range"),
            PixelFormat::Bgra => write!(f, "bgra"),
            PixelFormat::Rgb => write!(f, "rgb"),
        }
    }
}

/// One capture format a device supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoFormat {
    pub resolution: Resolution,
    pub pixel_format: PixelFormat,
    pub fps: u32,
}

impl fmt::Display for VideoFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} @ {}fps", self.resolution, self.pixel_format, self.fps)
    }
}

/// A physical camera as reported by a capture backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoDevice {
    /// Backend-specific identifier
    pub id: String,
    /// Human-readable device name
    pub name: String,
    pub position: DevicePosition,
    pub device_type: DeviceType,
    /// Formats the device can deliver
    pub formats: Vec<VideoFormat>,
}

impl fmt::Display for VideoDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({}, {})",
            self.id, self.name, self.position, self.device_type
        )
    }
}

/// What to do with a frame that arrives while one is already waiting for the hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LateFramePolicy {
    /// Replace the waiting frame with the newer one
    #[default]
    DropOldest,
    /// Keep the waiting frame, discard the arriving one
    DropNewest,
}

/// A captured camera frame.
///
/// Frames are owned by the delivery context and lent to the processing hook;
/// a hook that needs a frame past its return must call [`FrameBuffer::to_owned_copy`].
#[derive(Debug)]
pub struct FrameBuffer {
    /// Raw pixel data laid out per `format`
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// Timestamp when the frame was captured
    pub timestamp: Instant,
    /// Monotonic per-stream frame counter
    pub sequence: u64,
    /// Orientation tag stamped at delivery time
    pub orientation: ImageOrientation,
}

impl FrameBuffer {
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    /// Explicit deep copy for hooks that keep frames around.
    pub fn to_owned_copy(&self) -> FrameBuffer {
        FrameBuffer {
            data: self.data.clone(),
            width: self.width,
            height: self.height,
            format: self.format,
            timestamp: self.timestamp,
            sequence: self.sequence,
            orientation: self.orientation,
        }
    }

}

/// Everything the acquisition controller needs to set up a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSettings {
    /// Which side of the device to capture from
    pub position: DevicePosition,
    /// Acceptable device types, in order of preference
    pub device_types: Vec<DeviceType>,
    pub preset: SessionPreset,
    pub pixel_format: PixelFormat,
    pub late_frames: LateFramePolicy,
    /// Target FPS (actual may vary)
    pub fps: u32,
    /// Thread name of the serial delivery context
    pub queue_label: String,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            position: DevicePosition::Back,
            device_types: vec![DeviceType::WideAngle],
            preset: SessionPreset::Vga640x480,
            pixel_format: PixelFormat::Nv12FullRange,
            late_frames: LateFramePolicy::DropOldest,
            fps: 30,
            queue_label: "smoking-detection.video-data-output".to_string(),
        }
    }
}

/// Errors that can occur during camera operations.
#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    /// No device matched the discovery query
    #[error("No {device_type} camera found at the {position} of the device")]
    DeviceUnavailable {
        position: DevicePosition,
        device_type: DeviceType,
    },
    /// The session refused the device input
    #[error("Could not add video device input to the session: {0}")]
    InputRejected(String),
    /// The session refused the video data output
    #[error("Could not add video data output to the session: {0}")]
    OutputRejected(String),
    /// The device configuration lock could not be taken
    #[error("Could not lock '{device}' for configuration: {reason}")]
    DeviceLockFailure { device: String, reason: String },
    /// Camera permission denied (macOS/iOS)
    #[error("Camera permission denied. Grant camera access in the system privacy settings")]
    PermissionDenied,
    /// Failed to query camera devices
    #[error("Failed to query cameras: {0}")]
    QueryFailed(String),
    /// Failed to start video stream
    #[error("Failed to start camera stream: {0}")]
    StreamFailed(String),
    /// Start requested before configuration completed
    #[error("Capture session is not configured")]
    NotConfigured,
}
