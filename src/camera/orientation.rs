//! Device orientation tracking and EXIF orientation mapping.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Physical orientation of the device as reported by the motion sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceOrientation {
    #[default]
    Unknown,
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
    FaceUp,
    FaceDown,
}

impl DeviceOrientation {
    pub const ALL: [DeviceOrientation; 7] = [
        DeviceOrientation::Unknown,
        DeviceOrientation::Portrait,
        DeviceOrientation::PortraitUpsideDown,
        DeviceOrientation::LandscapeLeft,
        DeviceOrientation::LandscapeRight,
        DeviceOrientation::FaceUp,
        DeviceOrientation::FaceDown,
    ];

    fn to_raw(self) -> u8 {
        match self {
            DeviceOrientation::Unknown => 0,
            DeviceOrientation::Portrait => 1,
            DeviceOrientation::PortraitUpsideDown => 2,
            DeviceOrientation::LandscapeLeft => 3,
            DeviceOrientation::LandscapeRight => 4,
            DeviceOrientation::FaceUp => 5,
            DeviceOrientation::FaceDown => 6,
        }
    }

    fn from_raw(raw: u8) -> Self {
        match raw {
            1 => DeviceOrientation::Portrait,
            2 => DeviceOrientation::PortraitUpsideDown,
            3 => DeviceOrientation::LandscapeLeft,
            4 => DeviceOrientation::LandscapeRight,
            5 => DeviceOrientation::FaceUp,
            6 => DeviceOrientation::FaceDown,
            _ => DeviceOrientation::Unknown,
        }
    }
}

/// EXIF orientation tag describing how pixel data maps onto an upright image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageOrientation {
    #[default]
    Up,
    UpMirrored,
    Down,
    DownMirrored,
    LeftMirrored,
    Right,
    RightMirrored,
    Left,
}

impl ImageOrientation {
    /// Numeric value of the EXIF `Orientation` tag (1-8).
    pub fn exif_value(self) -> u8 {
        match self {
            ImageOrientation::Up => 1,
            ImageOrientation::UpMirrored => 2,
            ImageOrientation::Down => 3,
            ImageOrientation::DownMirrored => 4,
            ImageOrientation::LeftMirrored => 5,
            ImageOrientation::Right => 6,
            ImageOrientation::RightMirrored => 7,
            ImageOrientation::Left => 8,
        }
    }
}

/// Map the physical device orientation to the orientation of back-camera pixels.
///
/// Face-up, face-down and unknown carry no rotation information and fall back to `Up`.
pub fn exif_orientation(device: DeviceOrientation) -> ImageOrientation {
    match device {
        DeviceOrientation::PortraitUpsideDown => ImageOrientation::Left,
        DeviceOrientation::LandscapeLeft => ImageOrientation::UpMirrored,
        DeviceOrientation::LandscapeRight => ImageOrientation::Down,
        DeviceOrientation::Portrait => ImageOrientation::Up,
        _ => ImageOrientation::Up,
    }
}

/// Source of the current device orientation.
pub trait OrientationSource: Send + Sync {
    fn current(&self) -> DeviceOrientation;
}

/// Orientation cell shared between the UI context (writer) and the delivery context (reader).
#[derive(Debug, Clone, Default)]
pub struct SharedOrientation {
    raw: Arc<AtomicU8>,
}

impl SharedOrientation {
    pub fn new(initial: DeviceOrientation) -> Self {
        Self {
            raw: Arc::new(AtomicU8::new(initial.to_raw())),
        }
    }

    /// Record a new orientation, typically from a sensor callback.
    pub fn set(&self, orientation: DeviceOrientation) {
        self.raw.store(orientation.to_raw(), Ordering::Relaxed);
    }
}

impl OrientationSource for SharedOrientation {
    fn current(&self) -> DeviceOrientation {
        DeviceOrientation::from_raw(self.raw.load(Ordering::Relaxed))
    }
}
