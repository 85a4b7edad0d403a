//! Camera acquisition: device discovery, session configuration, and serial
//! frame delivery to a processing hook.
//!
//! - Device discovery via [`DiscoveryQuery`] and [`list_devices`]
//! - Session lifecycle via [`AcquisitionController`]
//! - Per-frame processing via the [`FrameProcessor`] hook
//! - Backends: [`SyntheticBackend`], and `NokhwaBackend` with the `nokhwa-backend` feature

mod backend;
mod controller;
mod delivery;
mod device;
mod frame_utils;
#[cfg(feature = "nokhwa-backend")]
mod nokhwa_backend;
mod orientation;
mod output;
mod preview;
mod processor;
mod session;
mod synthetic;
mod types;

pub use backend::{format_for_preset, CaptureBackend, StreamRequest};
pub use controller::{AcquisitionController, ControllerState};
pub use delivery::{Delivery, DeliveryStats, FrameSink, SerialQueue};
pub use device::{list_devices, DeviceInput, DiscoveryQuery};
pub use frame_utils::test_pattern;
#[cfg(feature = "nokhwa-backend")]
pub use nokhwa_backend::NokhwaBackend;
pub use orientation::{
    exif_orientation, DeviceOrientation, ImageOrientation, OrientationSource, SharedOrientation,
};
pub use output::{OutputSettings, VideoDataOutput};
pub use preview::{PreviewSurface, Rect, VideoGravity};
pub use processor::{from_fn, FnProcessor, FrameProcessor, FrameStats, NoopProcessor};
pub use session::{CaptureSession, SessionState, SessionTransaction};
pub use synthetic::{Faults, SyntheticBackend};
pub use types::{
    CameraError, CaptureSettings, DevicePosition, DeviceType, FrameBuffer, LateFramePolicy,
    PixelFormat, Resolution, SessionPreset, VideoDevice, VideoFormat,
};
