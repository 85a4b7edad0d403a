//! Per-frame processing hook and the stock processors.

use std::time::Instant;

use super::orientation::ImageOrientation;
use super::types::{FrameBuffer, Resolution};

/// Consumer of delivered frames.
///
/// Called on the serial delivery context, one frame at a time. The frame is
/// only borrowed for the duration of the call.
pub trait FrameProcessor: Send + 'static {
    fn on_frame_delivered(&mut self, frame: &FrameBuffer, orientation: ImageOrientation) {
        let _ = (frame, orientation);
    }
}

/// Processor that ignores every frame.
#[derive(Debug, Default)]
pub struct NoopProcessor;

impl FrameProcessor for NoopProcessor {}

/// Adapter turning a closure into a [`FrameProcessor`].
pub struct FnProcessor<F>(F);

/// Wrap a closure as a frame processor.
pub fn from_fn<F>(f: F) -> FnProcessor<F>
where
    F: FnMut(&FrameBuffer, ImageOrientation) + Send + 'static,
{
    FnProcessor(f)
}

impl<F> FrameProcessor for FnProcessor<F>
where
    F: FnMut(&FrameBuffer, ImageOrientation) + Send + 'static,
{
    fn on_frame_delivered(&mut self, frame: &FrameBuffer, orientation: ImageOrientation) {
        (self.0)(frame, orientation)
    }
}

/// Counts frames and periodically logs the effective frame rate.
#[derive(Debug)]
pub struct FrameStats {
    frames: u64,
    first_at: Option<Instant>,
    last_at: Option<Instant>,
    last_resolution: Resolution,
    last_orientation: ImageOrientation,
    log_every: u64,
}

impl FrameStats {
    /// `log_every` of 0 disables periodic logging.
    pub fn new(log_every: u64) -> Self {
        Self {
            frames: 0,
            first_at: None,
            last_at: None,
            last_resolution: Resolution::ZERO,
            last_orientation: ImageOrientation::Up,
            log_every,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn last_resolution(&self) -> Resolution {
        self.last_resolution
    }

    pub fn last_orientation(&self) -> ImageOrientation {
        self.last_orientation
    }

    /// Average rate between the first and the last processed frame.
    pub fn fps(&self) -> f64 {
        match (self.first_at, self.last_at) {
            (Some(first), Some(last)) if self.frames > 1 => {
                let elapsed = last.duration_since(first).as_secs_f64();
                if elapsed > 0.0 {
                    (self.frames - 1) as f64 / elapsed
                } else {
                    0.0
                }
            }
            _ => 0.0,
        }
    }
}

impl FrameProcessor for FrameStats {
    fn on_frame_delivered(&mut self, frame: &FrameBuffer, orientation: ImageOrientation) {
        let now = Instant::now();
        self.first_at.get_or_insert(now);
        self.last_at = Some(now);
        self.frames += 1;
        self.last_resolution = frame.resolution();
        self.last_orientation = orientation;

        if self.log_every > 0 && self.frames % self.log_every == 0 {
            log::info!(
                "Processed {} frames ({} {}, EXIF orientation {}, {:.1} fps)",
                self.frames,
                self.last_resolution,
                frame.format,
                orientation.exif_value(),
                self.fps()
            );
        }
    }
}
