//! Video data output: the session's frame delivery point.

use super::delivery::FrameSink;
use super::types::{LateFramePolicy, PixelFormat};

/// How the output hands frames to its delegate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSettings {
    pub pixel_format: PixelFormat,
    pub late_frames: LateFramePolicy,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            pixel_format: PixelFormat::Nv12FullRange,
            late_frames: LateFramePolicy::DropOldest,
        }
    }
}

/// Output sink attached to a capture session.
#[derive(Debug)]
pub struct VideoDataOutput {
    settings: OutputSettings,
    delegate: Option<FrameSink>,
    enabled: bool,
}

impl VideoDataOutput {
    pub fn new(settings: OutputSettings) -> Self {
        Self {
            settings,
            delegate: None,
            enabled: true,
        }
    }

    pub fn settings(&self) -> &OutputSettings {
        &self.settings
    }

    /// Route delivered frames into `sink`, replacing any previous delegate.
    pub fn set_delegate(&mut self, sink: FrameSink) {
        self.delegate = Some(sink);
    }

    pub fn delegate(&self) -> Option<&FrameSink> {
        self.delegate.as_ref()
    }

    /// Drop the delegate so the delivery context can wind down.
    pub fn clear_delegate(&mut self) {
        self.delegate = None;
    }

    /// Disabled outputs keep their wiring but refuse to start streaming.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for VideoDataOutput {
    fn default() -> Self {
        Self::new(OutputSettings::default())
    }
}
