//! Preview surface geometry.
//!
//! The surface mirrors the live feed inside its owning view. It is created when
//! the session is configured, resized on layout changes, and detached on teardown.
//! It lives on the caller's context and is never touched by frame delivery.

use serde::{Deserialize, Serialize};

use super::types::Resolution;

/// Axis-aligned rectangle in view points.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// How the video fills the preview bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VideoGravity {
    /// Preserve aspect ratio, fill the bounds, crop overflow
    #[default]
    ResizeAspectFill,
    /// Preserve aspect ratio, fit inside the bounds
    ResizeAspect,
    /// Stretch to the bounds
    Resize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreviewSurface {
    frame: Rect,
    gravity: VideoGravity,
    attached: bool,
}

impl PreviewSurface {
    /// Create a surface attached to its view and sized to `bounds`.
    pub fn new(bounds: Rect, gravity: VideoGravity) -> Self {
        Self {
            frame: bounds,
            gravity,
            attached: true,
        }
    }

    pub fn frame(&self) -> Rect {
        self.frame
    }

    pub fn set_frame(&mut self, bounds: Rect) {
        self.frame = bounds;
    }

    pub fn gravity(&self) -> VideoGravity {
        self.gravity
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Remove from the owning view.
    pub fn detach(&mut self) {
        self.attached = false;
    }

    /// Where a buffer of `buffer` size is drawn in view coordinates.
    ///
    /// Zero-sized buffers (dimensions unknown) map onto the whole frame.
    pub fn content_rect(&self, buffer: Resolution) -> Rect {
        let frame = self.frame;
        if buffer.is_zero() || frame.is_empty() {
            return frame;
        }

        let sx = frame.width / f64::from(buffer.width);
        let sy = frame.height / f64::from(buffer.height);
        let scale = match self.gravity {
            VideoGravity::Resize => return frame,
            VideoGravity::ResizeAspectFill => sx.max(sy),
            VideoGravity::ResizeAspect => sx.min(sy),
        };

        let width = f64::from(buffer.width) * scale;
        let height = f64::from(buffer.height) * scale;
        Rect::new(
            frame.x + (frame.width - width) / 2.0,
            frame.y + (frame.height - height) / 2.0,
            width,
            height,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PORTRAIT: Rect = Rect::new(0.0, 0.0, 390.0, 844.0);

    #[test]
    fn test_aspect_fill_covers_bounds() {
        let surface = PreviewSurface::new(PORTRAIT, VideoGravity::ResizeAspectFill);
        let rect = surface.content_rect(Resolution::VGA);
        assert!(rect.width >= PORTRAIT.width);
        assert!((rect.height - PORTRAIT.height).abs() < 1e-9);
        // Centered horizontally
        assert!((rect.x + rect.width / 2.0 - PORTRAIT.width / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_aspect_fit_inside_bounds() {
        let surface = PreviewSurface::new(PORTRAIT, VideoGravity::ResizeAspect);
        let rect = surface.content_rect(Resolution::VGA);
        assert!((rect.width - PORTRAIT.width).abs() < 1e-9);
        assert!(rect.height <= PORTRAIT.height);
        assert!((rect.width / rect.height - 640.0 / 480.0).abs() < 1e-9);
    }

    #[test]
    fn test_resize_stretches() {
        let surface = PreviewSurface::new(PORTRAIT, VideoGravity::Resize);
        assert_eq!(surface.content_rect(Resolution::VGA), PORTRAIT);
    }

    #[test]
    fn test_zero_buffer_maps_to_frame() {
        let surface = PreviewSurface::new(PORTRAIT, VideoGravity::ResizeAspectFill);
        assert_eq!(surface.content_rect(Resolution::ZERO), PORTRAIT);
    }

    #[test]
    fn test_detach_and_resize() {
        let mut surface = PreviewSurface::new(Rect::default(), VideoGravity::default());
        assert!(surface.is_attached());
        surface.set_frame(PORTRAIT);
        assert_eq!(surface.frame(), PORTRAIT);
        surface.detach();
        assert!(!surface.is_attached());
    }
}
