//! smoking-detection library crate.
//!
//! Camera frame acquisition for an on-device smoking detector: a capture
//! session feeding every frame to a [`camera::FrameProcessor`] on a dedicated
//! serial delivery context.

pub mod camera;
pub mod cli;
pub mod config;
pub mod logger;
