//! Configuration file handling for smoking-detection.
//!
//! Loads configuration from `<config dir>/smoking-detection/config.toml` or a custom path.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::camera::{
    CaptureSettings, DevicePosition, DeviceType, LateFramePolicy, PixelFormat, SessionPreset,
    VideoGravity,
};

/// Configuration file structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    #[serde(default)]
    pub position: DevicePosition,
    #[serde(default = "default_device_types")]
    pub device_types: Vec<DeviceType>,
    #[serde(default)]
    pub preset: SessionPreset,
    #[serde(default)]
    pub pixel_format: PixelFormat,
    #[serde(default)]
    pub late_frames: LateFramePolicy,
    #[serde(default = "default_fps")]
    pub fps: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: DevicePosition::default(),
            device_types: default_device_types(),
            preset: SessionPreset::default(),
            pixel_format: PixelFormat::default(),
            late_frames: LateFramePolicy::default(),
            fps: default_fps(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryConfig {
    #[serde(default = "default_queue_label")]
    pub label: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            label: default_queue_label(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PreviewConfig {
    #[serde(default)]
    pub gravity: VideoGravity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_device_types() -> Vec<DeviceType> {
    vec![DeviceType::WideAngle]
}

fn default_fps() -> u32 {
    30
}

fn default_queue_label() -> String {
    CaptureSettings::default().queue_label
}

fn default_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io {
                path: path.clone(),
                source: e,
            })?;
            let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.clone(),
                source: e,
            })?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Settings for the acquisition controller.
    pub fn capture_settings(&self) -> CaptureSettings {
        CaptureSettings {
            position: self.camera.position,
            device_types: self.camera.device_types.clone(),
            preset: self.camera.preset,
            pixel_format: self.camera.pixel_format,
            late_frames: self.camera.late_frames,
            fps: self.camera.fps,
            queue_label: self.delivery.label.clone(),
        }
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("smoking-detection").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/smoking-detection/config.toml")
        })
}
