//! CLI enum types for preset and late-frame options.

use clap::ValueEnum;

use crate::camera::{LateFramePolicy, SessionPreset};

/// Capture resolution preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Preset {
    Low,
    #[default]
    Vga,
    Hd,
    FullHd,
}

impl From<Preset> for SessionPreset {
    fn from(p: Preset) -> Self {
        match p {
            Preset::Low => SessionPreset::Low,
            Preset::Vga => SessionPreset::Vga640x480,
            Preset::Hd => SessionPreset::Hd1280x720,
            Preset::FullHd => SessionPreset::Hd1920x1080,
        }
    }
}

/// What to drop when the processor falls behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LateFrames {
    #[default]
    DropOldest,
    DropNewest,
}

impl From<LateFrames> for LateFramePolicy {
    fn from(l: LateFrames) -> Self {
        match l {
            LateFrames::DropOldest => LateFramePolicy::DropOldest,
            LateFrames::DropNewest => LateFramePolicy::DropNewest,
        }
    }
}
