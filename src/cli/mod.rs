//! Command-line interface definitions and helpers.
//!
//! This module contains CLI argument parsing, enums, and subcommand handlers.

mod args;
mod commands;
mod enums;

pub use args::{Args, Command, ConfigAction, RunArgs};
pub use commands::{handle_config_action, list_cameras, run_capture, setup_ctrlc_handler};
pub use enums::{LateFrames, Preset};
