//! CLI argument parsing with clap.

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use super::enums::{LateFrames, Preset};

/// Camera acquisition front end for on-device smoking detection
#[derive(Parser, Debug)]
#[command(name = "smoking-detection")]
#[command(version, about = "Camera frame acquisition for smoking detection", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Config file path
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List available cameras
    ListCameras {
        /// Use the synthetic test-pattern backend
        #[arg(long)]
        synthetic: bool,
    },
    /// Capture frames and report delivery statistics
    Run(RunArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(ClapArgs, Debug, Clone, PartialEq, Eq)]
pub struct RunArgs {
    /// Use the synthetic test-pattern backend
    #[arg(long)]
    pub synthetic: bool,

    /// Stop after this many seconds (default: run until Ctrl+C)
    #[arg(long)]
    pub seconds: Option<u64>,

    /// Override the capture preset
    #[arg(long)]
    pub preset: Option<Preset>,

    /// Override the late-frame policy
    #[arg(long)]
    pub late_frames: Option<LateFrames>,

    /// Log frame statistics every N frames (0 disables)
    #[arg(long, default_value = "30")]
    pub log_every: u64,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Create default config file
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_defaults() {
        let args = Args::parse_from(["smoking-detection", "run"]);
        match args.command {
            Command::Run(run) => {
                assert!(!run.synthetic);
                assert!(run.seconds.is_none());
                assert!(run.preset.is_none());
                assert!(run.late_frames.is_none());
                assert_eq!(run.log_every, 30);
            }
            other => panic!("Expected Run, got {:?}", other),
        }
        assert!(args.config.is_none());
        assert!(args.log_level.is_none());
    }

    #[test]
    fn test_run_overrides() {
        let args = Args::parse_from([
            "smoking-detection",
            "run",
            "--synthetic",
            "--seconds",
            "5",
            "--preset",
            "full-hd",
            "--late-frames",
            "drop-newest",
        ]);
        let Command::Run(run) = args.command else {
            panic!("Expected Run");
        };
        assert!(run.synthetic);
        assert_eq!(run.seconds, Some(5));
        assert_eq!(run.preset, Some(Preset::FullHd));
        assert_eq!(run.late_frames, Some(LateFrames::DropNewest));
    }

    #[test]
    fn test_global_config_flag() {
        let args = Args::parse_from(["smoking-detection", "list-cameras", "--config", "x.toml"]);
        assert_eq!(args.config, Some(PathBuf::from("x.toml")));
        assert!(matches!(
            args.command,
            Command::ListCameras { synthetic: false }
        ));
    }

    #[test]
    fn test_config_subcommands() {
        let args = Args::parse_from(["smoking-detection", "config", "init"]);
        assert!(matches!(
            args.command,
            Command::Config {
                action: ConfigAction::Init
            }
        ));
    }

    #[test]
    fn test_invalid_preset_rejected() {
        let result = Args::try_parse_from(["smoking-detection", "run", "--preset", "8k"]);
        assert!(result.is_err());
    }
}
