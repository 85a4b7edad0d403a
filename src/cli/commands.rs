//! Subcommand handlers for list-cameras, run, and config actions.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use super::args::{ConfigAction, RunArgs};
use crate::camera::{
    self, AcquisitionController, CaptureBackend, CaptureSettings, DeviceOrientation, FrameStats,
    SharedOrientation, SyntheticBackend,
};
use crate::config::{default_path, Config};

/// Global flag for handling Ctrl+C across the application
static CTRLC_RECEIVED: AtomicBool = AtomicBool::new(false);

fn ctrlc_received() -> bool {
    CTRLC_RECEIVED.load(Ordering::SeqCst)
}

/// Set up the Ctrl+C handler.
///
/// This should be called once at program startup.
pub fn setup_ctrlc_handler() -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        CTRLC_RECEIVED.store(true, Ordering::SeqCst);
        eprintln!("\nReceived Ctrl+C, shutting down...");
    })
}

/// Pick the capture backend.
fn make_backend(
    synthetic: bool,
    settings: &CaptureSettings,
) -> Result<Box<dyn CaptureBackend>, String> {
    if synthetic {
        Ok(Box::new(SyntheticBackend::new()))
    } else {
        native_backend(settings)
    }
}

#[cfg(feature = "nokhwa-backend")]
fn native_backend(settings: &CaptureSettings) -> Result<Box<dyn CaptureBackend>, String> {
    let device_type = settings.device_types.first().copied().unwrap_or_default();
    Ok(Box::new(camera::NokhwaBackend::assuming(
        settings.position,
        device_type,
    )))
}

#[cfg(not(feature = "nokhwa-backend"))]
fn native_backend(_settings: &CaptureSettings) -> Result<Box<dyn CaptureBackend>, String> {
    Err("Built without camera support (enable the `nokhwa-backend` feature); use --synthetic"
        .to_string())
}

/// List available cameras and print them to stdout.
pub fn list_cameras(synthetic: bool, settings: &CaptureSettings) -> Result<(), String> {
    let backend = make_backend(synthetic, settings)?;
    let devices = camera::list_devices(backend.as_ref()).map_err(|e| e.to_string())?;

    if devices.is_empty() {
        println!("No cameras found.");
        println!();
        println!("Make sure your camera is connected and camera permission is granted.");
    } else {
        println!("Available cameras ({}):", backend.name());
        for device in devices {
            println!("  {}", device);
        }
    }
    Ok(())
}

/// Configure the camera, deliver frames to a statistics processor, and
/// print a summary when stopped.
pub fn run_capture(args: &RunArgs, config: &Config) -> Result<(), String> {
    let mut settings = config.capture_settings();
    if let Some(preset) = args.preset {
        settings.preset = preset.into();
    }
    if let Some(late) = args.late_frames {
        settings.late_frames = late.into();
    }

    let backend = make_backend(args.synthetic, &settings)?;
    let orientation = SharedOrientation::new(DeviceOrientation::Portrait);
    let mut controller = AcquisitionController::new(
        backend,
        settings,
        FrameStats::new(args.log_every),
        Arc::new(orientation),
    )
    .map_err(|e| e.to_string())?
    .with_gravity(config.preview.gravity);

    controller.configure().map_err(|e| e.to_string())?;
    controller
        .start_capture_session()
        .map_err(|e| e.to_string())?;

    println!(
        "Capturing from {} at {} (Ctrl+C to stop)",
        controller.device().map_or("<unknown>", |d| d.name.as_str()),
        controller.buffer_size()
    );

    let deadline = args
        .seconds
        .map(|s| Instant::now() + Duration::from_secs(s));
    while !ctrlc_received() && deadline.map_or(true, |d| Instant::now() < d) {
        if !controller.is_streaming() {
            log::error!("Capture stream ended unexpectedly");
            break;
        }
        thread::sleep(Duration::from_millis(100));
    }

    controller.stop_capture_session();
    controller.teardown_acquisition();
    let delivery = controller.delivery_stats();
    let stats = controller
        .into_processor()
        .ok_or_else(|| "Frame processor did not shut down cleanly".to_string())?;
    let orientation = stats.last_orientation();

    println!();
    println!("Frames processed: {}", stats.frames());
    println!("Frames dropped:   {}", delivery.dropped);
    println!("Last frame:       {}", stats.last_resolution());
    println!(
        "Orientation:      {:?} (EXIF {})",
        orientation,
        orientation.exif_value()
    );
    println!("Effective rate:   {:.1} fps", stats.fps());
    Ok(())
}

/// Handle config subcommand actions.
pub fn handle_config_action(
    action: ConfigAction,
    config: &Config,
    path: Option<&Path>,
) -> Result<(), String> {
    let config_path = path.map(Path::to_path_buf).unwrap_or_else(default_path);

    match action {
        ConfigAction::Show => {
            println!("Current configuration:");
            println!();
            print!("{}", config.to_toml().map_err(|e| e.to_string())?);
            println!();
            if config_path.exists() {
                println!("Config file: {} (exists)", config_path.display());
            } else {
                println!("Config file: {} (not found)", config_path.display());
            }
            Ok(())
        }
        ConfigAction::Init => {
            if config_path.exists() {
                return Err(format!(
                    "Config file already exists: {}\nUse 'smoking-detection config show' to view current settings.",
                    config_path.display()
                ));
            }

            // Create parent directories if needed
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| format!("Error creating config directory: {}", e))?;
            }

            let body = Config::default().to_toml().map_err(|e| e.to_string())?;
            let contents = format!("# smoking-detection configuration\n\n{}", body);
            std::fs::write(&config_path, contents)
                .map_err(|e| format!("Error writing config file: {}", e))?;

            println!("Created config file: {}", config_path.display());
            Ok(())
        }
    }
}
