use clap::Parser;

use smoking_detection::cli::{self, Args, Command};
use smoking_detection::config::Config;
use smoking_detection::logger;

fn main() {
    let args = Args::parse();

    let config = match Config::load(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let level = args
        .log_level
        .as_deref()
        .unwrap_or(config.logging.level.as_str());
    if let Err(e) = logger::init(logger::parse_level(level)) {
        eprintln!("Warning: logger already initialized: {}", e);
    }

    if let Err(e) = cli::setup_ctrlc_handler() {
        eprintln!("Warning: failed to install Ctrl+C handler: {}", e);
    }

    let result = match args.command {
        Command::ListCameras { synthetic } => {
            cli::list_cameras(synthetic, &config.capture_settings())
        }
        Command::Run(run) => cli::run_capture(&run, &config),
        Command::Config { action } => {
            cli::handle_config_action(action, &config, args.config.as_deref())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
