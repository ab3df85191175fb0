//! # hal402 Fleet Manager Binary
//!
//! Brings a fleet of DS-402 drives to a requested logical state
//! (`stopped`, `started`, ...) and publishes per-drive telemetry.
//!
//! Telemetry and request responses are written to stdout as JSON lines;
//! logs go to stderr. Each line read from stdin is one request.
//!
//! # Usage
//!
//! ```bash
//! # Simulated fleet of 6 drives, enable it at startup
//! hal402_mgr --simulate --request started
//!
//! # Custom config, 4 drives at 10 Hz, verbose logging
//! hal402_mgr --config config/manager.toml --drives 4 --rate 10 -v
//!
//! # Print the effective configuration and exit
//! hal402_mgr -s --print-config
//! ```

use clap::Parser;
use hal402_common::config::{ConfigError, LogLevel};
use hal402_common::hal::config::ManagerConfig;
use hal402_common::hal::consts::DEFAULT_CONFIG_PATH;
use hal402_mgr::core::{ManagerCore, RequestHandle, response_text};
use hal402_mgr::driver_registry::DriverRegistry;
use hal402_mgr::drivers::register_all_drivers;
use hal402_mgr::fleet::FleetManager;
use hal402_mgr::telemetry::{FanoutPublisher, JsonLinePublisher};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// hal402 Fleet Manager - DS-402 drive fleet state convergence
#[derive(Parser, Debug)]
#[command(name = "hal402_mgr")]
#[command(version)]
#[command(about = "DS-402 drive fleet manager with pluggable discrete I/O drivers")]
#[command(long_about = None)]
struct Args {
    /// Path to manager configuration file (manager.toml).
    /// Defaults are used when omitted and the default path does not exist.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Force simulation (simulation driver, injection enabled)
    #[arg(short = 's', long)]
    simulate: bool,

    /// I/O driver to load
    #[arg(short, long, default_value = "simulation")]
    driver: String,

    /// Number of drives (overrides fleet.drive_count)
    #[arg(long)]
    drives: Option<usize>,

    /// Idle inspection rate in Hz (overrides fleet.update_rate_hz)
    #[arg(long)]
    rate: Option<f64>,

    /// Logical state to request once at startup
    #[arg(short, long, value_name = "STATE")]
    request: Option<String>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() {
    if let Err(e) = run() {
        error!("hal402_mgr failed: {}", e);
        eprintln!("hal402_mgr: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_config(&args);
    setup_tracing(&args, config.as_ref().map(|c| c.shared.log_level).ok());
    let config = config?;

    if args.print_config {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    info!("hal402 Fleet Manager v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut registry = DriverRegistry::new();
    register_all_drivers(&mut registry)?;
    let driver_name = if args.simulate { "simulation" } else { args.driver.as_str() };
    let driver = registry.create_driver(driver_name)?;
    info!("Created driver: {} v{}", driver.name(), driver.version());

    let publisher = FanoutPublisher::new().with(Box::new(JsonLinePublisher::new(std::io::stdout())));
    let fleet = FleetManager::new(&config, driver, Box::new(publisher))?;
    let mut core = ManagerCore::new(fleet);

    let running = core.running_flag();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        running.store(false, Ordering::SeqCst);
    })?;

    let handle = core.handle();
    let initial = args.request.clone();
    let running = core.running_flag();
    std::thread::Builder::new()
        .name("requests".to_string())
        .spawn(move || serve_requests(&handle, initial, &running))?;

    // Shut the driver down before a loop failure is reported.
    let result = core.run();
    core.shutdown()?;
    result?;

    info!("hal402 Fleet Manager shutdown complete");
    Ok(())
}

/// Load the config file (or defaults) and apply CLI overrides.
fn load_config(args: &Args) -> Result<ManagerConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => ManagerConfig::load_validated(path)?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            ManagerConfig::load_validated(Path::new(DEFAULT_CONFIG_PATH))?
        }
        None => ManagerConfig::default(),
    };

    if args.simulate {
        config.simulation.enabled = true;
    }
    if let Some(drives) = args.drives {
        config.fleet.drive_count = drives;
    }
    if let Some(rate) = args.rate {
        config.fleet.update_rate_hz = rate;
    }
    config.validate()?;
    Ok(config)
}

/// Answer the startup request, then one request per stdin line.
fn serve_requests(handle: &RequestHandle, initial: Option<String>, running: &Arc<AtomicBool>) {
    if let Some(name) = initial {
        respond(handle, &name);
    }
    for line in std::io::stdin().lock().lines() {
        if !running.load(Ordering::SeqCst) {
            break;
        }
        match line {
            Ok(line) if line.trim().is_empty() => {}
            Ok(line) => respond(handle, line.trim()),
            Err(e) => {
                warn!("stdin closed: {}", e);
                break;
            }
        }
    }
}

fn respond(handle: &RequestHandle, name: &str) {
    let reply = handle.request(name);
    let line = serde_json::json!({
        "request": name,
        "response": response_text(&reply),
    });
    println!("{line}");
}

/// Setup tracing subscriber based on CLI arguments and configured level.
fn setup_tracing(args: &Args, configured: Option<LogLevel>) {
    let directive = if args.verbose {
        LogLevel::Debug.as_directive()
    } else {
        configured.unwrap_or_default().as_directive()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}
