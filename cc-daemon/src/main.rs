//! Chassis Cooling Daemon (coolingd)
//!
//! Privileged service that keeps the chassis fans at a safe speed.
//!
//! # Operation
//! - **Discovery**: binds every hwmon temperature and PWM channel to the
//!   `System` cooling zone at startup
//! - **Control**: ticks the cooling controller once per configured interval
//! - **Reload**: `SIGHUP` re-reads the configuration file
//! - **Shutdown**: `SIGINT` and `SIGTERM` stop the loop after the current tick
//!
//! # Privilege
//! Runs as root for /sys write access. Simulation mode skips the check.

mod fan_control;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use cc_core::constants::paths;
use cc_core::load_config;
use tracing::{error, info, warn};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable holding the log filter
const LOG_ENV: &str = "COOLINGD_LOG";

// ============================================================================
// CLI
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
struct Options {
    config_path: PathBuf,
    hwmon_root: PathBuf,
    print_config: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            config_path: paths::default_config_path(),
            hwmon_root: PathBuf::from(paths::HWMON_BASE),
            print_config: false,
        }
    }
}

#[derive(Debug, PartialEq)]
enum Command {
    Run(Options),
    Help,
    Version,
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    let mut options = Options::default();
    let mut iter = args.iter().skip(1);

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "-v" | "--version" => return Ok(Command::Version),
            "--print-config" => options.print_config = true,
            "-c" | "--config" => {
                let path = iter.next().ok_or("--config requires a path argument")?;
                options.config_path = PathBuf::from(path);
            }
            "-r" | "--hwmon-root" => {
                let path = iter.next().ok_or("--hwmon-root requires a path argument")?;
                options.hwmon_root = PathBuf::from(path);
            }
            other => return Err(format!("Unknown argument: {}", other)),
        }
    }

    Ok(Command::Run(options))
}

fn print_help() {
    eprintln!("coolingd {} - Chassis cooling daemon", VERSION);
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("    coolingd [OPTIONS]");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("    -c, --config PATH       Configuration file (default {})", paths::default_config_path().display());
    eprintln!("    -r, --hwmon-root PATH   hwmon sysfs root (default {})", paths::HWMON_BASE);
    eprintln!("        --print-config      Print the effective configuration and exit");
    eprintln!("    -v, --version           Print version");
    eprintln!("    -h, --help              Print this help");
    eprintln!();
    eprintln!("ENVIRONMENT:");
    eprintln!("    {}            Log filter (trace, debug, info, warn, error)", LOG_ENV);
    eprintln!();
    eprintln!("SIGNALS:");
    eprintln!("    SIGHUP                  Reload the configuration file");
    eprintln!("    SIGINT, SIGTERM         Stop after the current tick");
}

fn print_version() {
    println!("coolingd {}", VERSION);
}

// ============================================================================
// Setup
// ============================================================================

/// Log to the systemd journal when available, stdout otherwise
///
/// Returns true when logging goes to the journal.
fn init_logging(filter: &str) -> bool {
    use tracing_subscriber::prelude::*;

    if Path::new(paths::JOURNAL_SOCKET).exists() {
        match tracing_journald::layer() {
            Ok(journald_layer) => {
                tracing_subscriber::registry()
                    .with(journald_layer)
                    .with(tracing_subscriber::EnvFilter::new(filter))
                    .init();
                return true;
            }
            Err(e) => {
                eprintln!("Failed to create journald layer: {}, falling back to stdout", e);
            }
        }
    }

    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_env_filter(filter)
        .init();
    false
}

/// Refuse to drive hardware without root
fn verify_privileges() -> Result<(), &'static str> {
    // SAFETY: geteuid and getuid only return the process's user IDs.
    let euid = unsafe { libc::geteuid() };
    let uid = unsafe { libc::getuid() };

    if euid != 0 {
        return Err("coolingd must run as root (euid=0) to write fan speeds");
    }
    if uid != 0 {
        warn!("Running as setuid root - this is not recommended");
    }

    info!("Running as root (uid={}, euid={})", uid, euid);
    Ok(())
}

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());

        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("PANIC at {}: {}", location, message);
    }));
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    install_panic_hook();

    let args: Vec<String> = std::env::args().collect();
    let options = match parse_args(&args) {
        Ok(Command::Run(options)) => options,
        Ok(Command::Help) => {
            print_help();
            return Ok(());
        }
        Ok(Command::Version) => {
            print_version();
            return Ok(());
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            print_help();
            std::process::exit(1);
        }
    };

    let config = load_config(&options.config_path)
        .with_context(|| format!("failed to load {}", options.config_path.display()))?;

    if options.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let log_filter = std::env::var(LOG_ENV).unwrap_or_else(|_| "info".to_string());
    let journald = init_logging(&log_filter);

    info!("STARTUP: coolingd {} starting", VERSION);
    info!("STARTUP: Logging to {}", if journald { "systemd journal" } else { "stdout" });
    info!("STARTUP: Config: {}", options.config_path.display());

    if config.simulation {
        info!("STARTUP: Simulation mode, export disabled");
    } else if let Err(e) = verify_privileges() {
        error!("{}", e);
        std::process::exit(1);
    }

    let controller = fan_control::build_controller(config, &options.hwmon_root)?;

    let state = Arc::new(fan_control::ControlState::new(
        options.config_path.clone(),
        options.hwmon_root.clone(),
    ));

    let signal_state = Arc::clone(&state);
    if let Err(e) = ctrlc::set_handler(move || {
        info!("SIGNAL: Received SIGINT - initiating shutdown");
        signal_state.request_shutdown();
    }) {
        warn!("Failed to set signal handler: {}. Shutdown via signals may not work cleanly.", e);
    }

    fan_control::run_control_loop(state, controller).await?;

    info!("SHUTDOWN: coolingd terminated gracefully");
    Ok(())
}
