//! Periodic cooling loop
//!
//! The loop owns the controller and ticks it once per configured interval.
//! Each tick reads and writes sysfs, so it runs on the blocking thread pool;
//! the controller is moved into the task and handed back when it finishes,
//! which keeps ticks strictly sequential.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use cc_core::{
    discover, load_config, CoolingConfig, CoolingController, RunOptions, ZoneMembers, SYSTEM_ZONE,
};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

/// State shared between the control loop and the signal handlers
pub struct ControlState {
    config_path: PathBuf,
    hwmon_root: PathBuf,
    shutdown: AtomicBool,
    wake: Notify,
}

impl ControlState {
    pub fn new(config_path: PathBuf, hwmon_root: PathBuf) -> Self {
        Self {
            config_path,
            hwmon_root,
            shutdown: AtomicBool::new(false),
            wake: Notify::new(),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn hwmon_root(&self) -> &Path {
        &self.hwmon_root
    }

    /// Ask the loop to stop and wake it up if it is sleeping
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.wake.notify_one();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

/// Discover hwmon channels and bind them to the `System` zone
///
/// In simulation mode a missing hwmon root yields an empty zone instead of
/// an error.
pub fn build_controller(config: CoolingConfig, hwmon_root: &Path) -> anyhow::Result<CoolingController> {
    let members = match discover(hwmon_root) {
        Ok(inventory) => {
            if inventory.is_empty() {
                warn!("No temperature or PWM channels under {}", hwmon_root.display());
            }
            inventory.into_members(config.history_capacity)
        }
        Err(e) if config.simulation => {
            warn!("Hardware discovery failed in simulation mode: {}", e);
            ZoneMembers::default()
        }
        Err(e) => {
            return Err(e)
                .with_context(|| format!("hwmon discovery under {} failed", hwmon_root.display()))
        }
    };

    info!(
        fans = members.fans.len(),
        sensors = members.sensors.len(),
        "Binding hardware to the {} zone",
        SYSTEM_ZONE
    );

    let mut controller =
        CoolingController::with_config(config).context("invalid cooling configuration")?;
    controller.load(SYSTEM_ZONE, members);
    Ok(controller)
}

/// Re-read the config file and apply it; the old config stays on failure
pub fn reload_config(state: &ControlState, controller: &mut CoolingController) -> cc_error::Result<()> {
    let config = load_config(state.config_path())?;
    controller.reconfigure(config)
}

/// Run one tick on the blocking pool and hand the controller back
async fn run_tick(mut controller: CoolingController) -> Result<CoolingController, tokio::task::JoinError> {
    tokio::task::spawn_blocking(move || {
        let report = controller.tick(RunOptions::new().refresh(true));
        for zone in &report.zones {
            if zone.overheat {
                warn!(zone = %zone.zone, "Overheat detected, fans at full speed");
            }
            debug!(
                zone = %zone.zone,
                speed = zone.speed,
                sensor = zone.selected.as_deref().unwrap_or("none"),
                failed_writes = zone.failed_writes,
                "Cooling tick applied"
            );
        }
        controller
    })
    .await
}

/// Tick until shutdown is requested
///
/// SIGHUP reloads the configuration file between ticks. SIGTERM stops the
/// loop once the running tick has finished.
pub async fn run_control_loop(state: Arc<ControlState>, mut controller: CoolingController) -> anyhow::Result<()> {
    let mut hangup = signal(SignalKind::hangup()).context("failed to install SIGHUP handler")?;
    let mut terminate = signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
    info!("Cooling control loop starting");

    loop {
        if state.is_shutdown() {
            info!("Cooling control loop shutting down");
            break;
        }

        controller = match run_tick(controller).await {
            Ok(controller) => controller,
            Err(e) => {
                error!("Cooling tick panicked: {} - rebuilding controller", e);
                let config = load_config(state.config_path())
                    .context("failed to reload configuration after a panicked tick")?;
                build_controller(config, state.hwmon_root())?
            }
        };

        tokio::select! {
            _ = tokio::time::sleep(controller.config().interval()) => {}
            _ = state.wake.notified() => {
                debug!("Control loop woken up");
            }
            _ = terminate.recv() => {
                info!("SIGNAL: Received SIGTERM - initiating shutdown");
                state.request_shutdown();
            }
            _ = hangup.recv() => {
                info!("SIGNAL: Configuration reload requested");
                match reload_config(&state, &mut controller) {
                    Ok(()) => info!("Configuration reloaded from {}", state.config_path().display()),
                    Err(e) => error!("Failed to reload config: {} - keeping previous configuration", e),
                }
            }
        }
    }

    info!("Cooling control loop stopped");
    Ok(())
}
