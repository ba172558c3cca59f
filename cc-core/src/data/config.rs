//! Cooling configuration
//!
//! The configuration is an immutable snapshot: it is loaded once, validated,
//! and shared by the controller and its zones. Operator overrides produce a
//! new snapshot which is handed to `CoolingController::reconfigure`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::cooling;
use crate::data::validation::{validate_non_negative, validate_percentage, validate_positive};
use crate::error::{CoolingError, Result};

/// Tunables for the fan speed control loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoolingConfig {
    /// Speed floor in percent
    #[serde(default = "default_min_speed")]
    pub min_speed: f32,

    /// Largest decrease applied over one nominal interval (percent)
    #[serde(default = "default_max_decrease")]
    pub max_decrease: f32,

    /// Largest increase applied over one nominal interval (percent)
    #[serde(default = "default_max_increase")]
    pub max_increase: f32,

    /// Added to every sensor target; negative values bias toward cooler
    #[serde(default = "default_target_offset")]
    pub target_offset: f32,

    /// Lower edge of the no-change band, compared against `deltap * 100`
    #[serde(default = "default_deadband_low")]
    pub deadband_low: f32,

    /// Upper edge of the no-change band, compared against `deltap * 100`
    #[serde(default = "default_deadband_high")]
    pub deadband_high: f32,

    /// Samples kept per measured/commanded stream
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Nominal tick period in seconds
    #[serde(default = "default_interval_secs")]
    pub interval_secs: f64,

    /// Fallback target as a fraction of the overheat threshold
    #[serde(default = "default_target_factor")]
    pub target_factor: f32,

    /// Directory receiving `<zone>.cooling.csv`; no export when unset
    #[serde(default)]
    pub export_path: Option<PathBuf>,

    /// Simulation mode: never export
    #[serde(default)]
    pub simulation: bool,

    /// Per-sensor target overrides keyed by sensor name
    #[serde(default)]
    pub sensor_targets: BTreeMap<String, f32>,
}

fn default_min_speed() -> f32 { cooling::DEFAULT_MIN_SPEED }
fn default_max_decrease() -> f32 { cooling::DEFAULT_MAX_DECREASE }
fn default_max_increase() -> f32 { cooling::DEFAULT_MAX_INCREASE }
fn default_target_offset() -> f32 { cooling::DEFAULT_TARGET_OFFSET }
fn default_deadband_low() -> f32 { cooling::DEFAULT_DEADBAND_LOW }
fn default_deadband_high() -> f32 { cooling::DEFAULT_DEADBAND_HIGH }
fn default_history_capacity() -> usize { cooling::DEFAULT_HISTORY_CAPACITY }
fn default_interval_secs() -> f64 { cooling::DEFAULT_INTERVAL_SECS }
fn default_target_factor() -> f32 { cooling::DEFAULT_TARGET_FACTOR }

impl Default for CoolingConfig {
    fn default() -> Self {
        Self {
            min_speed: default_min_speed(),
            max_decrease: default_max_decrease(),
            max_increase: default_max_increase(),
            target_offset: default_target_offset(),
            deadband_low: default_deadband_low(),
            deadband_high: default_deadband_high(),
            history_capacity: default_history_capacity(),
            interval_secs: default_interval_secs(),
            target_factor: default_target_factor(),
            export_path: None,
            simulation: false,
            sensor_targets: BTreeMap::new(),
        }
    }
}

impl CoolingConfig {
    /// Check every field; the first offending field is reported
    pub fn validate(&self) -> Result<()> {
        validate_percentage("min_speed", self.min_speed)?;
        validate_non_negative("max_decrease", self.max_decrease)?;
        validate_non_negative("max_increase", self.max_increase)?;

        if !self.target_offset.is_finite() {
            return Err(CoolingError::invalid_config("target_offset", "must be finite"));
        }
        if !self.deadband_low.is_finite() || !self.deadband_high.is_finite() {
            return Err(CoolingError::invalid_config("deadband", "bounds must be finite"));
        }
        if self.deadband_low > self.deadband_high {
            return Err(CoolingError::invalid_config(
                "deadband_low",
                format!(
                    "{} is above deadband_high {}",
                    self.deadband_low, self.deadband_high
                ),
            ));
        }
        if self.history_capacity < cooling::MIN_HISTORY_CAPACITY {
            return Err(CoolingError::invalid_config(
                "history_capacity",
                format!(
                    "{} is below the minimum of {}",
                    self.history_capacity,
                    cooling::MIN_HISTORY_CAPACITY
                ),
            ));
        }
        validate_positive("interval_secs", self.interval_secs)?;
        if !(self.target_factor > 0.0 && self.target_factor <= 1.0) {
            return Err(CoolingError::invalid_config(
                "target_factor",
                format!("{} is not within (0, 1]", self.target_factor),
            ));
        }
        for (name, target) in &self.sensor_targets {
            if !target.is_finite() {
                return Err(CoolingError::invalid_config(
                    format!("sensor_targets.{}", name),
                    "must be finite",
                ));
            }
        }
        Ok(())
    }

    /// Nominal tick period
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(self.interval_secs)
    }

    /// New snapshot with an operator-supplied speed floor
    pub fn with_min_speed(&self, min_speed: f32) -> Self {
        Self {
            min_speed,
            ..self.clone()
        }
    }

    /// Whether rows should be written to the export directory
    pub fn export_enabled(&self) -> bool {
        self.export_path.is_some() && !self.simulation
    }
}

/// Load and validate a configuration file
///
/// A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<CoolingConfig> {
    if !path.exists() {
        debug!("No cooling config at {:?}, using defaults", path);
        return Ok(CoolingConfig::default());
    }

    let content = fs::read_to_string(path).map_err(|e| CoolingError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config: CoolingConfig = serde_json::from_str(&content)?;
    config.validate()?;

    debug!(?path, "Loaded cooling config");
    Ok(config)
}
