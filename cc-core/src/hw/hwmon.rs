//! Linux hwmon adapters
//!
//! - **Temperature**: `tempN_input` files (millidegrees Celsius), with
//!   `tempN_max` as the overheat threshold and `tempN_crit` as critical
//! - **PWM**: `pwmN` files (0-255 duty cycle), exposed in percent
//!
//! Thresholds and labels are read once at discovery; only the input and
//! PWM files are touched on every tick.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, info, trace, warn};

use crate::constants::{pwm, temperature};
use crate::engine::{Fan, Thermal, ZoneMembers};
use crate::error::{CoolingError, Result};

/// Temperature channel of an hwmon chip
pub struct HwmonThermal {
    name: String,
    input_path: PathBuf,
    overheat: Option<f32>,
    critical: Option<f32>,
}

impl HwmonThermal {
    /// Bind channel `index` of the chip at `chip_path`
    pub fn new(chip: &str, chip_path: &Path, index: u32) -> Self {
        let label = read_trimmed(&chip_path.join(format!("temp{}_label", index)));
        let channel = label.unwrap_or_else(|| format!("temp{}", index));
        Self {
            name: format!("{}_{}", chip, channel.replace(' ', "_")),
            input_path: chip_path.join(format!("temp{}_input", index)),
            overheat: read_millidegrees(&chip_path.join(format!("temp{}_max", index))).ok(),
            critical: read_millidegrees(&chip_path.join(format!("temp{}_crit", index))).ok(),
        }
    }
}

impl Thermal for HwmonThermal {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_temperature(&mut self) -> Result<f32> {
        read_millidegrees(&self.input_path)
    }

    fn overheat(&self) -> Option<f32> {
        self.overheat
    }

    fn critical(&self) -> Option<f32> {
        self.critical
    }
}

impl fmt::Debug for HwmonThermal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HwmonThermal")
            .field("name", &self.name)
            .field("input_path", &self.input_path)
            .field("overheat", &self.overheat)
            .field("critical", &self.critical)
            .finish()
    }
}

/// PWM channel of an hwmon chip
#[derive(Debug)]
pub struct HwmonFan {
    name: String,
    pwm_path: PathBuf,
    enable_path: PathBuf,
    manual: bool,
}

impl HwmonFan {
    pub fn new(chip: &str, chip_path: &Path, index: u32) -> Self {
        Self {
            name: format!("{}_pwm{}", chip, index),
            pwm_path: chip_path.join(format!("pwm{}", index)),
            enable_path: chip_path.join(format!("pwm{}_enable", index)),
            manual: false,
        }
    }

    /// Switch the channel to software control
    ///
    /// A missing enable file means manual control is always active.
    fn enable_manual(&mut self) -> Result<()> {
        if self.manual {
            return Ok(());
        }
        if self.enable_path.exists() {
            fs::write(&self.enable_path, pwm::enable::MANUAL.to_string()).map_err(|e| {
                CoolingError::PwmWrite {
                    path: self.enable_path.clone(),
                    reason: format!("Failed to enable manual PWM control: {}", e),
                }
            })?;
            debug!(fan = %self.name, "Enabled manual PWM control");
        }
        self.manual = true;
        Ok(())
    }
}

impl Fan for HwmonFan {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_speed(&mut self) -> Result<f32> {
        let fan_err = |reason: String| CoolingError::FanRead {
            path: self.pwm_path.clone(),
            reason,
        };
        let content =
            fs::read_to_string(&self.pwm_path).map_err(|e| fan_err(format!("Failed to read: {}", e)))?;
        let value = content
            .trim()
            .parse::<u8>()
            .map_err(|e| fan_err(format!("Failed to parse '{}': {}", content.trim(), e)))?;
        Ok(pwm::to_percent(value))
    }

    fn write_speed(&mut self, speed: f32) -> Result<()> {
        self.enable_manual()?;
        let value = pwm::from_percent(speed);
        fs::write(&self.pwm_path, value.to_string()).map_err(|e| CoolingError::PwmWrite {
            path: self.pwm_path.clone(),
            reason: format!("Failed to write PWM value {}: {}", value, e),
        })
    }
}

/// Everything found under an hwmon root, sorted by name
#[derive(Debug, Default)]
pub struct HwmonInventory {
    pub fans: Vec<HwmonFan>,
    pub thermals: Vec<HwmonThermal>,
}

impl HwmonInventory {
    pub fn is_empty(&self) -> bool {
        self.fans.is_empty() && self.thermals.is_empty()
    }

    /// Wrap every channel for binding to a zone
    pub fn into_members(self, capacity: usize) -> ZoneMembers {
        ZoneMembers::from_sources(
            self.fans
                .into_iter()
                .map(|f| Box::new(f) as Box<dyn Fan>)
                .collect(),
            self.thermals
                .into_iter()
                .map(|t| Box::new(t) as Box<dyn Thermal>)
                .collect(),
            capacity,
        )
    }
}

/// Enumerate every temperature and PWM channel under `root`
pub fn discover(root: &Path) -> Result<HwmonInventory> {
    if !root.is_dir() {
        return Err(CoolingError::HardwareNotFound(format!(
            "hwmon root {} is not a directory",
            root.display()
        )));
    }

    let temp_re = Regex::new(r"^temp(\d+)_input$").map_err(|e| CoolingError::generic(e.to_string()))?;
    let pwm_re = Regex::new(r"^pwm(\d+)$").map_err(|e| CoolingError::generic(e.to_string()))?;

    debug!("Scanning hwmon chips in {:?}", root);
    let mut inventory = HwmonInventory::default();

    for entry in fs::read_dir(root)? {
        let chip_path = entry?.path();
        if !chip_path.is_dir() {
            continue;
        }
        let chip = chip_name(&chip_path);
        trace!(chip = %chip, path = ?chip_path, "Reading hwmon chip");

        let entries = match fs::read_dir(&chip_path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(chip = %chip, error = %e, "Skipping unreadable hwmon chip");
                continue;
            }
        };

        for file in entries.flatten() {
            let file_name = file.file_name();
            let file_name = file_name.to_string_lossy();

            if let Some(index) = channel_index(&temp_re, &file_name) {
                inventory.thermals.push(HwmonThermal::new(&chip, &chip_path, index));
            } else if let Some(index) = channel_index(&pwm_re, &file_name) {
                inventory.fans.push(HwmonFan::new(&chip, &chip_path, index));
            }
        }
    }

    inventory.thermals.sort_by(|a, b| a.name.cmp(&b.name));
    inventory.fans.sort_by(|a, b| a.name.cmp(&b.name));

    info!(
        temps = inventory.thermals.len(),
        fans = inventory.fans.len(),
        "Discovered hwmon channels"
    );
    Ok(inventory)
}

fn channel_index(re: &Regex, file_name: &str) -> Option<u32> {
    re.captures(file_name)?.get(1)?.as_str().parse().ok()
}

fn chip_name(chip_path: &Path) -> String {
    read_trimmed(&chip_path.join("name")).unwrap_or_else(|| {
        chip_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string()
    })
}

fn read_trimmed(path: &Path) -> Option<String> {
    fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn read_millidegrees(path: &Path) -> Result<f32> {
    let temp_err = |reason: String| CoolingError::TemperatureRead {
        path: path.to_path_buf(),
        reason,
    };
    let content = fs::read_to_string(path).map_err(|e| temp_err(format!("Failed to read: {}", e)))?;
    let millidegrees = content
        .trim()
        .parse::<i32>()
        .map_err(|e| temp_err(format!("Failed to parse '{}': {}", content.trim(), e)))?;
    Ok(millidegrees as f32 / temperature::MILLIDEGREE_DIVISOR)
}
