//! Chassis Cooling Core Library
//!
//! Closed-loop fan speed control for network switch chassis.
//!
//! # Features
//!
//! - **Bounded history**: every fan and sensor keeps its last measured and
//!   commanded samples for diagnostics and export
//! - **Fail-safe control**: overheat, missing sensors and missing speed
//!   history all resolve to full speed
//! - **Rate limiting**: asymmetric increase/decrease caps with a deadband,
//!   scaled by the time elapsed since the previous tick
//! - **Hardware adapters**: Linux hwmon temperature and PWM channels
//!
//! # Module Structure
//!
//! - `data/` - Configuration snapshot and validation
//! - `engine/` - Histories, zones and the controller
//! - `hw/` - Hardware adapters
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use cc_core::{discover, CoolingConfig, CoolingController, RunOptions, SYSTEM_ZONE};
//!
//! let config = CoolingConfig::default();
//! let members = discover(Path::new("/sys/class/hwmon"))
//!     .unwrap()
//!     .into_members(config.history_capacity);
//!
//! let mut controller = CoolingController::with_config(config).unwrap();
//! controller.load(SYSTEM_ZONE, members);
//! let report = controller.tick(RunOptions::new().refresh(true));
//! ```

// Grouped modules
pub mod data;
pub mod engine;
pub mod hw;

// Standalone modules
pub mod constants;
pub mod error;

#[cfg(test)]
pub mod test_utils;

pub use constants::cooling::SYSTEM_ZONE;

// Re-export configuration from data/
pub use data::{load_config, CoolingConfig};

// Re-export error types
pub use error::{CoolingError, Result};

// Re-export engine types
pub use engine::{
    BoundedHistory, Clock, CoolingController, CoolingZone, CsvExportSink, ExportRow,
    ExportSink, Fan, FanActuator, HistorySnapshot, ManualClock, MonotonicRawClock, Operation,
    RunOptions, Sample, Thermal, ThermalAggregate, ThermalSensor, ThermalSnapshot, Tick,
    TickReport, Timestamp, ZoneMembers, ZoneReport,
};

// Re-export hardware adapters from hw/
pub use hw::{discover, HwmonFan, HwmonInventory, HwmonThermal};
