//! Cooling objects: capability traits and their history-owning wrappers
//!
//! The control core never talks to hardware directly. A `Thermal` source
//! provides temperatures and thresholds, a `Fan` reads back and accepts
//! speeds. `ThermalSensor` and `FanActuator` wrap one of each and record
//! every successful read and write in a `BoundedHistory`. A sensor whose
//! latest read failed reports no temperature until it reads again.

use std::fmt;

use tracing::{debug, error, warn};

use crate::engine::history::{BoundedHistory, Timestamp};
use crate::error::Result;

/// Temperature source with overheat and critical thresholds (degrees C)
pub trait Thermal: Send {
    fn name(&self) -> &str;

    /// Read the current temperature from hardware
    fn read_temperature(&mut self) -> Result<f32>;

    fn overheat(&self) -> Option<f32>;

    fn critical(&self) -> Option<f32>;

    /// Target temperature from the platform description, if it has one
    fn target(&self) -> Option<f32> {
        None
    }
}

/// Fan actuator driven in percent (0-100)
pub trait Fan: Send {
    fn name(&self) -> &str;

    /// Read the speed currently applied to the fan
    fn read_speed(&mut self) -> Result<f32>;

    fn write_speed(&mut self, speed: f32) -> Result<()>;
}

/// A temperature sensor as seen by a cooling zone
pub struct ThermalSensor {
    source: Box<dyn Thermal>,
    data: BoundedHistory,
    // Set when the latest read failed; the history keeps the older samples
    stale: bool,
}

impl ThermalSensor {
    pub fn new(source: Box<dyn Thermal>, capacity: usize) -> Self {
        let data = BoundedHistory::new(source.name(), capacity);
        Self {
            source,
            data,
            stale: false,
        }
    }

    pub fn name(&self) -> &str {
        self.data.name()
    }

    /// Read the hardware and record the value
    ///
    /// A failed or non-finite read is not recorded and marks the sensor
    /// stale, so it has no temperature until the next good read.
    pub fn refresh(&mut self, now: Timestamp) -> Option<f32> {
        let value = match self.source.read_temperature() {
            Ok(value) if value.is_finite() => value,
            Ok(value) => {
                warn!(sensor = %self.name(), value, "Discarding non-finite temperature");
                self.stale = true;
                return None;
            }
            Err(e) => {
                warn!(sensor = %self.name(), error = %e, "Temperature read failed");
                self.stale = true;
                return None;
            }
        };
        Some(self.record_temperature(now, value))
    }

    /// Record a temperature obtained outside of `refresh`
    pub fn record_temperature(&mut self, now: Timestamp, value: f32) -> f32 {
        self.stale = false;
        self.data.record_measured(now, value)
    }

    /// Latest temperature, absent when the last read failed
    pub fn temperature(&self) -> Option<f32> {
        if self.stale {
            return None;
        }
        self.data.last_measured()
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn overheat(&self) -> Option<f32> {
        self.source.overheat()
    }

    pub fn critical(&self) -> Option<f32> {
        self.source.critical()
    }

    pub fn target(&self) -> Option<f32> {
        self.source.target()
    }

    /// A sensor takes part in control only with a reading and both thresholds
    pub fn is_valid(&self) -> bool {
        self.temperature().is_some() && self.overheat().is_some() && self.critical().is_some()
    }

    pub fn history(&self) -> &BoundedHistory {
        &self.data
    }

    pub fn set_history_capacity(&mut self, capacity: usize) {
        self.data.set_capacity(capacity);
    }
}

impl fmt::Display for ThermalSensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ThermalSensor({})", self.name())
    }
}

impl fmt::Debug for ThermalSensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThermalSensor")
            .field("name", &self.name())
            .field("temperature", &self.temperature())
            .field("overheat", &self.overheat())
            .field("critical", &self.critical())
            .finish()
    }
}

/// A fan as seen by a cooling zone
pub struct FanActuator {
    sink: Box<dyn Fan>,
    data: BoundedHistory,
}

impl FanActuator {
    pub fn new(sink: Box<dyn Fan>, capacity: usize) -> Self {
        let data = BoundedHistory::new(sink.name(), capacity);
        Self { sink, data }
    }

    pub fn name(&self) -> &str {
        self.data.name()
    }

    /// Read back the applied speed and record it
    pub fn refresh(&mut self, now: Timestamp) -> Option<f32> {
        match self.sink.read_speed() {
            Ok(speed) if speed.is_finite() => Some(self.data.record_measured(now, speed)),
            Ok(speed) => {
                debug!(fan = %self.name(), speed, "Discarding non-finite fan speed");
                None
            }
            Err(e) => {
                debug!(fan = %self.name(), error = %e, "Fan speed read failed");
                None
            }
        }
    }

    /// Record a speed obtained outside of `refresh`
    pub fn record_speed(&mut self, now: Timestamp, speed: f32) -> f32 {
        self.data.record_measured(now, speed)
    }

    /// Last measured speed
    pub fn speed(&self) -> Option<f32> {
        self.data.last_measured()
    }

    /// Measured speed before the last one
    pub fn previous_speed(&self) -> Option<f32> {
        self.data.nth_from_end_measured(2)
    }

    pub fn last_commanded(&self) -> Option<f32> {
        self.data.last_commanded()
    }

    /// Write a speed to the fan
    ///
    /// A failed write is logged and not recorded; it never propagates.
    pub fn command(&mut self, now: Timestamp, speed: f32) -> Option<f32> {
        match self.sink.write_speed(speed) {
            Ok(()) => Some(self.data.record_commanded(now, speed)),
            Err(e) => {
                error!(fan = %self.name(), speed, error = %e, "Failed to write fan speed");
                None
            }
        }
    }

    pub fn history(&self) -> &BoundedHistory {
        &self.data
    }

    pub fn set_history_capacity(&mut self, capacity: usize) {
        self.data.set_capacity(capacity);
    }
}

impl fmt::Display for FanActuator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FanActuator({})", self.name())
    }
}

impl fmt::Debug for FanActuator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FanActuator")
            .field("name", &self.name())
            .field("speed", &self.speed())
            .field("last_commanded", &self.last_commanded())
            .finish()
    }
}
