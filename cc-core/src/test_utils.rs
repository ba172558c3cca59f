//! Test doubles for the capability traits
//!
//! Clones of a fake share state, so a test keeps one handle while the
//! other is boxed into a sensor or actuator.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::engine::{Fan, Thermal};
use crate::error::{CoolingError, Result};

#[derive(Debug, Default)]
struct ThermalState {
    temperature: Option<f32>,
    overheat: Option<f32>,
    critical: Option<f32>,
    target: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct FakeThermal {
    name: String,
    state: Arc<Mutex<ThermalState>>,
}

impl FakeThermal {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: Arc::new(Mutex::new(ThermalState::default())),
        }
    }

    pub fn with_temperature(self, value: f32) -> Self {
        self.set_temperature(Some(value));
        self
    }

    pub fn with_thresholds(self, overheat: Option<f32>, critical: Option<f32>) -> Self {
        {
            let mut state = self.state.lock();
            state.overheat = overheat;
            state.critical = critical;
        }
        self
    }

    pub fn with_target(self, target: f32) -> Self {
        self.state.lock().target = Some(target);
        self
    }

    /// Sensor at `value` with target/overheat/critical already set
    pub fn configured(name: &str, value: f32, target: f32, overheat: f32, critical: f32) -> Self {
        Self::new(name)
            .with_temperature(value)
            .with_thresholds(Some(overheat), Some(critical))
            .with_target(target)
    }

    pub fn set_temperature(&self, value: Option<f32>) {
        self.state.lock().temperature = value;
    }
}

impl Thermal for FakeThermal {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_temperature(&mut self) -> Result<f32> {
        self.state.lock().temperature.ok_or_else(|| CoolingError::TemperatureRead {
            path: PathBuf::from(format!("fake/{}", self.name)),
            reason: "no reading".to_string(),
        })
    }

    fn overheat(&self) -> Option<f32> {
        self.state.lock().overheat
    }

    fn critical(&self) -> Option<f32> {
        self.state.lock().critical
    }

    fn target(&self) -> Option<f32> {
        self.state.lock().target
    }
}

#[derive(Debug, Default)]
struct FanState {
    speed: Option<f32>,
    writes: Vec<f32>,
    fail_writes: bool,
}

#[derive(Debug, Clone)]
pub struct FakeFan {
    name: String,
    state: Arc<Mutex<FanState>>,
}

impl FakeFan {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: Arc::new(Mutex::new(FanState::default())),
        }
    }

    pub fn with_speed(self, speed: f32) -> Self {
        self.set_speed(Some(speed));
        self
    }

    pub fn failing_writes(self) -> Self {
        self.state.lock().fail_writes = true;
        self
    }

    pub fn set_speed(&self, speed: Option<f32>) {
        self.state.lock().speed = speed;
    }

    /// Every speed successfully written, oldest first
    pub fn writes(&self) -> Vec<f32> {
        self.state.lock().writes.clone()
    }
}

impl Fan for FakeFan {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_speed(&mut self) -> Result<f32> {
        self.state.lock().speed.ok_or_else(|| CoolingError::FanRead {
            path: PathBuf::from(format!("fake/{}", self.name)),
            reason: "no reading".to_string(),
        })
    }

    fn write_speed(&mut self, speed: f32) -> Result<()> {
        let mut state = self.state.lock();
        if state.fail_writes {
            return Err(CoolingError::PwmWrite {
                path: PathBuf::from(format!("fake/{}", self.name)),
                reason: "injected failure".to_string(),
            });
        }
        state.writes.push(speed);
        state.speed = Some(speed);
        Ok(())
    }
}
