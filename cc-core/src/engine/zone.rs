//! Cooling zone: one set of fans driven by one set of sensors
//!
//! Each tick the zone picks the most critical sensor and moves the shared
//! fan speed toward keeping it at target:
//!
//! 1. **Fail-safe**: any sensor past its ceiling, or no usable sensor at all,
//!    drives the fans to 100%.
//! 2. **Deadband**: while the selected sensor's `deltap * 100` is inside the
//!    configured band the previous speed is kept.
//! 3. **Rate limiting**: the step is proportional to `deltap`, capped by the
//!    asymmetric increase/decrease limits, and scaled down when the tick came
//!    sooner than the nominal interval.
//! 4. **Clamping**: the result always stays within `[min_speed, 100]`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::constants::{cooling::ZONE_SPEED_HISTORY, speed::MAX_SPEED};
use crate::data::CoolingConfig;
use crate::engine::export::ExportRow;
use crate::engine::history::{BoundedHistory, HistorySnapshot, Operation, Timestamp};
use crate::engine::objects::{Fan, FanActuator, Thermal, ThermalSensor};
use crate::engine::thermal::ThermalAggregate;

/// Timing of the tick being run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub now: Timestamp,
    pub elapsed: Duration,
}

/// Fans and sensors bound to a zone
#[derive(Debug, Default)]
pub struct ZoneMembers {
    pub fans: Vec<FanActuator>,
    pub sensors: Vec<ThermalSensor>,
}

impl ZoneMembers {
    /// Wrap raw capabilities, each with a history of `capacity` samples
    pub fn from_sources(
        fans: Vec<Box<dyn Fan>>,
        sensors: Vec<Box<dyn Thermal>>,
        capacity: usize,
    ) -> Self {
        Self {
            fans: fans.into_iter().map(|f| FanActuator::new(f, capacity)).collect(),
            sensors: sensors
                .into_iter()
                .map(|t| ThermalSensor::new(t, capacity))
                .collect(),
        }
    }
}

/// Outcome of one zone tick
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneReport {
    pub zone: String,
    pub speed: f32,
    pub overheat: bool,
    /// Sensor that drove the decision, if any
    pub selected: Option<String>,
    pub failed_writes: usize,
}

pub struct CoolingZone {
    name: String,
    config: Arc<CoolingConfig>,
    speed: BoundedHistory,
    fans: Vec<FanActuator>,
    sensors: Vec<ThermalSensor>,
    initialized: bool,
}

impl CoolingZone {
    pub fn new(name: impl Into<String>, config: Arc<CoolingConfig>) -> Self {
        let speed = BoundedHistory::new(ZONE_SPEED_HISTORY, config.history_capacity);
        Self {
            name: name.into(),
            config,
            speed,
            fans: Vec::new(),
            sensors: Vec::new(),
            initialized: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CoolingConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn fans(&self) -> &[FanActuator] {
        &self.fans
    }

    pub fn sensors(&self) -> &[ThermalSensor] {
        &self.sensors
    }

    /// Mutable sensor access for feeding readings without a hardware refresh
    pub fn sensor_mut(&mut self, name: &str) -> Option<&mut ThermalSensor> {
        self.sensors.iter_mut().find(|s| s.name() == name)
    }

    pub fn fan_mut(&mut self, name: &str) -> Option<&mut FanActuator> {
        self.fans.iter_mut().find(|f| f.name() == name)
    }

    /// Zone-level commanded speed history
    pub fn speed_history(&self) -> &BoundedHistory {
        &self.speed
    }

    /// Bind fans and sensors; membership is fixed afterwards
    pub fn load(&mut self, members: ZoneMembers) {
        if self.initialized {
            warn!("{}: membership already bound, ignoring new members", self);
            return;
        }
        debug!(
            "{}: bound {} fans and {} sensors",
            self,
            members.fans.len(),
            members.sensors.len()
        );
        self.fans = members.fans;
        self.sensors = members.sensors;
        self.initialized = true;
    }

    /// Swap in a new configuration snapshot
    ///
    /// A changed `history_capacity` resizes every history of the zone;
    /// shrinking drops the oldest samples.
    pub fn reconfigure(&mut self, config: Arc<CoolingConfig>) {
        let capacity = config.history_capacity;
        if capacity != self.config.history_capacity {
            info!(
                "{}: history capacity {} -> {}",
                self, self.config.history_capacity, capacity
            );
            self.speed.set_capacity(capacity);
            for fan in &mut self.fans {
                fan.set_history_capacity(capacity);
            }
            for sensor in &mut self.sensors {
                sensor.set_history_capacity(capacity);
            }
        }
        self.config = config;
    }

    /// Read every fan and sensor from hardware into their histories
    pub fn refresh(&mut self, now: Timestamp) {
        for fan in &mut self.fans {
            fan.refresh(now);
        }
        for sensor in &mut self.sensors {
            sensor.refresh(now);
        }
    }

    /// Last speed commanded by this zone
    pub fn last_speed(&self) -> Option<f32> {
        self.speed.last_commanded()
    }

    /// Speed to start from: commanded, else read back from a fan, else max
    ///
    /// Clamped so the deadband never holds a speed outside the allowed range.
    pub fn read_last_speed(&self) -> f32 {
        let last = self.last_speed().or_else(|| {
            let current = self.fans.iter().find_map(|f| f.speed());
            if let Some(speed) = current {
                debug!("{}: detected last speed {:.1}", self, speed);
            }
            current
        });

        match last {
            Some(speed) => speed.clamp(self.config.min_speed, MAX_SPEED),
            None => {
                debug!("{}: could not find last speed, assuming max", self);
                MAX_SPEED
            }
        }
    }

    /// Evaluate every sensor for this tick
    pub fn evaluate(&self) -> ThermalAggregate {
        let mut aggregate = ThermalAggregate::for_config(&self.config);
        aggregate.extend(self.sensors.iter());
        aggregate
    }

    pub fn compute_fan_speed(
        &self,
        last_speed: f32,
        aggregate: &ThermalAggregate,
        elapsed: Duration,
    ) -> f32 {
        if aggregate.is_overheat() {
            // Run the fans at 100% if one sensor is in overheat state
            return MAX_SPEED;
        }

        let Some(info) = aggregate.choose() else {
            debug!("{}: no usable sensor, running at max", self);
            return MAX_SPEED;
        };

        debug!("{}: using {} to set fan speed", self, info.sensor);

        let config = &self.config;
        let deltap_pct = info.deltap * 100.0;
        if config.deadband_low < deltap_pct && deltap_pct < config.deadband_high {
            return last_speed;
        }

        let step = if info.delta < 0.0 {
            (config.max_decrease * info.deltap).max(-config.max_decrease)
        } else {
            (config.max_increase * info.deltap).min(config.max_increase)
        };
        let step = self.scale_on_elapsed(step, elapsed);

        (last_speed + step).max(config.min_speed).min(MAX_SPEED)
    }

    /// Shrink a step for ticks shorter than the nominal interval
    pub fn scale_on_elapsed(&self, value: f32, elapsed: Duration) -> f32 {
        let factor = (elapsed.as_secs_f64() / self.config.interval_secs).min(1.0);
        value * factor as f32
    }

    /// Run one control tick
    ///
    /// `members` are bound on the first run only. Never fails: fan write
    /// errors are logged and counted in the report.
    pub fn run(&mut self, tick: &Tick, members: Option<ZoneMembers>, refresh: bool) -> ZoneReport {
        if !self.initialized {
            self.load(members.unwrap_or_default());
        } else if members.is_some() {
            debug!("{}: already initialized, ignoring supplied members", self);
        }

        if refresh {
            self.refresh(tick.now);
        }

        let last_speed = self.read_last_speed();
        let aggregate = self.evaluate();
        let desired = self.compute_fan_speed(last_speed, &aggregate, tick.elapsed);

        debug!("{}: fan speed selected is {:.3}", self, desired);
        self.speed.record_commanded(tick.now, desired);

        let mut failed_writes = 0;
        for fan in &mut self.fans {
            if fan.command(tick.now, desired).is_none() {
                failed_writes += 1;
            }
        }

        ZoneReport {
            zone: self.name.clone(),
            speed: desired,
            overheat: aggregate.is_overheat(),
            selected: aggregate.choose().map(|s| s.sensor.clone()),
            failed_writes,
        }
    }

    /// Latest measured and commanded sample of every fan, then every sensor
    pub fn export_rows(&self) -> Vec<ExportRow> {
        let histories = self
            .fans
            .iter()
            .map(FanActuator::history)
            .chain(self.sensors.iter().map(ThermalSensor::history));

        let mut rows = Vec::new();
        for history in histories {
            if let Some(sample) = history.last_measured_sample() {
                rows.push(ExportRow::new(history.name(), Operation::Measured, sample));
            }
            if let Some(sample) = history.last_commanded_sample() {
                rows.push(ExportRow::new(history.name(), Operation::Commanded, sample));
            }
        }
        rows
    }

    /// Full history of the zone and its members
    pub fn snapshots(&self) -> Vec<HistorySnapshot> {
        std::iter::once(self.speed.snapshot())
            .chain(self.fans.iter().map(|f| f.history().snapshot()))
            .chain(self.sensors.iter().map(|s| s.history().snapshot()))
            .collect()
    }

    /// Diagnostics dump as JSON
    pub fn dump(&self) -> serde_json::Value {
        serde_json::json!({
            "zone": self.name,
            "last_speed": self.last_speed(),
            "histories": self.snapshots(),
        })
    }
}

impl fmt::Display for CoolingZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CoolingZone({})", self.name)
    }
}

impl fmt::Debug for CoolingZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoolingZone")
            .field("name", &self.name)
            .field("fans", &self.fans)
            .field("sensors", &self.sensors)
            .field("last_speed", &self.last_speed())
            .field("initialized", &self.initialized)
            .finish()
    }
}
