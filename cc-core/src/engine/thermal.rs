//! Per-tick thermal evaluation
//!
//! Each valid sensor is reduced to a `ThermalSnapshot` which places its
//! reading between the effective target (0) and the ceiling (1). The
//! `ThermalAggregate` collects the snapshots of one tick, remembers whether
//! any sensor went past its ceiling and picks the most critical one.

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use crate::data::CoolingConfig;
use crate::engine::objects::ThermalSensor;

/// One sensor evaluated at one tick
#[derive(Debug, Clone, PartialEq)]
pub struct ThermalSnapshot {
    pub sensor: String,
    pub value: f32,
    pub target: f32,
    pub ceiling: f32,
    pub delta: f32,
    /// Normalized position: 0 at target, 1 at ceiling, above 1 when overheating
    pub deltap: f32,
}

impl ThermalSnapshot {
    pub fn new(sensor: impl Into<String>, value: f32, target: f32, ceiling: f32) -> Self {
        let delta = value - target;
        Self {
            sensor: sensor.into(),
            value,
            target,
            ceiling,
            delta,
            deltap: delta / (ceiling - target),
        }
    }
}

impl fmt::Display for ThermalSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ThermalSnapshot(sensor={}, value={:.2}, target={:.2}, ceiling={:.2}, delta={:.2}, deltap={:.3})",
            self.sensor, self.value, self.target, self.ceiling, self.delta, self.deltap
        )
    }
}

/// Snapshots of every usable sensor for one tick
#[derive(Debug, Clone)]
pub struct ThermalAggregate {
    overheat: bool,
    target_offset: f32,
    target_factor: f32,
    targets: BTreeMap<String, f32>,
    snapshots: Vec<ThermalSnapshot>,
}

impl ThermalAggregate {
    /// `target_factor` scales the overheat threshold for sensors without a target
    pub fn new(target_offset: f32, target_factor: f32) -> Self {
        Self {
            overheat: false,
            target_offset,
            target_factor,
            targets: BTreeMap::new(),
            snapshots: Vec::new(),
        }
    }

    /// Aggregate using the offset, factor and per-sensor targets of `config`
    pub fn for_config(config: &CoolingConfig) -> Self {
        Self {
            targets: config.sensor_targets.clone(),
            ..Self::new(config.target_offset, config.target_factor)
        }
    }

    /// Target before the offset: configured override, then the sensor's own,
    /// then a fraction of the overheat threshold
    fn base_target(&self, sensor: &ThermalSensor, overheat: f32) -> f32 {
        self.targets
            .get(sensor.name())
            .copied()
            .or_else(|| sensor.target())
            .unwrap_or(self.target_factor * overheat)
    }

    /// Evaluate one sensor; invalid or unconfigured sensors are skipped
    pub fn process(&mut self, sensor: &ThermalSensor) {
        let (Some(value), Some(overheat), Some(critical)) =
            (sensor.temperature(), sensor.overheat(), sensor.critical())
        else {
            return;
        };

        let ceiling = overheat.min(critical);
        let target = self.base_target(sensor, overheat) + self.target_offset;
        if target <= 0.0 || ceiling <= 0.0 {
            debug!("{}: unusable target {} or ceiling {}, skipping", sensor, target, ceiling);
            return;
        }

        if value > ceiling {
            debug!("{}: temp is above overheat threshold", sensor);
            self.overheat = true;
        }

        if ceiling <= target {
            debug!("{}: target {} is not below ceiling {}, skipping", sensor, target, ceiling);
            return;
        }

        let snapshot = ThermalSnapshot::new(sensor.name(), value, target, ceiling);
        debug!("{}", snapshot);
        self.snapshots.push(snapshot);
    }

    /// Sticky for the tick once any sensor exceeds its ceiling
    pub fn is_overheat(&self) -> bool {
        self.overheat
    }

    pub fn snapshots(&self) -> &[ThermalSnapshot] {
        &self.snapshots
    }

    /// Snapshot with the highest deltap; the first one wins a tie
    pub fn choose(&self) -> Option<&ThermalSnapshot> {
        let mut iter = self.snapshots.iter();
        let mut selected = iter.next()?;
        for snapshot in iter {
            if snapshot.deltap > selected.deltap {
                selected = snapshot;
            }
        }
        Some(selected)
    }
}

impl<'a> Extend<&'a ThermalSensor> for ThermalAggregate {
    fn extend<I: IntoIterator<Item = &'a ThermalSensor>>(&mut self, sensors: I) {
        for sensor in sensors {
            self.process(sensor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeThermal;

    fn sensor(thermal: FakeThermal) -> ThermalSensor {
        let mut sensor = ThermalSensor::new(Box::new(thermal), 3);
        sensor.refresh(1.0);
        sensor
    }

    #[test]
    fn test_snapshot_math() {
        let snapshot = ThermalSnapshot::new("cpu", 80.0, 70.0, 95.0);
        assert_eq!(snapshot.delta, 10.0);
        assert!((snapshot.deltap - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_ceiling_is_lower_threshold() {
        let mut aggregate = ThermalAggregate::new(0.0, 0.8);
        aggregate.process(&sensor(FakeThermal::configured("cpu", 80.0, 70.0, 100.0, 95.0)));
        assert_eq!(aggregate.snapshots()[0].ceiling, 95.0);
    }

    #[test]
    fn test_offset_applied_to_target() {
        let mut aggregate = ThermalAggregate::new(-5.0, 0.8);
        aggregate.process(&sensor(FakeThermal::configured("cpu", 80.0, 70.0, 95.0, 100.0)));
        let snapshot = &aggregate.snapshots()[0];
        assert_eq!(snapshot.target, 65.0);
        assert_eq!(snapshot.delta, 15.0);
    }

    #[test]
    fn test_target_falls_back_to_factor() {
        let thermal = FakeThermal::new("asic")
            .with_temperature(50.0)
            .with_thresholds(Some(100.0), Some(110.0));
        let mut aggregate = ThermalAggregate::new(0.0, 0.8);
        aggregate.process(&sensor(thermal));
        assert_eq!(aggregate.snapshots()[0].target, 80.0);
    }

    #[test]
    fn test_configured_target_wins() {
        let mut config = CoolingConfig::default();
        config.sensor_targets.insert("cpu".to_string(), 60.0);
        config.target_offset = 2.0;
        let mut aggregate = ThermalAggregate::for_config(&config);
        aggregate.process(&sensor(FakeThermal::configured("cpu", 80.0, 70.0, 95.0, 100.0)));
        assert_eq!(aggregate.snapshots()[0].target, 62.0);
    }

    #[test]
    fn test_invalid_sensor_skipped() {
        let thermal = FakeThermal::new("psu").with_thresholds(Some(95.0), Some(100.0));
        let mut aggregate = ThermalAggregate::new(0.0, 0.8);
        aggregate.process(&sensor(thermal));
        assert!(aggregate.snapshots().is_empty());
        assert!(aggregate.choose().is_none());
        assert!(!aggregate.is_overheat());
    }

    #[test]
    fn test_zero_threshold_skipped() {
        let mut aggregate = ThermalAggregate::new(0.0, 0.8);
        aggregate.process(&sensor(FakeThermal::configured("dead", 40.0, 70.0, 0.0, 100.0)));
        aggregate.process(&sensor(FakeThermal::configured("untargeted", 40.0, 0.0, 95.0, 100.0)));
        assert!(aggregate.snapshots().is_empty());
        assert!(!aggregate.is_overheat());
    }

    #[test]
    fn test_overheat_is_sticky() {
        let mut aggregate = ThermalAggregate::new(0.0, 0.8);
        aggregate.process(&sensor(FakeThermal::configured("hot", 97.0, 70.0, 95.0, 100.0)));
        aggregate.process(&sensor(FakeThermal::configured("cool", 40.0, 70.0, 95.0, 100.0)));
        assert!(aggregate.is_overheat());
        assert_eq!(aggregate.snapshots().len(), 2);
    }

    #[test]
    fn test_target_above_ceiling_flags_overheat_but_skips() {
        let mut aggregate = ThermalAggregate::new(0.0, 0.8);
        aggregate.process(&sensor(FakeThermal::configured("odd", 97.0, 96.0, 95.0, 100.0)));
        assert!(aggregate.is_overheat());
        assert!(aggregate.snapshots().is_empty());
    }

    #[test]
    fn test_choose_highest_deltap() {
        let sensors = vec![
            sensor(FakeThermal::configured("a", 75.0, 70.0, 95.0, 100.0)),
            sensor(FakeThermal::configured("b", 90.0, 70.0, 95.0, 100.0)),
            sensor(FakeThermal::configured("c", 60.0, 70.0, 95.0, 100.0)),
        ];
        let mut aggregate = ThermalAggregate::new(0.0, 0.8);
        aggregate.extend(sensors.iter());
        assert_eq!(aggregate.choose().map(|s| s.sensor.as_str()), Some("b"));
    }

    #[test]
    fn test_choose_tie_first_wins() {
        let sensors = vec![
            sensor(FakeThermal::configured("first", 80.0, 70.0, 95.0, 100.0)),
            sensor(FakeThermal::configured("second", 80.0, 70.0, 95.0, 100.0)),
        ];
        let mut aggregate = ThermalAggregate::new(0.0, 0.8);
        aggregate.extend(sensors.iter());
        assert_eq!(aggregate.choose().map(|s| s.sensor.as_str()), Some("first"));
    }
}
