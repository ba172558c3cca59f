//! Bounded per-object history
//!
//! Every fan, sensor and zone keeps two fixed-capacity FIFO streams: values
//! read back from hardware ("measured") and values written to it
//! ("commanded"). Once a stream is full the oldest sample is evicted.

use std::collections::VecDeque;

use serde::Serialize;

use crate::constants::cooling::MIN_HISTORY_CAPACITY;

/// Seconds on the controller's monotonic clock
pub type Timestamp = f64;

/// One timestamped value
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub timestamp: Timestamp,
    pub value: f32,
}

/// Which stream a sample belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Measured,
    Commanded,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Measured => "measured",
            Operation::Commanded => "commanded",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only copy of a history, for export and diagnostics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistorySnapshot {
    pub name: String,
    pub measured: Vec<Sample>,
    pub commanded: Vec<Sample>,
}

/// Fixed-capacity measured/commanded log for one object
#[derive(Debug, Clone)]
pub struct BoundedHistory {
    name: String,
    capacity: usize,
    measured: VecDeque<Sample>,
    commanded: VecDeque<Sample>,
}

impl BoundedHistory {
    /// Capacities below the minimum are raised to it
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        let capacity = capacity.max(MIN_HISTORY_CAPACITY);
        Self {
            name: name.into(),
            capacity,
            measured: VecDeque::with_capacity(capacity + 1),
            commanded: VecDeque::with_capacity(capacity + 1),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Change the capacity, dropping the oldest samples when it shrinks
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(MIN_HISTORY_CAPACITY);
        truncate_front(&mut self.measured, self.capacity);
        truncate_front(&mut self.commanded, self.capacity);
    }

    /// Append a measured value and return it unchanged
    pub fn record_measured(&mut self, timestamp: Timestamp, value: f32) -> f32 {
        push_bounded(&mut self.measured, self.capacity, Sample { timestamp, value });
        value
    }

    /// Append a commanded value and return it unchanged
    pub fn record_commanded(&mut self, timestamp: Timestamp, value: f32) -> f32 {
        push_bounded(&mut self.commanded, self.capacity, Sample { timestamp, value });
        value
    }

    pub fn last_measured(&self) -> Option<f32> {
        self.measured.back().map(|s| s.value)
    }

    pub fn last_commanded(&self) -> Option<f32> {
        self.commanded.back().map(|s| s.value)
    }

    pub fn last_measured_sample(&self) -> Option<Sample> {
        self.measured.back().copied()
    }

    pub fn last_commanded_sample(&self) -> Option<Sample> {
        self.commanded.back().copied()
    }

    /// Measured value `n` samples from the end, 1 being the most recent
    pub fn nth_from_end_measured(&self, n: usize) -> Option<f32> {
        if n == 0 || n > self.measured.len() {
            return None;
        }
        self.measured.get(self.measured.len() - n).map(|s| s.value)
    }

    pub fn measured(&self) -> impl Iterator<Item = &Sample> {
        self.measured.iter()
    }

    pub fn commanded(&self) -> impl Iterator<Item = &Sample> {
        self.commanded.iter()
    }

    pub fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot {
            name: self.name.clone(),
            measured: self.measured.iter().copied().collect(),
            commanded: self.commanded.iter().copied().collect(),
        }
    }
}

fn push_bounded(stream: &mut VecDeque<Sample>, capacity: usize, sample: Sample) {
    stream.push_back(sample);
    truncate_front(stream, capacity);
}

fn truncate_front(stream: &mut VecDeque<Sample>, capacity: usize) {
    while stream.len() > capacity {
        stream.pop_front();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eviction_keeps_newest() {
        let mut history = BoundedHistory::new("fan1", 3);
        for (ts, value) in [(1.0, 10.0), (2.0, 20.0), (3.0, 30.0), (4.0, 40.0)] {
            history.record_measured(ts, value);
        }

        let snapshot = history.snapshot();
        assert_eq!(
            snapshot.measured,
            vec![
                Sample { timestamp: 2.0, value: 20.0 },
                Sample { timestamp: 3.0, value: 30.0 },
                Sample { timestamp: 4.0, value: 40.0 },
            ]
        );
        assert!(snapshot.commanded.is_empty());
    }

    #[test]
    fn test_length_stays_at_capacity() {
        let mut history = BoundedHistory::new("temp1", 5);
        for i in 0..12 {
            history.record_commanded(i as f64, i as f32);
        }
        let values: Vec<f32> = history.commanded().map(|s| s.value).collect();
        assert_eq!(values, vec![7.0, 8.0, 9.0, 10.0, 11.0]);
    }

    #[test]
    fn test_capacity_floor() {
        let history = BoundedHistory::new("tiny", 1);
        assert_eq!(history.capacity(), MIN_HISTORY_CAPACITY);
    }

    #[test]
    fn test_set_capacity_shrinks_and_grows() {
        let mut history = BoundedHistory::new("fan1", 5);
        for i in 0..5 {
            history.record_measured(i as f64, i as f32);
            history.record_commanded(i as f64, i as f32 * 10.0);
        }

        history.set_capacity(3);
        assert_eq!(history.capacity(), 3);
        let measured: Vec<f32> = history.measured().map(|s| s.value).collect();
        assert_eq!(measured, vec![2.0, 3.0, 4.0]);
        let commanded: Vec<f32> = history.commanded().map(|s| s.value).collect();
        assert_eq!(commanded, vec![20.0, 30.0, 40.0]);

        history.set_capacity(6);
        for i in 5..8 {
            history.record_measured(i as f64, i as f32);
        }
        assert_eq!(history.measured().count(), 6);
        assert_eq!(history.last_measured(), Some(7.0));

        history.set_capacity(0);
        assert_eq!(history.capacity(), MIN_HISTORY_CAPACITY);
    }

    #[test]
    fn test_record_returns_value() {
        let mut history = BoundedHistory::new("fan1", 3);
        assert_eq!(history.record_measured(1.0, 42.5), 42.5);
        assert_eq!(history.record_commanded(1.0, 60.0), 60.0);
    }

    #[test]
    fn test_last_values_empty() {
        let history = BoundedHistory::new("fan1", 3);
        assert_eq!(history.last_measured(), None);
        assert_eq!(history.last_commanded(), None);
        assert_eq!(history.nth_from_end_measured(1), None);
    }

    #[test]
    fn test_nth_from_end() {
        let mut history = BoundedHistory::new("fan1", 4);
        history.record_measured(1.0, 10.0);
        assert_eq!(history.nth_from_end_measured(1), Some(10.0));
        assert_eq!(history.nth_from_end_measured(2), None);

        history.record_measured(2.0, 20.0);
        assert_eq!(history.nth_from_end_measured(1), Some(20.0));
        assert_eq!(history.nth_from_end_measured(2), Some(10.0));
        assert_eq!(history.nth_from_end_measured(0), None);
    }

    #[test]
    fn test_streams_independent() {
        let mut history = BoundedHistory::new("fan1", 3);
        history.record_measured(1.0, 33.0);
        history.record_commanded(1.5, 50.0);
        assert_eq!(history.last_measured(), Some(33.0));
        assert_eq!(history.last_commanded(), Some(50.0));
        assert_eq!(
            history.last_commanded_sample(),
            Some(Sample { timestamp: 1.5, value: 50.0 })
        );
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut history = BoundedHistory::new("fan1", 3);
        history.record_commanded(2.0, 70.0);
        let json = serde_json::to_value(history.snapshot()).unwrap();
        assert_eq!(json["name"], "fan1");
        assert_eq!(json["commanded"][0]["value"], 70.0);
        assert_eq!(serde_json::to_value(Operation::Measured).unwrap(), "measured");
    }
}
