//! Cooling control engine
//!
//! Bounded histories, the capability wrappers, per-tick thermal
//! evaluation, cooling zones and the controller that drives them.

mod clock;
mod controller;
mod export;
mod history;
mod objects;
mod thermal;
mod zone;

pub use clock::{Clock, ManualClock, MonotonicRawClock};
pub use controller::{CoolingController, RunOptions, TickReport};
pub use export::{CsvExportSink, ExportRow, ExportSink};
pub use history::{BoundedHistory, HistorySnapshot, Operation, Sample, Timestamp};
pub use objects::{Fan, FanActuator, Thermal, ThermalSensor};
pub use thermal::{ThermalAggregate, ThermalSnapshot};
pub use zone::{CoolingZone, Tick, ZoneMembers, ZoneReport};
