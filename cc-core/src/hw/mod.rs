//! Hardware interaction modules
//!
//! Adapters that implement the `Thermal` and `Fan` capabilities on top of
//! the Linux hwmon sysfs interface.

mod hwmon;

pub use hwmon::{discover, HwmonFan, HwmonInventory, HwmonThermal};
