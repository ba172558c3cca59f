//! Data layer
//!
//! Configuration snapshot and input validation.

pub mod config;
pub mod validation;

pub use config::{load_config, CoolingConfig};
pub use validation::{validate_non_negative, validate_percentage, validate_positive};
