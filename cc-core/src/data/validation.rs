//! Input validation for cooling configuration values

use crate::error::{CoolingError, Result};

/// Validates that a percentage is finite and within 0.0-100.0
pub fn validate_percentage(field: &str, value: f32) -> Result<f32> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(CoolingError::invalid_config(
            field,
            format!("{} is not a percentage (0.0-100.0)", value),
        ));
    }
    Ok(value)
}

/// Validates that a value is finite and not negative
pub fn validate_non_negative(field: &str, value: f32) -> Result<f32> {
    if !value.is_finite() || value < 0.0 {
        return Err(CoolingError::invalid_config(
            field,
            format!("{} must be a finite value >= 0", value),
        ));
    }
    Ok(value)
}

/// Validates that a value is finite and strictly positive
pub fn validate_positive(field: &str, value: f64) -> Result<f64> {
    if !value.is_finite() || value <= 0.0 {
        return Err(CoolingError::invalid_config(
            field,
            format!("{} must be a finite value > 0", value),
        ));
    }
    Ok(value)
}
