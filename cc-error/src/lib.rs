//! Unified error handling for chassis cooling
//!
//! This crate provides the single error type used by the cooling core and
//! the daemon. Control ticks never surface these errors; they are returned by
//! configuration loading, hardware adapters and export sinks.

use std::io;
use std::path::PathBuf;

/// Result type alias using CoolingError
pub type Result<T> = std::result::Result<T, CoolingError>;

/// Unified error type for all cooling operations
#[derive(thiserror::Error, Debug)]
pub enum CoolingError {
    // ============================================================================
    // I/O and File System Errors
    // ============================================================================
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: io::Error,
    },

    // ============================================================================
    // Hardware Access Errors
    // ============================================================================
    #[error("Failed to read temperature from {path}: {reason}")]
    TemperatureRead {
        path: PathBuf,
        reason: String,
    },

    #[error("Failed to read fan speed from {path}: {reason}")]
    FanRead {
        path: PathBuf,
        reason: String,
    },

    #[error("Failed to write PWM to {path}: {reason}")]
    PwmWrite {
        path: PathBuf,
        reason: String,
    },

    #[error("Hardware not found: {0}")]
    HardwareNotFound(String),

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidConfig {
        field: String,
        reason: String,
    },

    // ============================================================================
    // Export Errors
    // ============================================================================
    #[error("Export to {path} failed: {source}")]
    Export {
        path: PathBuf,
        source: io::Error,
    },

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Generic(String),
}

impl CoolingError {
    /// Create a generic error from a string
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic(msg.into())
    }

    /// Create an invalid configuration value error
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// True for errors raised by a hardware read or write
    pub fn is_hardware(&self) -> bool {
        matches!(
            self,
            Self::TemperatureRead { .. }
                | Self::FanRead { .. }
                | Self::PwmWrite { .. }
                | Self::HardwareNotFound(_)
        )
    }
}

// Allow converting from String to CoolingError
impl From<String> for CoolingError {
    fn from(s: String) -> Self {
        Self::Generic(s)
    }
}

// Allow converting from &str to CoolingError
impl From<&str> for CoolingError {
    fn from(s: &str) -> Self {
        Self::Generic(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_display() {
        let err = CoolingError::invalid_config("min_speed", "must be within 0-100");
        assert_eq!(
            err.to_string(),
            "Invalid configuration value for min_speed: must be within 0-100"
        );
    }

    #[test]
    fn test_hardware_classification() {
        let err = CoolingError::PwmWrite {
            path: PathBuf::from("/sys/class/hwmon/hwmon0/pwm1"),
            reason: "EIO".to_string(),
        };
        assert!(err.is_hardware());
        assert!(!CoolingError::invalid_config("min_speed", "bad").is_hardware());
    }

    #[test]
    fn test_from_str() {
        let err: CoolingError = "boom".into();
        assert!(matches!(err, CoolingError::Generic(ref s) if s == "boom"));
    }
}
