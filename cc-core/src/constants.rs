//! Constants and configuration defaults for chassis cooling
//!
//! Centralizes all magic numbers, paths, and configuration defaults.
//! Never use magic numbers in other files - add them here first.

/// System paths
pub mod paths {
    /// Base path for hwmon devices
    pub const HWMON_BASE: &str = "/sys/class/hwmon";

    /// Configuration directory
    pub const CONFIG_DIR: &str = "/etc/chassis-cooling";

    /// Cooling configuration file
    pub const CONFIG_FILE: &str = "cooling.json";

    /// Suffix appended to the zone name for CSV export files
    pub const EXPORT_SUFFIX: &str = ".cooling.csv";

    /// Path to the systemd journal socket
    pub const JOURNAL_SOCKET: &str = "/run/systemd/journal/socket";

    /// Full path of the default configuration file
    pub fn default_config_path() -> std::path::PathBuf {
        std::path::Path::new(CONFIG_DIR).join(CONFIG_FILE)
    }
}

/// Fan speed limits (percent)
pub mod speed {
    /// Maximum fan speed; also the fail-safe speed
    pub const MAX_SPEED: f32 = 100.0;
}

/// PWM constants
pub mod pwm {
    /// Maximum raw PWM duty cycle value
    pub const MAX_VALUE: u8 = 255;

    /// Convert a speed in percent to a raw duty cycle, clamped to 0-255
    pub fn from_percent(percent: f32) -> u8 {
        let clamped = percent.clamp(0.0, 100.0);
        (clamped / 100.0 * MAX_VALUE as f32).round() as u8
    }

    /// Convert a raw duty cycle to a speed in percent
    pub fn to_percent(value: u8) -> f32 {
        value as f32 / MAX_VALUE as f32 * 100.0
    }

    /// PWM enable modes
    pub mod enable {
        /// Manual control mode
        pub const MANUAL: u8 = 1;
    }
}

/// Temperature conversion
pub mod temperature {
    /// Divisor to convert millidegrees to degrees
    pub const MILLIDEGREE_DIVISOR: f32 = 1000.0;
}

/// Cooling algorithm defaults
pub mod cooling {
    /// Name of the single zone every controller starts with
    pub const SYSTEM_ZONE: &str = "System";

    /// Name of the zone-level commanded speed history
    pub const ZONE_SPEED_HISTORY: &str = "target";

    /// Nominal tick period in seconds
    pub const DEFAULT_INTERVAL_SECS: f64 = 60.0;

    /// Default speed floor in percent
    pub const DEFAULT_MIN_SPEED: f32 = 30.0;

    /// Default maximum decrease per nominal interval (percent)
    pub const DEFAULT_MAX_DECREASE: f32 = 10.0;

    /// Default maximum increase per nominal interval (percent)
    pub const DEFAULT_MAX_INCREASE: f32 = 20.0;

    /// Default offset added to every sensor target (degrees)
    pub const DEFAULT_TARGET_OFFSET: f32 = 0.0;

    /// Default lower edge of the hysteresis band, in percent of deltap
    pub const DEFAULT_DEADBAND_LOW: f32 = -10.0;

    /// Default upper edge of the hysteresis band, in percent of deltap
    pub const DEFAULT_DEADBAND_HIGH: f32 = 10.0;

    /// Default number of samples kept per history stream
    pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

    /// Smallest history capacity allowed
    pub const MIN_HISTORY_CAPACITY: usize = 3;

    /// Target as a fraction of the overheat threshold when a sensor has none
    pub const DEFAULT_TARGET_FACTOR: f32 = 0.8;
}
