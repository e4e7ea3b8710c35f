//! Tracker configuration parameters
//!
//! All tunable thresholds for one tracked subject.  Each subject owns its
//! own copy, so thresholds can differ per dog.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// Per-subject tracker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    // --- Fix validation ---
    /// Fixes with a larger accuracy radius (meters) are rejected
    pub max_accuracy_m: f64,
    /// Accept low-accuracy fixes flagged as degraded instead of rejecting
    pub soft_accept_low_accuracy: bool,
    /// Implied speed (km/h) above which a fix is treated as a GPS glitch
    pub max_speed_kmh: f64,

    // --- Session metrics ---
    /// Trailing window for current speed (seconds)
    pub speed_window_secs: u32,
    /// Speed (km/h) above which the subject counts as moving
    pub moving_threshold_kmh: f64,

    // --- Auto detection ---
    /// Continuous time at home before an auto walk is closed (seconds)
    pub auto_stop_dwell_secs: u32,
    /// Time without a fix before the tracker is unavailable and an auto
    /// walk is force-closed (seconds)
    pub staleness_secs: u32,
    /// Periodic tick interval (seconds)
    pub tick_interval_secs: u32,

    // --- Zones ---
    /// Smallest accepted zone radius (meters)
    pub min_zone_radius_m: f64,
    /// Largest accepted zone radius (meters)
    pub max_zone_radius_m: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            // Fix validation
            max_accuracy_m: 100.0,
            soft_accept_low_accuracy: false,
            max_speed_kmh: 130.0,

            // Session metrics
            speed_window_secs: 60,
            moving_threshold_kmh: 1.0,

            // Auto detection
            auto_stop_dwell_secs: 300,  // 5 min
            staleness_secs: 1800,       // 30 min
            tick_interval_secs: 60,

            // Zones
            min_zone_radius_m: 1.0,
            max_zone_radius_m: 10_000.0,
        }
    }
}

impl TrackerConfig {
    /// Reject inconsistent values instead of clamping them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.max_accuracy_m.is_finite() && self.max_accuracy_m > 0.0) {
            return Err(ConfigError::ValidationFailed("max_accuracy_m must be > 0"));
        }
        if !(self.max_speed_kmh.is_finite() && self.max_speed_kmh > 0.0) {
            return Err(ConfigError::ValidationFailed("max_speed_kmh must be > 0"));
        }
        if self.speed_window_secs == 0 {
            return Err(ConfigError::ValidationFailed("speed_window_secs must be > 0"));
        }
        if !(self.moving_threshold_kmh.is_finite() && self.moving_threshold_kmh >= 0.0) {
            return Err(ConfigError::ValidationFailed(
                "moving_threshold_kmh must be >= 0",
            ));
        }
        if self.tick_interval_secs == 0 {
            return Err(ConfigError::ValidationFailed("tick_interval_secs must be > 0"));
        }
        if self.staleness_secs == 0 {
            return Err(ConfigError::ValidationFailed("staleness_secs must be > 0"));
        }
        if !(self.min_zone_radius_m > 0.0 && self.min_zone_radius_m <= self.max_zone_radius_m) {
            return Err(ConfigError::ValidationFailed(
                "zone radius bounds must satisfy 0 < min <= max",
            ));
        }
        Ok(())
    }

    pub fn speed_window_ms(&self) -> u64 {
        u64::from(self.speed_window_secs) * 1000
    }

    pub fn auto_stop_dwell_ms(&self) -> u64 {
        u64::from(self.auto_stop_dwell_secs) * 1000
    }

    pub fn staleness_ms(&self) -> u64 {
        u64::from(self.staleness_secs) * 1000
    }

    pub fn tick_interval_ms(&self) -> u64 {
        u64::from(self.tick_interval_secs) * 1000
    }
}
