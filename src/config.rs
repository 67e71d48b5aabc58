//! Device configuration parameters
//!
//! All tunable timing and boot-policy parameters for the BPSLink device.
//! Values can be overridden via NVS (non-volatile storage).

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// Core device configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    // --- Button ---
    /// Edges closer than this to the previous accepted edge are bounce
    pub debounce_ms: u32,
    /// A second press must start strictly inside this gap to form a double click
    pub double_click_window_ms: u32,
    /// Holding the button at least this long is a long press
    pub long_press_ms: u32,

    // --- Task periods ---
    /// Reconcile task period (milliseconds)
    pub reconcile_period_ms: u32,
    /// Indicator task period (milliseconds)
    pub indicator_period_ms: u32,

    // --- Indicators ---
    /// Heartbeat half-period while advertising is requested
    pub heartbeat_fast_ms: u32,
    /// Heartbeat half-period otherwise
    pub heartbeat_slow_ms: u32,
    /// How long the factory-reset flash holds every LED on
    pub reset_dwell_ms: u32,

    // --- Boot policy ---
    /// Request advertising as soon as the device boots
    pub advertise_on_boot: bool,
    /// Adopt a bond found in storage at boot instead of unpairing it
    pub keep_stored_bond: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            // Button
            debounce_ms: 30,
            double_click_window_ms: 300,
            long_press_ms: 3000,

            // Task periods
            reconcile_period_ms: 10,   // 100 Hz
            indicator_period_ms: 100,  // 10 Hz

            // Indicators
            heartbeat_fast_ms: 300,
            heartbeat_slow_ms: 1500,
            reset_dwell_ms: 2000,

            // Boot policy
            advertise_on_boot: true,
            keep_stored_bond: true,
        }
    }
}

impl DeviceConfig {
    /// Range and ordering checks. Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(5..=200).contains(&self.debounce_ms) {
            return Err(ConfigError::ValidationFailed("debounce_ms must be 5–200"));
        }
        if self.double_click_window_ms <= self.debounce_ms {
            return Err(ConfigError::ValidationFailed(
                "double_click_window_ms must be > debounce_ms",
            ));
        }
        if self.long_press_ms <= self.double_click_window_ms {
            return Err(ConfigError::ValidationFailed(
                "long_press_ms must be > double_click_window_ms",
            ));
        }
        if self.long_press_ms > 30_000 {
            return Err(ConfigError::ValidationFailed("long_press_ms must be <= 30000"));
        }
        if !(1..=1000).contains(&self.reconcile_period_ms) {
            return Err(ConfigError::ValidationFailed(
                "reconcile_period_ms must be 1–1000",
            ));
        }
        if self.indicator_period_ms <= self.reconcile_period_ms {
            return Err(ConfigError::ValidationFailed(
                "indicator_period_ms must be > reconcile_period_ms",
            ));
        }
        if self.indicator_period_ms > 1000 {
            return Err(ConfigError::ValidationFailed(
                "indicator_period_ms must be <= 1000",
            ));
        }
        if self.heartbeat_fast_ms == 0 || self.heartbeat_fast_ms >= self.heartbeat_slow_ms {
            return Err(ConfigError::ValidationFailed(
                "heartbeat_fast_ms must be > 0 and < heartbeat_slow_ms",
            ));
        }
        if !(100..=10_000).contains(&self.reset_dwell_ms) {
            return Err(ConfigError::ValidationFailed(
                "reset_dwell_ms must be 100–10000",
            ));
        }
        Ok(())
    }
}
