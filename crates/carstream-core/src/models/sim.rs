//! Synthetic generator parameters

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunable simulation parameters for a vehicle profile.
///
/// Every field is optional. Absent, zero or negative values fall back to
/// the defaults documented on [`SimParams`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Generator tick period in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_rpm: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redline_rpm: Option<u32>,
    /// Baseline coolant temperature in °C
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_temp_c: Option<i32>,
    /// Fuel volume at generator start (litres)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuel_start_l: Option<f32>,
    /// Fuel volume after a simulated refuel (litres)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuel_reset_l: Option<f32>,
    /// Fuel volume that triggers a refuel (litres)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuel_min_l: Option<f32>,
}

/// Fully resolved simulation parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SimParams {
    pub period: Duration,
    pub idle_rpm: f64,
    pub redline_rpm: f64,
    pub base_temp_c: f64,
    pub fuel_start_l: f64,
    pub fuel_reset_l: f64,
    pub fuel_min_l: f64,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(50),
            idle_rpm: 750.0,
            redline_rpm: 7000.0,
            base_temp_c: 86.0,
            fuel_start_l: 42.0,
            fuel_reset_l: 45.0,
            fuel_min_l: 8.0,
        }
    }
}

impl SimConfig {
    /// The stock parameters, spelled out explicitly
    pub fn stock() -> Self {
        Self {
            period_ms: Some(50),
            idle_rpm: Some(750),
            redline_rpm: Some(7000),
            base_temp_c: Some(86),
            fuel_start_l: Some(42.0),
            fuel_reset_l: Some(45.0),
            fuel_min_l: Some(8.0),
        }
    }

    /// Resolve optional fields against the defaults
    pub fn resolve(&self) -> SimParams {
        let defaults = SimParams::default();

        SimParams {
            period: self
                .period_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.period),
            idle_rpm: positive(self.idle_rpm.map(f64::from)).unwrap_or(defaults.idle_rpm),
            redline_rpm: positive(self.redline_rpm.map(f64::from))
                .unwrap_or(defaults.redline_rpm),
            base_temp_c: positive(self.base_temp_c.map(f64::from))
                .unwrap_or(defaults.base_temp_c),
            fuel_start_l: positive(self.fuel_start_l.map(f64::from))
                .unwrap_or(defaults.fuel_start_l),
            fuel_reset_l: positive(self.fuel_reset_l.map(f64::from))
                .unwrap_or(defaults.fuel_reset_l),
            fuel_min_l: positive(self.fuel_min_l.map(f64::from)).unwrap_or(defaults.fuel_min_l),
        }
    }

    /// Return a copy where every field set in `overrides` replaces ours
    pub fn overlay(&self, overrides: &SimConfig) -> SimConfig {
        SimConfig {
            period_ms: overrides.period_ms.or(self.period_ms),
            idle_rpm: overrides.idle_rpm.or(self.idle_rpm),
            redline_rpm: overrides.redline_rpm.or(self.redline_rpm),
            base_temp_c: overrides.base_temp_c.or(self.base_temp_c),
            fuel_start_l: overrides.fuel_start_l.or(self.fuel_start_l),
            fuel_reset_l: overrides.fuel_reset_l.or(self.fuel_reset_l),
            fuel_min_l: overrides.fuel_min_l.or(self.fuel_min_l),
        }
    }
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v > 0.0)
}
