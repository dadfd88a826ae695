//! Acquisition health status

use serde::{Deserialize, Serialize};

/// Health of the acquisition engine as surfaced to clients.
///
/// `healthy` is only true while a real bus is attached. Simulation is
/// reported as unhealthy with detail `simulated` so that synthetic data is
/// always distinguishable from live data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquisitionStatus {
    pub healthy: bool,
    pub detail: String,
}

impl AcquisitionStatus {
    pub const NOT_STARTED: &'static str = "not started";
    pub const SIMULATED: &'static str = "simulated";
    pub const STOPPED: &'static str = "stopped";
    pub const DISCONNECTED: &'static str = "disconnected";

    /// Live bus attached
    pub fn healthy() -> Self {
        Self {
            healthy: true,
            detail: String::new(),
        }
    }

    /// Unhealthy with the given detail
    pub fn unhealthy(detail: impl Into<String>) -> Self {
        Self {
            healthy: false,
            detail: detail.into(),
        }
    }

    pub fn not_started() -> Self {
        Self::unhealthy(Self::NOT_STARTED)
    }

    pub fn simulated() -> Self {
        Self::unhealthy(Self::SIMULATED)
    }

    pub fn stopped() -> Self {
        Self::unhealthy(Self::STOPPED)
    }

    pub fn disconnected() -> Self {
        Self::unhealthy(Self::DISCONNECTED)
    }

    /// Bus could not be opened
    pub fn unavailable(detail: impl std::fmt::Display) -> Self {
        Self::unhealthy(format!("unavailable: {}", detail))
    }

    pub fn is_simulated(&self) -> bool {
        !self.healthy && self.detail == Self::SIMULATED
    }
}

impl Default for AcquisitionStatus {
    fn default() -> Self {
        Self::not_started()
    }
}
