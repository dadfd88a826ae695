//! Daemon configuration
//!
//! Every section is optional; an empty file (or no file) yields a daemon
//! that listens on `0.0.0.0:8080`, tries `can0` and knows the built-in
//! vehicle profiles.
//!
//! ```toml
//! [server]
//! listen = "0.0.0.0:8080"
//! publish_interval_ms = 50
//!
//! [can]
//! interface = "can0"
//! mode = "auto"          # or "simulation"
//!
//! [speed]
//! emit_interval_ms = 100
//!
//! [[vehicles]]
//! model_id = "0x4321"
//! profile = "bmw_e87"
//!
//! [vehicles.sim]
//! redline_rpm = 6500
//! ```

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use carstream_api::SessionSettings;
use carstream_can::{AcquisitionMode, EngineSettings, SpeedFilterConfig};
use carstream_core::{builtin_profile, parse_model_id, InMemoryProfileStore, SimConfig};
use serde::{Deserialize, Serialize};

/// Complete daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub can: CanConfig,

    /// Speed filter thresholds
    #[serde(default)]
    pub speed: SpeedFilterConfig,

    /// Extra model id bindings on top of the built-in ones
    #[serde(default)]
    pub vehicles: Vec<VehicleConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_publish_interval_ms")]
    pub publish_interval_ms: u64,

    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_publish_interval_ms() -> u64 {
    50
}

fn default_handshake_timeout_ms() -> u64 {
    10_000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            publish_interval_ms: default_publish_interval_ms(),
            handshake_timeout_ms: default_handshake_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanConfig {
    #[serde(default = "default_interface")]
    pub interface: String,

    #[serde(default)]
    pub mode: AcquisitionMode,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default = "default_stop_grace_ms")]
    pub stop_grace_ms: u64,
}

fn default_interface() -> String {
    "can0".to_string()
}

fn default_queue_capacity() -> usize {
    400
}

fn default_stop_grace_ms() -> u64 {
    200
}

impl Default for CanConfig {
    fn default() -> Self {
        Self {
            interface: default_interface(),
            mode: AcquisitionMode::default(),
            queue_capacity: default_queue_capacity(),
            stop_grace_ms: default_stop_grace_ms(),
        }
    }
}

/// Binds a model id to a built-in profile, optionally retuning its
/// simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleConfig {
    /// Hex ("0x1234") or decimal
    pub model_id: String,

    /// Built-in profile name (e.g. "bmw_e87")
    pub profile: String,

    #[serde(default)]
    pub sim: SimConfig,
}

impl DaemonConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Apply command-line overrides
    pub fn apply_overrides(
        &mut self,
        listen: Option<String>,
        interface: Option<String>,
        simulate: bool,
    ) {
        if let Some(listen) = listen {
            self.server.listen = listen;
        }
        if let Some(interface) = interface {
            self.can.interface = interface;
        }
        if simulate {
            self.can.mode = AcquisitionMode::Simulation;
        }
    }

    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        self.server
            .listen
            .parse()
            .with_context(|| format!("Invalid listen address: {}", self.server.listen))
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            interface: self.can.interface.clone(),
            mode: self.can.mode,
            queue_capacity: self.can.queue_capacity,
            stop_grace: Duration::from_millis(self.can.stop_grace_ms),
            speed: self.speed.clone(),
        }
    }

    pub fn session_settings(&self) -> SessionSettings {
        let defaults = SessionSettings::default();
        SessionSettings {
            publish_interval: non_zero_ms(self.server.publish_interval_ms)
                .unwrap_or(defaults.publish_interval),
            handshake_timeout: non_zero_ms(self.server.handshake_timeout_ms)
                .unwrap_or(defaults.handshake_timeout),
        }
    }

    /// Built-in profiles plus every `[[vehicles]]` binding
    pub fn build_store(&self) -> anyhow::Result<InMemoryProfileStore> {
        let mut store = InMemoryProfileStore::with_builtin()?;

        for vehicle in &self.vehicles {
            let model_id = parse_model_id(&vehicle.model_id)?;
            let profile = builtin_profile(&vehicle.profile)
                .with_context(|| format!("Vehicle {}", vehicle.model_id))?
                .with_sim_overrides(&vehicle.sim);
            store.register(model_id, profile);
        }

        Ok(store)
    }
}

fn non_zero_ms(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}
