//! Application state for the streaming API

use std::sync::Arc;
use std::time::Duration;

use carstream_can::AcquisitionEngine;
use carstream_core::ProfileStore;

use crate::aggregator::StateAggregator;

/// Per-session timing
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Publish tick
    pub publish_interval: Duration,
    /// How long a client may take to send its handshake
    pub handshake_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            publish_interval: Duration::from_millis(50),
            handshake_timeout: Duration::from_secs(10),
        }
    }
}

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    engine: Arc<AcquisitionEngine>,
    aggregator: Arc<StateAggregator>,
    profiles: Arc<dyn ProfileStore>,
    session: SessionSettings,
}

impl AppState {
    pub fn new(
        engine: Arc<AcquisitionEngine>,
        aggregator: Arc<StateAggregator>,
        profiles: Arc<dyn ProfileStore>,
    ) -> Self {
        Self {
            engine,
            aggregator,
            profiles,
            session: SessionSettings::default(),
        }
    }

    pub fn with_session_settings(mut self, session: SessionSettings) -> Self {
        self.session = session;
        self
    }

    pub fn engine(&self) -> &Arc<AcquisitionEngine> {
        &self.engine
    }

    pub fn aggregator(&self) -> &Arc<StateAggregator> {
        &self.aggregator
    }

    pub fn profiles(&self) -> &Arc<dyn ProfileStore> {
        &self.profiles
    }

    pub fn session(&self) -> &SessionSettings {
        &self.session
    }
}
