//! Model id -> vehicle profile lookup

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ProfileError;
use crate::profile::VehicleProfile;
use crate::profiles::{self, BMW_E87_MODEL_ID};

/// Resolves the opaque model id sent in the handshake to a profile
pub trait ProfileStore: Send + Sync {
    fn get_by_model_id(&self, model_id: u32) -> Option<Arc<VehicleProfile>>;
}

/// Keyed in-memory store, populated once at startup
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    profiles: HashMap<u32, Arc<VehicleProfile>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with every built-in model id
    pub fn with_builtin() -> Result<Self, ProfileError> {
        let mut store = Self::new();
        store.register(BMW_E87_MODEL_ID, profiles::bmw_e87()?);
        Ok(store)
    }

    /// Register (or replace) the profile for a model id
    pub fn register(&mut self, model_id: u32, profile: VehicleProfile) {
        tracing::debug!(
            model_id = format!("0x{:X}", model_id),
            profile = profile.display_name(),
            "Registered vehicle profile"
        );
        self.profiles.insert(model_id, Arc::new(profile));
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl ProfileStore for InMemoryProfileStore {
    fn get_by_model_id(&self, model_id: u32) -> Option<Arc<VehicleProfile>> {
        self.profiles.get(&model_id).cloned()
    }
}
