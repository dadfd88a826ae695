//! Vehicle profiles: the per-vehicle decode table plus simulation tuning

use std::collections::HashMap;

use crate::decode::{Decoded, Decoder};
use crate::error::{DecodeError, ProfileError};
use crate::models::SimConfig;

/// One row of the decode table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalEntry {
    pub frame_id: u32,
    pub decoder: Decoder,
}

impl SignalEntry {
    pub fn new(frame_id: u32, decoder: Decoder) -> Self {
        Self { frame_id, decoder }
    }

    pub fn decode(&self, data: &[u8]) -> Result<Decoded, DecodeError> {
        self.decoder.decode(self.frame_id, data)
    }
}

/// Immutable description of one vehicle model
#[derive(Debug, Clone)]
pub struct VehicleProfile {
    display_name: String,
    signals: HashMap<u32, SignalEntry>,
    sim: SimConfig,
}

impl VehicleProfile {
    pub fn builder(display_name: impl Into<String>) -> VehicleProfileBuilder {
        VehicleProfileBuilder {
            display_name: display_name.into(),
            signals: HashMap::new(),
            sim: SimConfig::default(),
        }
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn sim(&self) -> &SimConfig {
        &self.sim
    }

    /// Frame ids with a registered decoder, in ascending order
    pub fn frame_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.signals.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Decode a frame against this profile's table
    pub fn decode(&self, frame_id: u32, data: &[u8]) -> Result<Decoded, DecodeError> {
        self.signals
            .get(&frame_id)
            .ok_or(DecodeError::UnknownFrame(frame_id))?
            .decode(data)
    }

    /// Copy of this profile with simulation overrides applied
    pub fn with_sim_overrides(&self, overrides: &SimConfig) -> Self {
        Self {
            display_name: self.display_name.clone(),
            signals: self.signals.clone(),
            sim: self.sim.overlay(overrides),
        }
    }
}

/// Builder enforcing one entry per frame id
#[derive(Debug)]
pub struct VehicleProfileBuilder {
    display_name: String,
    signals: HashMap<u32, SignalEntry>,
    sim: SimConfig,
}

impl VehicleProfileBuilder {
    pub fn signal(mut self, frame_id: u32, decoder: Decoder) -> Result<Self, ProfileError> {
        if self.signals.contains_key(&frame_id) {
            return Err(ProfileError::DuplicateFrame(frame_id));
        }
        self.signals
            .insert(frame_id, SignalEntry::new(frame_id, decoder));
        Ok(self)
    }

    pub fn sim(mut self, sim: SimConfig) -> Self {
        self.sim = sim;
        self
    }

    pub fn build(self) -> VehicleProfile {
        VehicleProfile {
            display_name: self.display_name,
            signals: self.signals,
            sim: self.sim,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_frame_rejected() {
        let result = VehicleProfile::builder("Test")
            .signal(0x100, Decoder::CoolantTemp)
            .and_then(|b| b.signal(0x100, Decoder::FuelTank));

        assert_eq!(result.unwrap_err(), ProfileError::DuplicateFrame(0x100));
    }

    #[test]
    fn test_unknown_frame() {
        let profile = VehicleProfile::builder("Test")
            .signal(0x100, Decoder::CoolantTemp)
            .unwrap()
            .build();

        assert_eq!(
            profile.decode(0x200, &[1, 2, 3]),
            Err(DecodeError::UnknownFrame(0x200))
        );
        assert_eq!(
            profile.decode(0x100, &[58]).unwrap().get("engineTempC"),
            Some(10.0)
        );
    }

    #[test]
    fn test_sim_overrides_keep_table() {
        let profile = VehicleProfile::builder("Test")
            .signal(0x100, Decoder::CoolantTemp)
            .unwrap()
            .sim(SimConfig::stock())
            .build();

        let tuned = profile.with_sim_overrides(&SimConfig {
            idle_rpm: Some(900),
            ..Default::default()
        });

        assert_eq!(tuned.frame_ids(), vec![0x100]);
        assert_eq!(tuned.sim().idle_rpm, Some(900));
        assert_eq!(tuned.sim().redline_rpm, Some(7000));
    }
}
