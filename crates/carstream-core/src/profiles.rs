//! Built-in vehicle profiles
//!
//! Frame layouts were reverse engineered from the vehicle's K-CAN/PT-CAN
//! traffic; the scale factors match the instrument cluster readouts.

use crate::decode::Decoder;
use crate::error::ProfileError;
use crate::models::SimConfig;
use crate::profile::VehicleProfile;

/// Model id the clients use for the BMW E87
pub const BMW_E87_MODEL_ID: u32 = 0x1234;

/// Names accepted by [`builtin_profile`]
pub const BUILTIN_PROFILES: &[&str] = &["bmw_e87"];

/// Resolve a built-in profile by name
pub fn builtin_profile(name: &str) -> Result<VehicleProfile, ProfileError> {
    match name {
        "bmw_e87" => bmw_e87(),
        other => Err(ProfileError::UnknownProfile(other.to_string())),
    }
}

/// BMW 1 Series (E87)
pub fn bmw_e87() -> Result<VehicleProfile, ProfileError> {
    Ok(VehicleProfile::builder("BMW E87")
        .signal(0x1A6, Decoder::SpeedCounter)?
        .signal(0x0AA, Decoder::EngineRpmThrottle)?
        .signal(0x1D0, Decoder::CoolantTemp)?
        .signal(0x349, Decoder::FuelTank)?
        .signal(0x330, Decoder::OdometerRange)?
        .signal(0x362, Decoder::AverageEconomy)?
        .sim(SimConfig::stock())
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::Decoded;

    #[test]
    fn test_bmw_e87_table() {
        let profile = bmw_e87().unwrap();
        assert_eq!(profile.display_name(), "BMW E87");
        assert_eq!(
            profile.frame_ids(),
            vec![0x0AA, 0x1A6, 0x1D0, 0x330, 0x349, 0x362]
        );
    }

    #[test]
    fn test_bmw_e87_speed_counter_frame() {
        let profile = bmw_e87().unwrap();
        let decoded = profile.decode(0x1A6, &[0xF6, 0xFF]).unwrap();
        assert_eq!(decoded, Decoded::SpeedCounter(65526));
    }

    #[test]
    fn test_unknown_builtin() {
        assert_eq!(
            builtin_profile("trabant").unwrap_err(),
            ProfileError::UnknownProfile("trabant".to_string())
        );
        for name in BUILTIN_PROFILES {
            assert!(builtin_profile(name).is_ok());
        }
    }
}
