//! carstream-core - Core types for the carstream CAN bridge
//!
//! This crate holds everything that is pure data: the reading and status
//! models, the per-vehicle decode tables and the profile store that maps
//! an opaque model id to a [`VehicleProfile`].
//!
//! # Decode pipeline
//!
//! ```text
//! CAN frame (id, payload)
//!        │
//!        ▼
//! VehicleProfile::decode ──► Decoded::SpeedCounter(u16) ──► speed estimator
//!        │
//!        └──────────────────► Decoded::Quantities([...])  ──► readings
//! ```

pub mod decode;
pub mod error;
pub mod models;
pub mod profile;
pub mod profiles;
pub mod store;

pub use decode::{Decoded, Decoder};
pub use error::{parse_model_id, DecodeError, ProfileError};
pub use models::{AcquisitionStatus, Reading, SimConfig, SimParams};
pub use profile::{SignalEntry, VehicleProfile, VehicleProfileBuilder};
pub use profiles::{builtin_profile, BMW_E87_MODEL_ID};
pub use store::{InMemoryProfileStore, ProfileStore};
