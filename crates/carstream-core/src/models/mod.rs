//! Data models shared by the acquisition and streaming layers

mod reading;
mod sim;
mod status;

pub use reading::Reading;
pub use sim::{SimConfig, SimParams};
pub use status::AcquisitionStatus;
