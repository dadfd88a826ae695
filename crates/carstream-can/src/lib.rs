//! carstream-can - CAN acquisition for carstream
//!
//! Owns everything between the physical bus and the reading queue:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    AcquisitionEngine                     │
//! │   start / stop / status, one run per generation          │
//! │                                                          │
//! │   ┌──────────────┐   bus open fails   ┌──────────────┐   │
//! │   │  bus run     │ ─────────────────► │  simulation  │   │
//! │   │ (CanBus)     │                    │ (Simulator)  │   │
//! │   └──────┬───────┘                    └──────┬───────┘   │
//! │          │ FramePipeline                     │           │
//! │          │ (decode + SpeedEstimator)         │           │
//! │          └──────────────┬────────────────────┘           │
//! │                         ▼                                │
//! │                   ReadingSink (bounded, drop on full)    │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod bus;
pub mod engine;
pub mod pipeline;
pub mod signal;
pub mod sim;
pub mod sink;
pub mod speed;

pub use bus::mock::{MockBusHandle, MockConnector};
pub use bus::{default_connector, BusConnector, BusError, CanBus, CanFrame};
pub use engine::{AcquisitionEngine, AcquisitionMode, EngineSettings, EngineState};
pub use pipeline::FramePipeline;
pub use sim::{SimSample, Simulator};
pub use sink::ReadingSink;
pub use speed::{SpeedEstimator, SpeedFilterConfig};
