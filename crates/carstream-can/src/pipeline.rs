//! Per-frame routing: decode, speed filter, publish

use std::sync::Arc;

use carstream_core::{DecodeError, Decoded, VehicleProfile};
use tokio::time::Instant;

use crate::bus::CanFrame;
use crate::sink::ReadingSink;
use crate::speed::SpeedEstimator;

pub struct FramePipeline {
    profile: Arc<VehicleProfile>,
    speed: SpeedEstimator,
    sink: ReadingSink,
}

impl FramePipeline {
    pub fn new(profile: Arc<VehicleProfile>, speed: SpeedEstimator, sink: ReadingSink) -> Self {
        Self {
            profile,
            speed,
            sink,
        }
    }

    /// Handle one frame. Unknown ids and malformed payloads are absorbed.
    pub fn handle_frame(&mut self, frame: &CanFrame, now: Instant) {
        match self.profile.decode(frame.id(), frame.payload()) {
            Ok(Decoded::SpeedCounter(counter)) => {
                if let Some(kmh) = self.speed.update(counter, now) {
                    self.sink.emit("speedKmh", kmh);
                }
            }
            Ok(Decoded::Quantities(values)) => {
                for (name, value) in values {
                    self.sink.emit(name, value);
                }
            }
            Err(DecodeError::UnknownFrame(_)) => {}
            Err(e) => {
                tracing::debug!(
                    error = %e,
                    payload = %hex::encode(frame.payload()),
                    "Dropped undecodable frame"
                );
            }
        }
    }
}
