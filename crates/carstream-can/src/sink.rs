//! Bounded reading queue, producer side

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use carstream_core::Reading;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Non-blocking producer handle for the reading queue
///
/// When the queue is full the new reading is dropped and counted; the
/// acquisition loop never waits on the consumer.
#[derive(Debug, Clone)]
pub struct ReadingSink {
    tx: mpsc::Sender<Reading>,
    dropped: Arc<AtomicU64>,
}

impl ReadingSink {
    pub fn new(tx: mpsc::Sender<Reading>) -> Self {
        Self {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn emit(&self, name: &str, value: f32) {
        self.send(Reading::new(name, value));
    }

    pub fn send(&self, reading: Reading) {
        match self.tx.try_send(reading) {
            Ok(()) => {}
            Err(TrySendError::Full(reading)) => {
                let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::trace!(name = %reading.name, total, "Reading queue full, dropped");
            }
            Err(TrySendError::Closed(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Readings dropped since this sink was created
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
