//! Latest-value snapshot with change tracking

use std::collections::BTreeMap;
use std::sync::Arc;

use carstream_core::{AcquisitionStatus, Reading};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Snapshot key carrying the health flag
pub const KEY_CAN_OK: &str = "can_ok";
/// Snapshot key carrying the error detail, present only when unhealthy
pub const KEY_CAN_ERR: &str = "can_err";

/// A value in the published snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SnapshotValue {
    Float(f32),
    Flag(u8),
    Text(String),
}

#[derive(Debug, Default)]
struct Snapshot {
    values: BTreeMap<String, SnapshotValue>,
    dirty: bool,
}

impl Snapshot {
    /// Insert and report whether the stored value changed
    fn replace(&mut self, key: &str, value: SnapshotValue) -> bool {
        match self.values.get(key) {
            Some(existing) if *existing == value => false,
            _ => {
                self.values.insert(key.to_string(), value);
                true
            }
        }
    }
}

/// Shared state between the reading consumer and the publish loop.
///
/// Every operation takes the lock briefly; nothing holds it across an
/// await.
#[derive(Debug, Default)]
pub struct StateAggregator {
    inner: Mutex<Snapshot>,
}

impl StateAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the named value and mark the snapshot dirty
    pub fn merge(&self, reading: &Reading) {
        let mut snapshot = self.inner.lock();
        snapshot
            .values
            .insert(reading.name.clone(), SnapshotValue::Float(reading.value));
        snapshot.dirty = true;
    }

    /// Mirror the acquisition status into `can_ok` / `can_err`.
    ///
    /// Only marks the snapshot dirty when one of the two fields changed.
    pub fn refresh_health(&self, status: &AcquisitionStatus) {
        let mut snapshot = self.inner.lock();

        let mut changed = snapshot.replace(KEY_CAN_OK, SnapshotValue::Flag(u8::from(status.healthy)));
        if status.healthy {
            changed |= snapshot.values.remove(KEY_CAN_ERR).is_some();
        } else {
            changed |= snapshot.replace(KEY_CAN_ERR, SnapshotValue::Text(status.detail.clone()));
        }

        if changed {
            snapshot.dirty = true;
        }
    }

    /// Read and clear the dirty flag
    pub fn take_dirty(&self) -> bool {
        std::mem::take(&mut self.inner.lock().dirty)
    }

    /// Serialize the snapshot if it changed since the last call.
    ///
    /// Clears the dirty flag. Returns `Ok(None)` when nothing changed or
    /// the snapshot is empty.
    pub fn take_update(&self) -> Result<Option<String>, serde_json::Error> {
        let mut snapshot = self.inner.lock();
        let dirty = std::mem::take(&mut snapshot.dirty);
        if !dirty || snapshot.values.is_empty() {
            return Ok(None);
        }
        serde_json::to_string(&snapshot.values).map(Some)
    }

    pub fn get(&self, key: &str) -> Option<SnapshotValue> {
        self.inner.lock().values.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().values.is_empty()
    }

    /// Drop every value, e.g. when a new vehicle is selected
    pub fn clear(&self) {
        let mut snapshot = self.inner.lock();
        snapshot.values.clear();
        snapshot.dirty = false;
    }

    /// Merge readings from the acquisition queue until it closes
    pub fn spawn_consumer(self: Arc<Self>, mut rx: mpsc::Receiver<Reading>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(reading) = rx.recv().await {
                self.merge(&reading);
            }
            tracing::debug!("Reading queue closed, aggregator consumer exiting");
        })
    }
}
