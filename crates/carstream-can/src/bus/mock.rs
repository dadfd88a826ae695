//! Mock bus connector for testing

use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::{BusConnector, BusError, CanBus, CanFrame};

/// In-process bus fed through a [`MockBusHandle`]
///
/// Each `open` takes the receiving end, so a connector serves one
/// successful open. Use [`MockConnector::failing`] to exercise the
/// simulation fallback.
pub struct MockConnector {
    rx: Mutex<Option<mpsc::UnboundedReceiver<Result<CanFrame, BusError>>>>,
    open_error: Option<String>,
}

/// Injects frames (or read errors) into an open mock bus
#[derive(Clone)]
pub struct MockBusHandle {
    tx: mpsc::UnboundedSender<Result<CanFrame, BusError>>,
}

impl MockConnector {
    pub fn new() -> (Self, MockBusHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connector = Self {
            rx: Mutex::new(Some(rx)),
            open_error: None,
        };
        (connector, MockBusHandle { tx })
    }

    /// Connector whose every open fails with `reason`
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            rx: Mutex::new(None),
            open_error: Some(reason.into()),
        }
    }
}

impl BusConnector for MockConnector {
    fn open(&self, interface: &str) -> Result<Box<dyn CanBus>, BusError> {
        if let Some(reason) = &self.open_error {
            return Err(BusError::OpenFailed {
                interface: interface.to_string(),
                reason: reason.clone(),
            });
        }

        let rx = self.rx.lock().take().ok_or_else(|| BusError::OpenFailed {
            interface: interface.to_string(),
            reason: "mock bus already opened".to_string(),
        })?;
        Ok(Box::new(MockBus { rx }))
    }
}

impl MockBusHandle {
    /// Queue a frame; returns false if the payload is not a valid frame
    /// or the bus has been dropped
    pub fn inject(&self, id: u32, payload: &[u8]) -> bool {
        match CanFrame::new(id, payload) {
            Some(frame) => self.tx.send(Ok(frame)).is_ok(),
            None => false,
        }
    }

    /// Queue a read error
    pub fn inject_error(&self, error: BusError) -> bool {
        self.tx.send(Err(error)).is_ok()
    }

    /// True once the bus side has been released
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

struct MockBus {
    rx: mpsc::UnboundedReceiver<Result<CanFrame, BusError>>,
}

impl CanBus for MockBus {
    fn read_frame(&mut self) -> Result<Option<CanFrame>, BusError> {
        match self.rx.try_recv() {
            Ok(Ok(frame)) => Ok(Some(frame)),
            Ok(Err(e)) => Err(e),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(BusError::Closed),
        }
    }
}
