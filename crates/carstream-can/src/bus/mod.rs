//! Bus layer for CAN frame acquisition
//!
//! This module provides bus connectors for reading raw CAN frames:
//! - SocketCAN connector for raw CAN sockets (Linux only)
//! - Mock connector for tests and demos
//! - Unsupported connector for platforms without a bus
//!
//! Reads are non-blocking so a run loop can poll its stop signal between
//! frames.

pub mod error;
pub mod mock;

#[cfg(all(target_os = "linux", feature = "socketcan"))]
pub mod socketcan;

pub use error::BusError;

use std::sync::Arc;

/// Maximum classic CAN payload
pub const MAX_DLC: usize = 8;

/// A classic CAN data frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanFrame {
    id: u32,
    data: [u8; MAX_DLC],
    len: usize,
}

impl CanFrame {
    /// Build a frame; returns None if the payload exceeds 8 bytes
    pub fn new(id: u32, payload: &[u8]) -> Option<Self> {
        if payload.len() > MAX_DLC {
            return None;
        }
        let mut data = [0u8; MAX_DLC];
        data[..payload.len()].copy_from_slice(payload);
        Some(Self {
            id,
            data,
            len: payload.len(),
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn payload(&self) -> &[u8] {
        &self.data[..self.len]
    }
}

/// An open CAN bus handle
///
/// The handle is owned by exactly one run and released when dropped.
pub trait CanBus: Send {
    /// Read the next pending frame without blocking
    ///
    /// Returns `Ok(None)` when no frame is currently available.
    fn read_frame(&mut self) -> Result<Option<CanFrame>, BusError>;
}

/// Opens bus handles by interface name
pub trait BusConnector: Send + Sync {
    fn open(&self, interface: &str) -> Result<Box<dyn CanBus>, BusError>;
}

/// Connector for platforms without CAN support; every open fails
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedConnector;

impl BusConnector for UnsupportedConnector {
    fn open(&self, _interface: &str) -> Result<Box<dyn CanBus>, BusError> {
        Err(BusError::Unsupported(
            "SocketCAN requires Linux and the 'socketcan' feature".to_string(),
        ))
    }
}

/// The real-hardware connector for the current platform
pub fn default_connector() -> Arc<dyn BusConnector> {
    #[cfg(all(target_os = "linux", feature = "socketcan"))]
    {
        Arc::new(self::socketcan::SocketCanConnector)
    }
    #[cfg(not(all(target_os = "linux", feature = "socketcan")))]
    {
        Arc::new(UnsupportedConnector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_payload() {
        let frame = CanFrame::new(0x1D0, &[134, 1, 2]).unwrap();
        assert_eq!(frame.id(), 0x1D0);
        assert_eq!(frame.payload(), &[134, 1, 2]);
    }

    #[test]
    fn test_frame_rejects_oversized_payload() {
        assert!(CanFrame::new(0x100, &[0; 9]).is_none());
    }

    #[test]
    fn test_unsupported_connector() {
        let err = UnsupportedConnector.open("can0").err().unwrap();
        assert!(matches!(err, BusError::Unsupported(_)));
    }
}
