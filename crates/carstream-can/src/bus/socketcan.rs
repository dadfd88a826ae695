//! Raw SocketCAN connector (Linux only)

use socketcan::{CanFrame as RawFrame, CanSocket, EmbeddedFrame, Frame, Socket};

use super::{BusConnector, BusError, CanBus, CanFrame};

/// Opens raw CAN sockets by interface name (e.g. `can0`, `vcan0`)
#[derive(Debug, Default, Clone, Copy)]
pub struct SocketCanConnector;

impl BusConnector for SocketCanConnector {
    fn open(&self, interface: &str) -> Result<Box<dyn CanBus>, BusError> {
        let socket = CanSocket::open(interface).map_err(|e| BusError::OpenFailed {
            interface: interface.to_string(),
            reason: e.to_string(),
        })?;

        socket.set_nonblocking(true).map_err(|e| BusError::OpenFailed {
            interface: interface.to_string(),
            reason: format!("Failed to set non-blocking: {}", e),
        })?;

        tracing::info!(interface, "Opened raw CAN socket");
        Ok(Box::new(SocketCanBus { socket }))
    }
}

struct SocketCanBus {
    socket: CanSocket,
}

impl CanBus for SocketCanBus {
    fn read_frame(&mut self) -> Result<Option<CanFrame>, BusError> {
        match self.socket.read_frame() {
            Ok(RawFrame::Data(frame)) => Ok(CanFrame::new(frame.raw_id(), frame.data())),
            // Remote and error frames carry nothing to decode
            Ok(_) => Ok(None),
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(BusError::ReadFailed(e.to_string())),
        }
    }
}
