//! Streaming protocol errors

use thiserror::Error;

/// Rejected handshake. Each variant maps to the close reason sent to the
/// client.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandshakeError {
    #[error("handshake too short: {0} bytes")]
    InvalidLength(usize),

    #[error("unexpected command byte 0x{0:02X}")]
    InvalidCommand(u8),

    #[error("checksum mismatch: expected 0x{expected:08X}, got 0x{actual:08X}")]
    InvalidCrc { expected: u32, actual: u32 },
}

impl HandshakeError {
    /// Reason carried in the close frame
    pub fn close_reason(&self) -> &'static str {
        match self {
            HandshakeError::InvalidLength(_) => "Invalid Length",
            HandshakeError::InvalidCommand(_) => "Invalid CMD",
            HandshakeError::InvalidCrc { .. } => "Invalid CRC",
        }
    }
}
