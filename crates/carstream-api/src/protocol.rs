//! Handshake wire format
//!
//! The first client message selects the vehicle:
//!
//! ```text
//! offset  size  field
//! 0       1     command (0x01 = start streaming)
//! 1       4     model id, little-endian
//! 5       4     CRC-32 of bytes 0..5, little-endian
//! ```

use crc::{Crc, CRC_32_ISO_HDLC};

use crate::error::HandshakeError;

pub const HANDSHAKE_LEN: usize = 9;
pub const CMD_START: u8 = 0x01;

/// Reflected CRC-32 (IEEE 802.3, polynomial 0xEDB88320)
const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

pub fn checksum(bytes: &[u8]) -> u32 {
    CRC32.checksum(bytes)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handshake {
    pub model_id: u32,
}

impl Handshake {
    pub fn new(model_id: u32) -> Self {
        Self { model_id }
    }

    /// Validate a handshake message.
    ///
    /// Checks run in order: length, command byte, checksum. Bytes past the
    /// ninth are ignored.
    pub fn parse(msg: &[u8]) -> Result<Self, HandshakeError> {
        if msg.len() < HANDSHAKE_LEN {
            return Err(HandshakeError::InvalidLength(msg.len()));
        }
        if msg[0] != CMD_START {
            return Err(HandshakeError::InvalidCommand(msg[0]));
        }

        let model_id = u32::from_le_bytes([msg[1], msg[2], msg[3], msg[4]]);
        let actual = u32::from_le_bytes([msg[5], msg[6], msg[7], msg[8]]);
        let expected = checksum(&msg[..5]);
        if actual != expected {
            return Err(HandshakeError::InvalidCrc { expected, actual });
        }

        Ok(Self { model_id })
    }

    pub fn encode(&self) -> [u8; HANDSHAKE_LEN] {
        let mut out = [0u8; HANDSHAKE_LEN];
        out[0] = CMD_START;
        out[1..5].copy_from_slice(&self.model_id.to_le_bytes());
        let crc = checksum(&out[..5]);
        out[5..9].copy_from_slice(&crc.to_le_bytes());
        out
    }
}
