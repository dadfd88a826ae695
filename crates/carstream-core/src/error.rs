//! Error types for decoding and profile construction

use thiserror::Error;

/// Errors returned when a frame cannot be turned into quantities
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// No signal entry is registered for this frame id
    #[error("unknown frame: 0x{0:03X}")]
    UnknownFrame(u32),

    /// Payload is shorter than the decoder needs
    #[error("frame 0x{frame_id:03X} too short: expected {expected} bytes, got {actual}")]
    TooShort {
        frame_id: u32,
        expected: usize,
        actual: usize,
    },
}

/// Errors raised while building profiles or resolving them from configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    /// A frame id was registered twice in one profile
    #[error("duplicate signal entry for frame 0x{0:03X}")]
    DuplicateFrame(u32),

    /// Named built-in profile does not exist
    #[error("unknown vehicle profile: {0}")]
    UnknownProfile(String),

    /// Model id string could not be parsed
    #[error("invalid model id: {0}")]
    InvalidModelId(String),
}

/// Parse a model id from string (supports hex with 0x prefix)
pub fn parse_model_id(s: &str) -> Result<u32, ProfileError> {
    let trimmed = s.trim();
    let (digits, radix) = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => (hex, 16),
        None => (trimmed, 10),
    };

    u32::from_str_radix(digits, radix).map_err(|_| ProfileError::InvalidModelId(s.to_string()))
}
