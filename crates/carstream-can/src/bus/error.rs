//! Bus layer errors

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    #[error("Failed to open {interface}: {reason}")]
    OpenFailed { interface: String, reason: String },

    #[error("Bus not supported: {0}")]
    Unsupported(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Bus closed")]
    Closed,
}
