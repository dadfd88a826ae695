//! Named physical reading

use serde::{Deserialize, Serialize};

/// A single named value produced by acquisition.
///
/// Readings carry no identity beyond their name; a later reading with the
/// same name supersedes the earlier one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub name: String,
    pub value: f32,
}

impl Reading {
    pub fn new(name: impl Into<String>, value: f32) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}
