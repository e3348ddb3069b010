//! Error types for configuration, I/O and the obligation state machine.

use norm_events::ObligationStatus;
use thiserror::Error;

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Top-level error for simulation setup and output
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Returned when an obligation is asked to make a move its state machine forbids
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("illegal obligation transition {from} -> {to}")]
pub struct TransitionError {
    pub from: ObligationStatus,
    pub to: ObligationStatus,
}
