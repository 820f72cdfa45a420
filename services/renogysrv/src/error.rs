//! Error handling for the Renogy polling service
//!
//! Setup-time errors only. Per-poll failures never leave the coordinator;
//! they become `PollOutcome::Failed`.

use renogy_comlink::ComLinkError;
use thiserror::Error;

/// Renogy Service Error Type
#[derive(Error, Debug, Clone)]
pub enum RenogySrvError {
    /// Configuration could not be loaded or parsed
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Configuration loaded but is not usable
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Communication setup errors (unsupported device type, ...)
    #[error("Communication error: {0}")]
    ComLinkError(#[from] ComLinkError),

    /// Internal errors (task join, serialization, logging setup)
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Result type alias for the Renogy service
pub type Result<T> = std::result::Result<T, RenogySrvError>;

impl RenogySrvError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }
}

impl From<figment::Error> for RenogySrvError {
    fn from(err: figment::Error) -> Self {
        RenogySrvError::ConfigError(err.to_string())
    }
}

impl From<serde_json::Error> for RenogySrvError {
    fn from(err: serde_json::Error) -> Self {
        RenogySrvError::InternalError(format!("JSON serialization: {}", err))
    }
}

impl From<serde_yaml::Error> for RenogySrvError {
    fn from(err: serde_yaml::Error) -> Self {
        RenogySrvError::InternalError(format!("YAML serialization: {}", err))
    }
}

impl From<tokio::task::JoinError> for RenogySrvError {
    fn from(err: tokio::task::JoinError) -> Self {
        RenogySrvError::InternalError(format!("Task join error: {}", err))
    }
}
