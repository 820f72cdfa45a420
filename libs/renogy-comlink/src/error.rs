//! Communication Link Error Types
//!
//! Core error types for the register transport and the frame decoder.

use thiserror::Error;

use crate::protocols::DeviceType;

/// Result type for renogy-comlink operations
pub type Result<T> = std::result::Result<T, ComLinkError>;

/// Errors raised by a register transport
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Opening the link failed
    #[error("Connection error: {0}")]
    Connect(String),

    /// No (complete) answer within the configured timeout
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The remote answered with an exception or an invalid frame
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Lower-level read/write failure
    #[error("IO error: {0}")]
    Io(String),
}

/// Errors raised while decoding a response frame
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// No decoding rule for this (device type, register) pair
    #[error("No decoding rule for {device_type} register {register}")]
    UnknownRegister {
        device_type: DeviceType,
        register: u16,
    },

    /// Frame shorter than the data it declares or needs
    #[error("Malformed frame: {0}")]
    Malformed(String),
}

/// Communication link errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ComLinkError {
    /// Transport-level failure
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Decoding failure
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// No command table registered for the device type
    #[error("Unsupported device type: {0}")]
    UnsupportedDeviceType(DeviceType),

    /// Device is unavailable and its retry window is still running
    #[error("Retry window not elapsed")]
    RetryWindowNotElapsed,
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut => TransportError::Timeout(err.to_string()),
            _ => TransportError::Io(err.to_string()),
        }
    }
}

// Helper methods for creating errors
impl TransportError {
    pub fn connect(msg: impl Into<String>) -> Self {
        TransportError::Connect(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        TransportError::Timeout(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        TransportError::Protocol(msg.into())
    }

    pub fn io(msg: impl Into<String>) -> Self {
        TransportError::Io(msg.into())
    }
}

impl DecodeError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        DecodeError::Malformed(msg.into())
    }
}

impl ComLinkError {
    /// Check if this error indicates the link should be dropped and reopened
    pub fn needs_reconnect(&self) -> bool {
        matches!(
            self,
            ComLinkError::Transport(TransportError::Io(_))
                | ComLinkError::Transport(TransportError::Connect(_))
        )
    }

    /// Short machine-friendly category, used in outcome reporting
    pub fn kind(&self) -> &'static str {
        match self {
            ComLinkError::Transport(TransportError::Connect(_)) => "connect",
            ComLinkError::Transport(TransportError::Timeout(_)) => "timeout",
            ComLinkError::Transport(TransportError::Protocol(_)) => "protocol",
            ComLinkError::Transport(TransportError::Io(_)) => "io",
            ComLinkError::Decode(DecodeError::UnknownRegister { .. }) => "unknown_register",
            ComLinkError::Decode(DecodeError::Malformed(_)) => "malformed",
            ComLinkError::UnsupportedDeviceType(_) => "unsupported_device_type",
            ComLinkError::RetryWindowNotElapsed => "retry_window_not_elapsed",
        }
    }
}
