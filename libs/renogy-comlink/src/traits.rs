//! Core Communication Traits
//!
//! This module defines the register transport abstraction. The serial RTU client
//! in `renogy-protocols` implements it; the polling coordinator only sees the trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;

// ============================================================================
// Connection State
// ============================================================================

/// Connection state of a transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ConnectionState {
    /// Never connected, or closed
    #[default]
    Disconnected,
    /// Link is open
    Connected,
    /// Last connect attempt failed
    Failed,
}

impl ConnectionState {
    /// Check if state represents an open link
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "DISCONNECTED"),
            ConnectionState::Connected => write!(f, "CONNECTED"),
            ConnectionState::Failed => write!(f, "FAILED"),
        }
    }
}

// ============================================================================
// Register Transport
// ============================================================================

/// Register-oriented transport (one physical link, one owner)
///
/// Implementations never retry internally; the retry policy belongs to the caller.
#[async_trait]
pub trait RegisterTransport: Send {
    /// Transport name for logging (usually the port)
    fn name(&self) -> &str;

    /// Current connection state
    fn state(&self) -> ConnectionState;

    /// Whether the link is open
    fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Open the link. No-op when already connected.
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Read `count` holding registers starting at `address`
    ///
    /// On success the returned vector has exactly `count` words.
    async fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
        unit_id: u8,
    ) -> Result<Vec<u16>, TransportError>;

    /// Release the link. Best effort: failures are logged, never returned.
    async fn close(&mut self);
}
