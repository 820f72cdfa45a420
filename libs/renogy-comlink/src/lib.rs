//! Renogy Communication Link Library
//!
//! Core communication abstractions shared by the Renogy protocol and service crates.
//!
//! # Architecture
//!
//! This library provides:
//! - **Core Traits**: `RegisterTransport` for register-oriented transports
//! - **Error Taxonomy**: `TransportError`, `DecodeError`, `ComLinkError`
//! - **Bytes Utilities**: bounds-checked big-endian reads and bit extraction
//! - **Protocol Types**: `DeviceType` and fixed Modbus constants

pub mod bytes;
pub mod error;
pub mod protocols;
pub mod traits;

// Re-export core types
pub use error::{ComLinkError, DecodeError, Result, TransportError};
pub use protocols::{DeviceType, DEFAULT_UNIT_ID, FC_READ_HOLDING_REGISTERS};
pub use traits::{ConnectionState, RegisterTransport};
