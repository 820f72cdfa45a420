//! Renogy Protocol Implementations
//!
//! Modbus RTU plumbing and the Renogy register map.
//!
//! # Features
//!
//! - `serial` - `SerialTransport` over tokio-serial (enabled by default)
//!
//! # Architecture
//!
//! ```text
//! renogy-protocols
//!     ├── modbus
//!     │   ├── PduBuilder / ModbusPdu (FC03 request and response PDUs)
//!     │   ├── RtuFrameProcessor (unit id + CRC16 framing)
//!     │   └── SerialTransport (RegisterTransport over a serial port)
//!     └── registers
//!         ├── command table (which blocks to read per device type)
//!         ├── FrameCodec (frame assembly and field decoding)
//!         └── FieldKey / FieldValue (typed field set)
//! ```

pub mod modbus;
pub mod registers;

pub use registers::{
    build_frame, decode, lookup, CommandEntry, FieldKey, FieldValue, Operation, ParsedSnapshot,
};

#[cfg(feature = "serial")]
pub use modbus::{SerialParams, SerialTransport};

// Re-export common types for convenience
pub use renogy_comlink::{ConnectionState, DeviceType, RegisterTransport};
