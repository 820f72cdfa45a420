//! Modbus RTU Implementation
//!
//! Only what a Renogy serial link needs: FC03 read requests, RTU framing
//! with CRC16, and a serial transport that ties them together.
//!
//! ```text
//! modbus
//!     ├── PduBuilder (request PDUs)
//!     ├── RtuFrameProcessor (unit id + CRC16)
//!     └── SerialTransport (tokio-serial link, feature `serial`)
//! ```

pub mod constants;
mod pdu;
mod transport;

#[cfg(feature = "serial")]
mod connection;

pub use pdu::{parse_read_response, ModbusPdu, PduBuilder};
pub use transport::{calculate_crc16, exception_description, RtuFrameProcessor};

#[cfg(feature = "serial")]
pub use connection::{SerialParams, SerialTransport};
