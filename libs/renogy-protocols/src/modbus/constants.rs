//! Modbus RTU constants

/// Maximum PDU size (Modbus application protocol, section 4.1)
pub const MAX_PDU_SIZE: usize = 253;

/// Maximum registers per FC03 request
pub const MAX_READ_REGISTERS: u16 = 125;

/// Unit id byte + CRC16
pub const RTU_OVERHEAD: usize = 3;

/// Minimum RTU frame: unit id, function code, one data byte, CRC16
pub const MIN_RTU_FRAME: usize = 5;

/// Bit set on the function code of an exception response
pub const EXCEPTION_FLAG: u8 = 0x80;

/// CRC16 polynomial (reflected 0x8005)
pub const CRC16_POLY: u16 = 0xA001;

/// CRC16 initial value
pub const CRC16_INIT: u16 = 0xFFFF;
