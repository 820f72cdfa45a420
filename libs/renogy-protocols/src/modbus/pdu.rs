//! Modbus PDU data structure
//!
//! Stack-allocated PDU buffer plus the FC03 request builder and response parser.

use renogy_comlink::bytes::be_bytes_to_words;
use renogy_comlink::{TransportError, FC_READ_HOLDING_REGISTERS};

use super::constants::{EXCEPTION_FLAG, MAX_PDU_SIZE, MAX_READ_REGISTERS};
use super::transport::exception_description;

/// PDU with a fixed-size buffer
#[derive(Debug, Clone)]
pub struct ModbusPdu {
    data: [u8; MAX_PDU_SIZE],
    len: usize,
}

impl ModbusPdu {
    /// Create an empty PDU
    #[inline]
    pub fn new() -> Self {
        Self {
            data: [0; MAX_PDU_SIZE],
            len: 0,
        }
    }

    /// Create a PDU from a byte slice
    pub fn from_slice(data: &[u8]) -> Result<Self, TransportError> {
        if data.len() > MAX_PDU_SIZE {
            return Err(TransportError::protocol(format!(
                "PDU too large: {} bytes (max {})",
                data.len(),
                MAX_PDU_SIZE
            )));
        }

        let mut pdu = Self::new();
        pdu.data[..data.len()].copy_from_slice(data);
        pdu.len = data.len();
        Ok(pdu)
    }

    /// Push a single byte
    #[inline]
    pub fn push(&mut self, byte: u8) -> Result<(), TransportError> {
        if self.len >= MAX_PDU_SIZE {
            return Err(TransportError::protocol("PDU buffer full"));
        }
        self.data[self.len] = byte;
        self.len += 1;
        Ok(())
    }

    /// Push a big-endian u16
    #[inline]
    pub fn push_u16(&mut self, value: u16) -> Result<(), TransportError> {
        let [hi, lo] = value.to_be_bytes();
        self.push(hi)?;
        self.push(lo)
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Function code (first byte), including the exception flag if set
    #[inline]
    pub fn function_code(&self) -> Option<u8> {
        self.as_slice().first().copied()
    }

    #[inline]
    pub fn is_exception(&self) -> bool {
        self.function_code()
            .is_some_and(|fc| fc & EXCEPTION_FLAG != 0)
    }

    /// Exception code of an exception response
    #[inline]
    pub fn exception_code(&self) -> Option<u8> {
        if self.is_exception() {
            self.as_slice().get(1).copied()
        } else {
            None
        }
    }
}

impl Default for ModbusPdu {
    fn default() -> Self {
        Self::new()
    }
}

/// Request PDU builder
pub struct PduBuilder;

impl PduBuilder {
    /// Build an FC03 read-holding-registers request
    pub fn read_holding_registers(address: u16, count: u16) -> Result<ModbusPdu, TransportError> {
        if count == 0 || count > MAX_READ_REGISTERS {
            return Err(TransportError::protocol(format!(
                "Invalid register count {} (1..={})",
                count, MAX_READ_REGISTERS
            )));
        }

        let mut pdu = ModbusPdu::new();
        pdu.push(FC_READ_HOLDING_REGISTERS)?;
        pdu.push_u16(address)?;
        pdu.push_u16(count)?;
        Ok(pdu)
    }
}

/// Extract register words from an FC03 response PDU
///
/// Exception responses and byte counts that disagree with `expected_count`
/// are protocol errors.
pub fn parse_read_response(
    pdu: &ModbusPdu,
    expected_count: u16,
) -> Result<Vec<u16>, TransportError> {
    if let Some(code) = pdu.exception_code() {
        return Err(TransportError::protocol(format!(
            "Modbus exception 0x{:02X}: {}",
            code,
            exception_description(code)
        )));
    }

    let data = pdu.as_slice();
    match data.first() {
        Some(&FC_READ_HOLDING_REGISTERS) => {},
        Some(&fc) => {
            return Err(TransportError::protocol(format!(
                "Unexpected function code 0x{:02X} (expected 0x{:02X})",
                fc, FC_READ_HOLDING_REGISTERS
            )));
        },
        None => return Err(TransportError::protocol("Empty response PDU")),
    }

    let byte_count = data.get(1).copied().unwrap_or(0) as usize;
    let expected_bytes = expected_count as usize * 2;
    if byte_count != expected_bytes || data.len() != 2 + byte_count {
        return Err(TransportError::protocol(format!(
            "Byte count mismatch: header {}, payload {}, expected {}",
            byte_count,
            data.len().saturating_sub(2),
            expected_bytes
        )));
    }

    Ok(be_bytes_to_words(&data[2..]))
}
