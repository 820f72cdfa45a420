//! Modbus RTU framing
//!
//! RTU frame: `[unit id][PDU][CRC16 lo][CRC16 hi]`. One request is in flight
//! per serial link, so the processor remembers a single pending request and
//! validates the next response against it.

use tracing::debug;

use renogy_comlink::TransportError;

use super::constants::{CRC16_INIT, CRC16_POLY, EXCEPTION_FLAG, MIN_RTU_FRAME, RTU_OVERHEAD};
use super::pdu::ModbusPdu;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingRequest {
    unit_id: u8,
    function_code: u8,
}

/// RTU frame builder and parser
#[derive(Debug, Default)]
pub struct RtuFrameProcessor {
    pending: Option<PendingRequest>,
}

impl RtuFrameProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a PDU in an RTU frame and remember it as the pending request
    pub fn build_frame(&mut self, unit_id: u8, pdu: &ModbusPdu) -> Vec<u8> {
        let mut frame = Vec::with_capacity(pdu.len() + RTU_OVERHEAD);
        frame.push(unit_id);
        frame.extend_from_slice(pdu.as_slice());
        let crc = calculate_crc16(&frame);
        frame.extend_from_slice(&crc.to_le_bytes());

        self.pending = pdu.function_code().map(|function_code| PendingRequest {
            unit_id,
            function_code,
        });
        frame
    }

    /// Total frame length implied by the first three bytes of a response
    ///
    /// Exception responses are always 5 bytes; normal FC03 responses carry
    /// their byte count in the third byte.
    pub fn expected_response_len(header: &[u8; 3]) -> usize {
        if header[1] & EXCEPTION_FLAG != 0 {
            MIN_RTU_FRAME
        } else {
            RTU_OVERHEAD + 2 + header[2] as usize
        }
    }

    /// Validate CRC, unit id and function code, then return the PDU
    pub fn parse_frame(&mut self, data: &[u8]) -> Result<(u8, ModbusPdu), TransportError> {
        if data.len() < MIN_RTU_FRAME {
            return Err(TransportError::protocol(format!(
                "RTU frame too short: {} bytes",
                data.len()
            )));
        }

        let frame_len = data.len();
        let unit_id = data[0];
        let received_crc = u16::from_le_bytes([data[frame_len - 2], data[frame_len - 1]]);
        let calculated_crc = calculate_crc16(&data[..frame_len - 2]);
        if received_crc != calculated_crc {
            return Err(TransportError::protocol(format!(
                "CRC mismatch: expected 0x{calculated_crc:04X}, got 0x{received_crc:04X}"
            )));
        }

        let pdu = ModbusPdu::from_slice(&data[1..frame_len - 2])?;
        let response_fc = pdu.function_code().map(|fc| fc & !EXCEPTION_FLAG);

        if let Some(pending) = self.pending.take() {
            if pending.unit_id != unit_id {
                return Err(TransportError::protocol(format!(
                    "Unexpected response from unit {} (expected {})",
                    unit_id, pending.unit_id
                )));
            }
            if response_fc != Some(pending.function_code) {
                return Err(TransportError::protocol(format!(
                    "Function code mismatch for unit {}: got {:02X?}, expected {:02X}",
                    unit_id, response_fc, pending.function_code
                )));
            }
        }

        debug!(
            "RTU frame ok: unit={}, pdu_len={}, crc={:04X}",
            unit_id,
            pdu.len(),
            received_crc
        );
        Ok((unit_id, pdu))
    }

    /// Forget the pending request (after a timeout or reconnect)
    pub fn clear_pending(&mut self) {
        self.pending = None;
    }
}

/// CRC16 checksum (Modbus RTU)
pub fn calculate_crc16(data: &[u8]) -> u16 {
    let mut crc = CRC16_INIT;
    for &byte in data {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ CRC16_POLY;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

/// Human-readable exception description
pub fn exception_description(exception_code: u8) -> &'static str {
    match exception_code {
        0x01 => "Illegal Function",
        0x02 => "Illegal Data Address",
        0x03 => "Illegal Data Value",
        0x04 => "Slave Device Failure",
        0x05 => "Acknowledge",
        0x06 => "Slave Device Busy",
        _ => "Unknown Exception",
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::modbus::PduBuilder;

    #[test]
    fn test_crc16_known_vector() {
        // 01 03 00 00 00 01 -> CRC 0x0A84 (sent as 84 0A)
        assert_eq!(calculate_crc16(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x01]), 0x0A84);
        assert_eq!(calculate_crc16(&[]), 0xFFFF);
    }

    #[test]
    fn test_build_request_frame() {
        let mut processor = RtuFrameProcessor::new();
        let pdu = PduBuilder::read_holding_registers(0x0000, 1).unwrap();
        let frame = processor.build_frame(0x01, &pdu);
        assert_eq!(frame, vec![0x01, 0x03, 0x00, 0x00, 0x00, 0x01, 0x84, 0x0A]);
    }

    fn response(unit: u8, body: &[u8]) -> Vec<u8> {
        let mut frame = vec![unit];
        frame.extend_from_slice(body);
        let crc = calculate_crc16(&frame);
        frame.extend_from_slice(&crc.to_le_bytes());
        frame
    }

    #[test]
    fn test_parse_matching_response() {
        let mut processor = RtuFrameProcessor::new();
        let pdu = PduBuilder::read_holding_registers(26, 1).unwrap();
        processor.build_frame(0xFF, &pdu);

        let frame = response(0xFF, &[0x03, 0x02, 0x00, 0x10]);
        let (unit, pdu) = processor.parse_frame(&frame).unwrap();
        assert_eq!(unit, 0xFF);
        assert_eq!(pdu.as_slice(), &[0x03, 0x02, 0x00, 0x10]);
    }

    #[test]
    fn test_parse_rejects_bad_crc() {
        let mut processor = RtuFrameProcessor::new();
        let mut frame = response(0xFF, &[0x03, 0x02, 0x00, 0x10]);
        let last = frame.len() - 1;
        frame[last] ^= 0xFF;
        let err = processor.parse_frame(&frame).unwrap_err();
        assert!(err.to_string().contains("CRC mismatch"));
    }

    #[test]
    fn test_parse_rejects_wrong_unit() {
        let mut processor = RtuFrameProcessor::new();
        let pdu = PduBuilder::read_holding_registers(26, 1).unwrap();
        processor.build_frame(0xFF, &pdu);

        let frame = response(0x01, &[0x03, 0x02, 0x00, 0x10]);
        assert!(processor.parse_frame(&frame).is_err());
    }

    #[test]
    fn test_exception_frame_matches_pending_request() {
        let mut processor = RtuFrameProcessor::new();
        let pdu = PduBuilder::read_holding_registers(26, 1).unwrap();
        processor.build_frame(0xFF, &pdu);

        let frame = response(0xFF, &[0x83, 0x02]);
        let (_, pdu) = processor.parse_frame(&frame).unwrap();
        assert_eq!(pdu.exception_code(), Some(0x02));
    }

    #[test]
    fn test_expected_response_len() {
        assert_eq!(RtuFrameProcessor::expected_response_len(&[0xFF, 0x03, 0x44]), 73);
        assert_eq!(RtuFrameProcessor::expected_response_len(&[0xFF, 0x83, 0x02]), 5);
    }

    #[test]
    fn test_frame_too_short() {
        let mut processor = RtuFrameProcessor::new();
        assert!(processor.parse_frame(&[0xFF, 0x03, 0x00]).is_err());
    }
}
