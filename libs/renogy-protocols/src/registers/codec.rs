//! Frame codec
//!
//! `build_frame` re-serializes register words into the response layout
//! `[unit][function][byte count][words, big-endian]`; `decode` reads named
//! fields out of that layout at fixed byte offsets.

use renogy_comlink::bytes::{
    ascii_at, extract_bit_u8, i8_at, u16_at, u32_at, u8_at, words_to_be_bytes,
};
use renogy_comlink::{DecodeError, DeviceType};

use super::fields::{FieldKey, FieldValue, ParsedSnapshot};

/// Frame header: unit id, function code, byte count
const HEADER_LEN: usize = 3;

/// Most words one FC03 response can carry
const MAX_BLOCK_WORDS: usize = 125;

/// Assemble the canonical response frame for a block of register words
///
/// Blocks longer than the FC03 limit are rejected, so the byte count header
/// always matches the payload.
pub fn build_frame(unit_id: u8, function_code: u8, words: &[u16]) -> Result<Vec<u8>, DecodeError> {
    if words.len() > MAX_BLOCK_WORDS {
        return Err(DecodeError::malformed(format!(
            "Block of {} words exceeds the {}-word read limit",
            words.len(),
            MAX_BLOCK_WORDS
        )));
    }
    let payload = words_to_be_bytes(words);
    let byte_count = (payload.len() & 0xFF) as u8;

    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.push(unit_id);
    frame.push(function_code);
    frame.push(byte_count);
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Decode a frame read from `register` on a `device_type` device
pub fn decode(
    frame: &[u8],
    device_type: DeviceType,
    register: u16,
) -> Result<ParsedSnapshot, DecodeError> {
    let rule: fn(&Frame<'_>) -> Result<ParsedSnapshot, DecodeError> = match (device_type, register)
    {
        (DeviceType::Controller, 12) => decode_device_info,
        (DeviceType::Controller, 26) => decode_device_id,
        (DeviceType::Controller, 57348) => decode_battery_type,
        (DeviceType::Controller, 256) => decode_pv_block,
        _ => {
            return Err(DecodeError::UnknownRegister {
                device_type,
                register,
            })
        },
    };

    rule(&Frame::new(frame)?)
}

/// Frame trimmed to the byte count it declares
struct Frame<'a> {
    bytes: &'a [u8],
}

impl<'a> Frame<'a> {
    fn new(frame: &'a [u8]) -> Result<Self, DecodeError> {
        let Some(&declared) = frame.get(2) else {
            return Err(DecodeError::malformed(format!(
                "frame has {} bytes, header needs {}",
                frame.len(),
                HEADER_LEN
            )));
        };

        let end = HEADER_LEN + declared as usize;
        if frame.len() < end {
            return Err(DecodeError::malformed(format!(
                "frame declares {} data bytes but carries {}",
                declared,
                frame.len() - HEADER_LEN
            )));
        }

        Ok(Self {
            bytes: &frame[..end],
        })
    }

    fn need<T>(&self, value: Option<T>, key: FieldKey, offset: usize) -> Result<T, DecodeError> {
        value.ok_or_else(|| {
            DecodeError::malformed(format!(
                "{} at byte {} is past the end of a {}-byte frame",
                key,
                offset,
                self.bytes.len()
            ))
        })
    }

    fn u8(&self, key: FieldKey, offset: usize) -> Result<u8, DecodeError> {
        self.need(u8_at(self.bytes, offset), key, offset)
    }

    fn i8(&self, key: FieldKey, offset: usize) -> Result<i8, DecodeError> {
        self.need(i8_at(self.bytes, offset), key, offset)
    }

    fn u16(&self, key: FieldKey, offset: usize) -> Result<u16, DecodeError> {
        self.need(u16_at(self.bytes, offset), key, offset)
    }

    fn u32(&self, key: FieldKey, offset: usize) -> Result<u32, DecodeError> {
        self.need(u32_at(self.bytes, offset), key, offset)
    }

    fn ascii(&self, key: FieldKey, offset: usize, len: usize) -> Result<String, DecodeError> {
        self.need(ascii_at(self.bytes, offset, len), key, offset)
    }
}

fn decode_device_info(frame: &Frame<'_>) -> Result<ParsedSnapshot, DecodeError> {
    let mut fields = ParsedSnapshot::new();
    fields.insert(FieldKey::Model, FieldValue::Text(frame.ascii(FieldKey::Model, 3, 14)?));
    Ok(fields)
}

fn decode_device_id(frame: &Frame<'_>) -> Result<ParsedSnapshot, DecodeError> {
    let mut fields = ParsedSnapshot::new();
    fields.insert(
        FieldKey::DeviceId,
        FieldValue::Int(i64::from(frame.u8(FieldKey::DeviceId, 4)?)),
    );
    Ok(fields)
}

fn battery_type_name(raw: u16) -> &'static str {
    match raw {
        1 => "open",
        2 => "sealed",
        3 => "gel",
        4 => "lithium",
        5 => "custom",
        _ => "unknown",
    }
}

fn decode_battery_type(frame: &Frame<'_>) -> Result<ParsedSnapshot, DecodeError> {
    let raw = frame.u16(FieldKey::BatteryType, 3)?;
    let mut fields = ParsedSnapshot::new();
    fields.insert(FieldKey::BatteryType, battery_type_name(raw).into());
    Ok(fields)
}

fn charging_status_name(raw: u8) -> &'static str {
    match raw {
        0 => "deactivated",
        1 => "activated",
        2 => "mppt",
        3 => "equalizing",
        4 => "boost",
        5 => "floating",
        6 => "current limiting",
        _ => "unknown",
    }
}

/// u16 fields of the PV block reported as-is
const PV_RAW_U16: &[(FieldKey, usize)] = &[
    (FieldKey::BatteryPercentage, 3),
    (FieldKey::LoadPower, 15),
    (FieldKey::PvPower, 21),
    (FieldKey::MaxChargingPowerToday, 33),
    (FieldKey::MaxDischargingPowerToday, 35),
    (FieldKey::ChargingAmpHoursToday, 37),
    (FieldKey::DischargingAmpHoursToday, 39),
    (FieldKey::PowerGenerationToday, 41),
    (FieldKey::PowerConsumptionToday, 43),
];

/// u16 fields of the PV block divided by a fixed scale
const PV_SCALED_U16: &[(FieldKey, usize, f64)] = &[
    (FieldKey::BatteryVoltage, 5, 10.0),
    (FieldKey::BatteryCurrent, 7, 100.0),
    (FieldKey::LoadVoltage, 11, 10.0),
    (FieldKey::LoadCurrent, 13, 100.0),
    (FieldKey::PvVoltage, 17, 10.0),
    (FieldKey::PvCurrent, 19, 100.0),
];

fn decode_pv_block(frame: &Frame<'_>) -> Result<ParsedSnapshot, DecodeError> {
    let mut fields = ParsedSnapshot::new();

    for &(key, offset) in PV_RAW_U16 {
        fields.insert(key, FieldValue::Int(i64::from(frame.u16(key, offset)?)));
    }
    for &(key, offset, scale) in PV_SCALED_U16 {
        let raw = frame.u16(key, offset)?;
        fields.insert(key, FieldValue::Float(f64::from(raw) / scale));
    }

    for (key, offset) in [
        (FieldKey::ControllerTemperature, 9),
        (FieldKey::BatteryTemperature, 10),
    ] {
        fields.insert(key, FieldValue::Int(i64::from(frame.i8(key, offset)?)));
    }

    let total = frame.u32(FieldKey::PowerGenerationTotal, 59)?;
    fields.insert(FieldKey::PowerGenerationTotal, FieldValue::Int(i64::from(total)));

    let load = frame.u8(FieldKey::LoadStatus, 67)?;
    let load_status = if extract_bit_u8(load, 7) { "on" } else { "off" };
    fields.insert(FieldKey::LoadStatus, load_status.into());

    let charging = frame.u8(FieldKey::ChargingStatus, 68)?;
    fields.insert(
        FieldKey::ChargingStatus,
        charging_status_name(charging).into(),
    );

    Ok(fields)
}
