//! Decoded field set

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Every field a Renogy decode can produce
///
/// The serialized (snake_case) names are a stable contract with consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKey {
    Model,
    DeviceId,
    BatteryType,
    BatteryPercentage,
    BatteryVoltage,
    BatteryCurrent,
    BatteryTemperature,
    ControllerTemperature,
    LoadVoltage,
    LoadCurrent,
    LoadPower,
    LoadStatus,
    PvVoltage,
    PvCurrent,
    PvPower,
    MaxChargingPowerToday,
    MaxDischargingPowerToday,
    ChargingAmpHoursToday,
    DischargingAmpHoursToday,
    PowerGenerationToday,
    PowerConsumptionToday,
    PowerGenerationTotal,
    ChargingStatus,
}

impl FieldKey {
    pub const ALL: [FieldKey; 23] = [
        FieldKey::Model,
        FieldKey::DeviceId,
        FieldKey::BatteryType,
        FieldKey::BatteryPercentage,
        FieldKey::BatteryVoltage,
        FieldKey::BatteryCurrent,
        FieldKey::BatteryTemperature,
        FieldKey::ControllerTemperature,
        FieldKey::LoadVoltage,
        FieldKey::LoadCurrent,
        FieldKey::LoadPower,
        FieldKey::LoadStatus,
        FieldKey::PvVoltage,
        FieldKey::PvCurrent,
        FieldKey::PvPower,
        FieldKey::MaxChargingPowerToday,
        FieldKey::MaxDischargingPowerToday,
        FieldKey::ChargingAmpHoursToday,
        FieldKey::DischargingAmpHoursToday,
        FieldKey::PowerGenerationToday,
        FieldKey::PowerConsumptionToday,
        FieldKey::PowerGenerationTotal,
        FieldKey::ChargingStatus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKey::Model => "model",
            FieldKey::DeviceId => "device_id",
            FieldKey::BatteryType => "battery_type",
            FieldKey::BatteryPercentage => "battery_percentage",
            FieldKey::BatteryVoltage => "battery_voltage",
            FieldKey::BatteryCurrent => "battery_current",
            FieldKey::BatteryTemperature => "battery_temperature",
            FieldKey::ControllerTemperature => "controller_temperature",
            FieldKey::LoadVoltage => "load_voltage",
            FieldKey::LoadCurrent => "load_current",
            FieldKey::LoadPower => "load_power",
            FieldKey::LoadStatus => "load_status",
            FieldKey::PvVoltage => "pv_voltage",
            FieldKey::PvCurrent => "pv_current",
            FieldKey::PvPower => "pv_power",
            FieldKey::MaxChargingPowerToday => "max_charging_power_today",
            FieldKey::MaxDischargingPowerToday => "max_discharging_power_today",
            FieldKey::ChargingAmpHoursToday => "charging_amp_hours_today",
            FieldKey::DischargingAmpHoursToday => "discharging_amp_hours_today",
            FieldKey::PowerGenerationToday => "power_generation_today",
            FieldKey::PowerConsumptionToday => "power_consumption_today",
            FieldKey::PowerGenerationTotal => "power_generation_total",
            FieldKey::ChargingStatus => "charging_status",
        }
    }

    /// Measurement unit, `None` for text and enumerated fields
    pub fn unit(&self) -> Option<&'static str> {
        match self {
            FieldKey::BatteryVoltage | FieldKey::LoadVoltage | FieldKey::PvVoltage => Some("V"),
            FieldKey::BatteryCurrent | FieldKey::LoadCurrent | FieldKey::PvCurrent => Some("A"),
            FieldKey::BatteryPercentage => Some("%"),
            FieldKey::BatteryTemperature | FieldKey::ControllerTemperature => Some("°C"),
            FieldKey::LoadPower
            | FieldKey::PvPower
            | FieldKey::MaxChargingPowerToday
            | FieldKey::MaxDischargingPowerToday => Some("W"),
            FieldKey::PowerGenerationToday
            | FieldKey::PowerConsumptionToday
            | FieldKey::PowerGenerationTotal => Some("Wh"),
            FieldKey::ChargingAmpHoursToday | FieldKey::DischargingAmpHoursToday => Some("Ah"),
            FieldKey::Model
            | FieldKey::DeviceId
            | FieldKey::BatteryType
            | FieldKey::LoadStatus
            | FieldKey::ChargingStatus => None,
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FieldKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldKey::ALL
            .iter()
            .find(|key| key.as_str() == s)
            .copied()
            .ok_or_else(|| format!("Unknown field key '{}'", s))
    }
}

/// Decoded value: integer count, scaled measurement, or text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    /// Numeric view, `None` for text
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(v) => Some(*v as f64),
            FieldValue::Float(v) => Some(*v),
            FieldValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

/// Field mapping produced by one decode or one full poll
pub type ParsedSnapshot = BTreeMap<FieldKey, FieldValue>;
