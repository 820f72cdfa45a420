//! Shared protocol types for Renogy devices
//!
//! Device families and the fixed Modbus constants every Renogy serial link uses.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unit (slave) id answered by Renogy devices on the serial link
pub const DEFAULT_UNIT_ID: u8 = 0xFF;

/// Modbus function code 3: read holding registers
pub const FC_READ_HOLDING_REGISTERS: u8 = 0x03;

/// Renogy device family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    /// Solar charge controller (Rover, Wanderer, ...)
    #[default]
    Controller,
    /// Smart battery
    Battery,
    /// Inverter
    Inverter,
}

impl DeviceType {
    /// All known device types
    pub const ALL: [DeviceType; 3] = [
        DeviceType::Controller,
        DeviceType::Battery,
        DeviceType::Inverter,
    ];

    /// Configuration string for this device type
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Controller => "controller",
            DeviceType::Battery => "battery",
            DeviceType::Inverter => "inverter",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "controller" => Ok(DeviceType::Controller),
            "battery" => Ok(DeviceType::Battery),
            "inverter" => Ok(DeviceType::Inverter),
            other => Err(format!(
                "Unknown device type '{}', expected one of: controller, battery, inverter",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_type_parse() {
        assert_eq!("controller".parse::<DeviceType>(), Ok(DeviceType::Controller));
        assert_eq!(" Battery ".parse::<DeviceType>(), Ok(DeviceType::Battery));
        assert_eq!("INVERTER".parse::<DeviceType>(), Ok(DeviceType::Inverter));
        assert!("charger".parse::<DeviceType>().is_err());
    }

    #[test]
    fn test_device_type_serde() {
        let json = serde_json::to_string(&DeviceType::Controller).unwrap();
        assert_eq!(json, "\"controller\"");
        let parsed: DeviceType = serde_json::from_str("\"inverter\"").unwrap();
        assert_eq!(parsed, DeviceType::Inverter);
    }

    #[test]
    fn test_default_is_controller() {
        assert_eq!(DeviceType::default(), DeviceType::Controller);
        for device_type in DeviceType::ALL {
            assert_eq!(device_type.to_string(), device_type.as_str());
        }
    }
}
