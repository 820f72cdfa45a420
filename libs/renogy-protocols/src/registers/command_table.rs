//! Register command tables
//!
//! One fixed table per supported device type. Addresses and word counts are
//! compatibility constants of the Renogy register map.

use serde::Serialize;

use renogy_comlink::{ComLinkError, DeviceType, Result, FC_READ_HOLDING_REGISTERS};

/// Named register block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    DeviceInfo,
    DeviceId,
    Battery,
    Pv,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::DeviceInfo => "device_info",
            Operation::DeviceId => "device_id",
            Operation::Battery => "battery",
            Operation::Pv => "pv",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One block read: function code, start register, word count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommandEntry {
    pub operation: Operation,
    pub function_code: u8,
    pub register: u16,
    pub word_count: u16,
}

impl CommandEntry {
    const fn read(operation: Operation, register: u16, word_count: u16) -> Self {
        Self {
            operation,
            function_code: FC_READ_HOLDING_REGISTERS,
            register,
            word_count,
        }
    }
}

/// Charge controller blocks, in polling order
pub const CONTROLLER_COMMANDS: &[CommandEntry] = &[
    CommandEntry::read(Operation::DeviceInfo, 12, 8),
    CommandEntry::read(Operation::DeviceId, 26, 1),
    CommandEntry::read(Operation::Battery, 57348, 1),
    CommandEntry::read(Operation::Pv, 256, 34),
];

/// Command table for a device type
///
/// Only controllers have a table today; other types fail with
/// `UnsupportedDeviceType`.
pub fn lookup(device_type: DeviceType) -> Result<&'static [CommandEntry]> {
    match device_type {
        DeviceType::Controller => Ok(CONTROLLER_COMMANDS),
        other => Err(ComLinkError::UnsupportedDeviceType(other)),
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_controller_table() {
        let table = lookup(DeviceType::Controller).unwrap();
        let blocks: Vec<_> = table
            .iter()
            .map(|c| (c.operation.as_str(), c.register, c.word_count))
            .collect();
        assert_eq!(
            blocks,
            vec![
                ("device_info", 12, 8),
                ("device_id", 26, 1),
                ("battery", 57348, 1),
                ("pv", 256, 34),
            ]
        );
        assert!(table
            .iter()
            .all(|c| c.function_code == FC_READ_HOLDING_REGISTERS));
    }

    #[test]
    fn test_unsupported_device_types() {
        for device_type in [DeviceType::Battery, DeviceType::Inverter] {
            assert_eq!(
                lookup(device_type).unwrap_err(),
                ComLinkError::UnsupportedDeviceType(device_type)
            );
        }
    }
}
