//! Service configuration
//!
//! Sources, later ones winning: built-in defaults, the YAML file
//! (`config/renogysrv.yaml` or `--config`), then `RENOGY_*` environment
//! variables with `__` as the nesting separator
//! (`RENOGY_SERVICE__LOG_LEVEL=debug`).

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};

use renogy_comlink::DeviceType;
use renogy_protocols::SerialParams;

use crate::error::{RenogySrvError, Result};
use crate::runtime::DeviceIdentity;

pub const DEFAULT_CONFIG_PATH: &str = "config/renogysrv.yaml";
pub const ENV_PREFIX: &str = "RENOGY_";

/// Poll interval bounds, seconds
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 60;
pub const MIN_SCAN_INTERVAL_SECS: u64 = 10;
pub const MAX_SCAN_INTERVAL_SECS: u64 = 600;

fn default_service_name() -> String {
    "renogysrv".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_scan_interval() -> u64 {
    DEFAULT_SCAN_INTERVAL_SECS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Rolling log files go here; console only when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
            log_dir: None,
        }
    }
}

/// Serial line settings for one device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub baud_rate: u32,
    pub data_bits: u8,
    pub stop_bits: u8,
    pub parity: String,
    pub timeout_secs: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            data_bits: 8,
            stop_bits: 1,
            parity: "None".to_string(),
            timeout_secs: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub port: String,
    #[serde(default)]
    pub device_type: DeviceType,
    /// Display name; the port when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Seconds between polls
    #[serde(default = "default_scan_interval")]
    pub scan_interval: u64,
    #[serde(default)]
    pub serial: SerialConfig,
}

impl DeviceConfig {
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            device_type: DeviceType::default(),
            name: None,
            scan_interval: DEFAULT_SCAN_INTERVAL_SECS,
            serial: SerialConfig::default(),
        }
    }

    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.port)
    }

    pub fn identity(&self) -> DeviceIdentity {
        DeviceIdentity {
            port: self.port.clone(),
            device_type: self.device_type,
            name: self.display_name().to_string(),
        }
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval)
    }

    pub fn serial_params(&self) -> SerialParams {
        SerialParams {
            port: self.port.clone(),
            baud_rate: self.serial.baud_rate,
            data_bits: self.serial.data_bits,
            stop_bits: self.serial.stop_bits,
            parity: self.serial.parity.clone(),
            timeout: Duration::from_secs(self.serial.timeout_secs),
        }
    }
}

/// Complete service configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

impl AppConfig {
    /// Layered figment for `path` (default path when `None`)
    pub fn figment(path: Option<&Path>) -> Figment {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load configuration; does not validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            if !path.exists() {
                return Err(RenogySrvError::config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
        }
        Ok(Self::figment(path).extract()?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.devices.is_empty() {
            return Err(RenogySrvError::validation("No devices configured"));
        }

        let mut ports = HashSet::new();
        for (index, device) in self.devices.iter().enumerate() {
            if device.port.trim().is_empty() {
                return Err(RenogySrvError::validation(format!(
                    "Device #{} has an empty port",
                    index
                )));
            }
            if !ports.insert(device.port.as_str()) {
                return Err(RenogySrvError::validation(format!(
                    "Port {} is configured more than once",
                    device.port
                )));
            }
            if !(MIN_SCAN_INTERVAL_SECS..=MAX_SCAN_INTERVAL_SECS).contains(&device.scan_interval) {
                return Err(RenogySrvError::validation(format!(
                    "Device {}: scan_interval {}s outside {}..={}s",
                    device.display_name(),
                    device.scan_interval,
                    MIN_SCAN_INTERVAL_SECS,
                    MAX_SCAN_INTERVAL_SECS
                )));
            }
            if device.serial.timeout_secs == 0 {
                return Err(RenogySrvError::validation(format!(
                    "Device {}: serial timeout must be at least 1s",
                    device.display_name()
                )));
            }
        }

        Ok(())
    }

    /// Effective configuration as YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
