//! Service Bootstrap and Initialization
//!
//! Command-line arguments, logging setup, and the human-readable output
//! used by `--validate` and `--once`.

use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use renogy_protocols::ParsedSnapshot;

use crate::core::config::{AppConfig, ServiceConfig};
use crate::error::{RenogySrvError, Result};
use crate::runtime::DeviceStatus;

/// Command-line arguments for renogysrv
#[derive(Parser, Debug, Clone)]
#[command(
    name = "renogysrv",
    version = env!("CARGO_PKG_VERSION"),
    about = "Renogy charge controller polling service",
    long_about = None
)]
pub struct Args {
    /// Configuration file (YAML)
    #[arg(short = 'c', long, env = "RENOGY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short = 'l', long)]
    pub log_level: Option<String>,

    /// Directory for rolling log files; overrides the config file
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Validation mode - load and validate configuration, then exit
    #[arg(long)]
    pub validate: bool,

    /// Poll every device once, print the result as JSON, then exit
    #[arg(long, conflicts_with = "validate")]
    pub once: bool,
}

/// Effective log level: CLI over config, `info` when neither parses
pub fn resolve_log_level(args: &Args, service: &ServiceConfig) -> tracing::Level {
    args.log_level
        .as_deref()
        .unwrap_or(&service.log_level)
        .parse()
        .unwrap_or(tracing::Level::INFO)
}

/// Initialize logging from CLI arguments and the service section
pub fn initialize_logging(args: &Args, service: &ServiceConfig) -> Result<()> {
    let log_config = common::logging::LogConfig {
        service_name: service.name.clone(),
        log_dir: args.log_dir.clone().or_else(|| service.log_dir.clone()),
        console_level: resolve_log_level(args, service),
        enable_json: false,
        ansi: !args.no_color,
    };

    common::logging::init_with_config(log_config)
        .map_err(|e| RenogySrvError::internal(format!("Failed to init logging: {}", e)))
}

/// Log the configured devices (validation mode)
pub fn describe_devices(config: &AppConfig) {
    info!("Service: {}", config.service.name);
    info!("Found {} device(s)", config.devices.len());
    for device in &config.devices {
        info!(
            "  {}: {} on {} @{}baud, every {}s",
            device.display_name(),
            device.device_type,
            device.port,
            device.serial.baud_rate,
            device.scan_interval
        );
    }
}

/// One `key = value unit` line per field
pub fn render_snapshot(snapshot: &ParsedSnapshot) -> Vec<String> {
    snapshot
        .iter()
        .map(|(key, value)| match key.unit() {
            Some(unit) => format!("{} = {} {}", key, value, unit),
            None => format!("{} = {}", key, value),
        })
        .collect()
}

/// Log each device's status in readable form (one-shot mode)
pub fn describe_statuses(statuses: &[DeviceStatus]) {
    for status in statuses {
        let state = if status.available { "available" } else { "unavailable" };
        info!("{} ({}): {}", status.identity.name, status.identity.port, state);
        for line in render_snapshot(&status.data) {
            info!("  {}", line);
        }
    }
}
