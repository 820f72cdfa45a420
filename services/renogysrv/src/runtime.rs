//! Runtime Orchestration Layer
//!
//! Device health, the polling coordinator, the interval task that drives it,
//! and the per-device service wiring.

pub mod coordinator;
pub mod health;
pub mod polling;
pub mod service;
pub mod test_utils;

// Re-export common types
pub use coordinator::{DeviceIdentity, DeviceStatus, PollOutcome, PollingCoordinator};
pub use health::{DeviceHealth, HealthState, MAX_FAILURES, UNAVAILABLE_RETRY_INTERVAL};
pub use polling::spawn_polling_task;
pub use service::{
    build_devices, poll_once_all, run_until_cancelled, serial_transport, DeviceRuntime,
};
