//! Renogy Polling Service Library
//!
//! Polls Renogy charge controllers over a serial Modbus RTU link, decodes the
//! register blocks into named measurements, and tracks device availability.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────────┐    ┌─────────────────┐
//! │   AppConfig     │───►│ PollingCoordinator  │───►│ SerialTransport │
//! │ (YAML + env)    │    │ (one per device)    │    │ (tokio-serial)  │
//! └─────────────────┘    └─────────────────────┘    └─────────────────┘
//!                              │          │
//!                              ▼          ▼
//!                      ┌──────────────┐ ┌──────────────────────┐
//!                      │ DeviceHealth │ │ snapshot + outcomes  │
//!                      │ (3 failures, │ │ (watch / broadcast)  │
//!                      │ 10 min probe)│ └──────────────────────┘
//!                      └──────────────┘
//! ```
//!
//! - **`core`**: configuration and bootstrap (CLI, logging)
//! - **`runtime`**: health tracking, the coordinator, the polling task

pub mod core;
pub mod error;
pub mod runtime;

pub use error::{RenogySrvError, Result};
pub use runtime::{
    spawn_polling_task, DeviceHealth, DeviceIdentity, DeviceStatus, PollOutcome,
    PollingCoordinator,
};
