//! Service wiring: one coordinator and one polling task per configured device

use std::time::Duration;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use renogy_comlink::RegisterTransport;
use renogy_protocols::SerialTransport;

use super::coordinator::{DeviceStatus, PollingCoordinator};
use super::polling::spawn_polling_task;
use crate::core::config::{AppConfig, DeviceConfig};
use crate::error::Result;

/// A coordinator with its poll interval
pub struct DeviceRuntime {
    pub coordinator: PollingCoordinator,
    pub interval: Duration,
}

/// Serial RTU transport for a configured device
pub fn serial_transport(device: &DeviceConfig) -> Box<dyn RegisterTransport> {
    Box::new(SerialTransport::new(device.serial_params()))
}

/// Build every device's coordinator
///
/// Fails on the first device whose type has no command table; no transport
/// is opened here.
pub fn build_devices<F>(config: &AppConfig, mut make_transport: F) -> Result<Vec<DeviceRuntime>>
where
    F: FnMut(&DeviceConfig) -> Box<dyn RegisterTransport>,
{
    config
        .devices
        .iter()
        .map(|device| -> Result<DeviceRuntime> {
            let coordinator = PollingCoordinator::new(device.identity(), make_transport(device))?;
            Ok(DeviceRuntime {
                coordinator,
                interval: device.scan_interval(),
            })
        })
        .collect()
}

/// One cycle per device, concurrently; transports are closed afterwards
pub async fn poll_once_all(devices: Vec<DeviceRuntime>) -> Vec<DeviceStatus> {
    join_all(devices.into_iter().map(|device| async move {
        let mut coordinator = device.coordinator;
        coordinator.poll_once().await;
        coordinator.close().await;
        coordinator.status()
    }))
    .await
}

/// Poll every device until `cancel` fires, then return the final statuses
pub async fn run_until_cancelled(
    devices: Vec<DeviceRuntime>,
    cancel: CancellationToken,
) -> Vec<DeviceStatus> {
    info!("Starting {} device(s)", devices.len());

    let handles: Vec<_> = devices
        .into_iter()
        .map(|device| spawn_polling_task(device.coordinator, device.interval, cancel.child_token()))
        .collect();

    let mut statuses = Vec::with_capacity(handles.len());
    for result in join_all(handles).await {
        match result {
            Ok(coordinator) => statuses.push(coordinator.status()),
            Err(e) => error!("Polling task ended abnormally: {}", e),
        }
    }
    statuses
}
