//! Polling Runtime Integration Tests
//!
//! Interval-driven polling tasks and the per-device service wiring, on a
//! paused tokio clock.

#![allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use renogy_comlink::{ComLinkError, DeviceType, RegisterTransport, TransportError};
use renogy_protocols::{FieldKey, FieldValue};
use renogysrv::core::config::{AppConfig, DeviceConfig};
use renogysrv::runtime::test_utils::{controller_identity, ScriptedTransport, TransportScript};
use renogysrv::runtime::{
    build_devices, poll_once_all, run_until_cancelled, spawn_polling_task, PollingCoordinator,
};
use renogysrv::RenogySrvError;

const PERIOD: Duration = Duration::from_secs(60);

fn controller(port: &str) -> (PollingCoordinator, TransportScript) {
    let transport = ScriptedTransport::controller(port);
    let script = transport.script();
    let coordinator =
        PollingCoordinator::new(controller_identity(port), Box::new(transport)).unwrap();
    (coordinator, script)
}

// ============================================================================
// Polling Task Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_first_poll_is_immediate_then_periodic() {
    let (coordinator, script) = controller("/dev/ttyUSB0");
    let mut outcomes = coordinator.subscribe();
    let started = Instant::now();
    let cancel = CancellationToken::new();

    let handle = spawn_polling_task(coordinator, PERIOD, cancel.clone());

    assert!(outcomes.recv().await.unwrap().is_updated());
    assert_eq!(Instant::now() - started, Duration::ZERO);
    assert_eq!(script.reads(), 4);

    assert!(outcomes.recv().await.unwrap().is_updated());
    assert_eq!(Instant::now() - started, PERIOD);
    assert_eq!(script.reads(), 8);

    cancel.cancel();
    let coordinator = handle.await.unwrap();
    assert!(coordinator.is_available());
    assert_eq!(script.closes(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_loop_survives_failures() {
    let (coordinator, script) = controller("/dev/ttyUSB0");
    script.fail_reads(2, TransportError::timeout("no answer"));
    let mut outcomes = coordinator.subscribe();
    let cancel = CancellationToken::new();

    let handle = spawn_polling_task(coordinator, PERIOD, cancel.clone());

    assert!(outcomes.recv().await.unwrap().is_failed());
    assert!(outcomes.recv().await.unwrap().is_failed());
    assert!(outcomes.recv().await.unwrap().is_updated());

    cancel.cancel();
    let coordinator = handle.await.unwrap();
    assert_eq!(coordinator.health().consecutive_failures(), 0);
    assert_eq!(
        coordinator.snapshot()[&FieldKey::BatteryVoltage],
        FieldValue::Float(12.6)
    );
}

#[tokio::test(start_paused = true)]
async fn test_slow_cycle_coalesces_missed_ticks() {
    let (coordinator, script) = controller("/dev/ttyUSB0");
    // Four reads of 40s each: a 160s cycle against a 60s period
    script.delay_reads(Some(Duration::from_secs(40)));
    let mut outcomes = coordinator.subscribe();
    let started = Instant::now();
    let cancel = CancellationToken::new();

    let handle = spawn_polling_task(coordinator, PERIOD, cancel.clone());
    for _ in 0..4 {
        assert!(outcomes.recv().await.unwrap().is_updated());
    }
    cancel.cancel();
    handle.await.unwrap();

    assert_eq!(script.max_concurrent_reads(), 1);
    assert!(script.reads() >= 16);

    // Each cycle starts with its first block; starts are one cycle apart
    let cycle_starts: Vec<u64> = script
        .read_times()
        .iter()
        .step_by(4)
        .map(|at| (*at - started).as_secs())
        .collect();
    assert_eq!(&cycle_starts[..4], &[0, 160, 320, 480]);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_drops_in_flight_read() {
    let (coordinator, script) = controller("/dev/ttyUSB0");
    script.stall_reads(true);
    let cancel = CancellationToken::new();

    let handle = spawn_polling_task(coordinator, PERIOD, cancel.clone());
    while script.reads() == 0 {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    cancel.cancel();
    let coordinator = handle.await.unwrap();

    // Nothing published from the abandoned cycle; link released
    assert!(coordinator.last_outcome().is_none());
    assert!(coordinator.snapshot().is_empty());
    assert_eq!(script.reads(), 1);
    assert_eq!(script.closes(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_before_start() {
    let (coordinator, script) = controller("/dev/ttyUSB0");
    let cancel = CancellationToken::new();
    cancel.cancel();

    let coordinator = spawn_polling_task(coordinator, PERIOD, cancel).await.unwrap();

    assert!(coordinator.last_outcome().is_none());
    assert_eq!(script.connects(), 0);
}

// ============================================================================
// Service Wiring Tests
// ============================================================================

fn two_device_config() -> AppConfig {
    let mut second = DeviceConfig::new("/dev/ttyUSB1");
    second.name = Some("Garage".to_string());
    second.scan_interval = 30;
    AppConfig {
        devices: vec![DeviceConfig::new("/dev/ttyUSB0"), second],
        ..Default::default()
    }
}

fn scripted(device: &DeviceConfig) -> Box<dyn RegisterTransport> {
    Box::new(ScriptedTransport::controller(device.port.clone()))
}

#[tokio::test]
async fn test_build_devices_uses_config() {
    let devices = build_devices(&two_device_config(), scripted).unwrap();

    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].interval, Duration::from_secs(60));
    assert_eq!(devices[1].interval, Duration::from_secs(30));
    assert_eq!(devices[1].coordinator.identity().name, "Garage");
    assert_eq!(devices[0].coordinator.identity().name, "/dev/ttyUSB0");
}

#[tokio::test]
async fn test_build_devices_rejects_unsupported_type() {
    let mut config = two_device_config();
    config.devices[1].device_type = DeviceType::Inverter;

    let err = build_devices(&config, scripted).err().unwrap();

    assert!(matches!(
        err,
        RenogySrvError::ComLinkError(ComLinkError::UnsupportedDeviceType(DeviceType::Inverter))
    ));
}

#[tokio::test]
async fn test_poll_once_all() {
    let devices = build_devices(&two_device_config(), scripted).unwrap();

    let statuses = poll_once_all(devices).await;

    assert_eq!(statuses.len(), 2);
    for status in &statuses {
        assert!(status.available);
        assert!(status.last_updated.is_some());
        assert_eq!(status.data[&FieldKey::BatteryVoltage], FieldValue::Float(12.6));
    }
    let json = serde_json::to_value(&statuses).unwrap();
    assert_eq!(json[1]["name"], "Garage");
}

#[tokio::test(start_paused = true)]
async fn test_run_until_cancelled() {
    let devices = build_devices(&two_device_config(), scripted).unwrap();
    let mut outcomes: Vec<_> = devices.iter().map(|d| d.coordinator.subscribe()).collect();
    let cancel = CancellationToken::new();

    let service = tokio::spawn(run_until_cancelled(devices, cancel.clone()));
    for rx in &mut outcomes {
        assert!(rx.recv().await.unwrap().is_updated());
    }
    cancel.cancel();

    let statuses = service.await.unwrap();
    assert_eq!(statuses.len(), 2);
    assert!(statuses.iter().all(|s| s.available && !s.data.is_empty()));
}
