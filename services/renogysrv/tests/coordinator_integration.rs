//! Polling Coordinator Integration Tests
//!
//! Full poll cycles against the scripted in-memory transport:
//! - snapshot retention across failed polls
//! - availability after consecutive failures
//! - retry window gating
//! - unsupported device types

#![allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable

use std::time::Duration;

use renogy_comlink::{ComLinkError, DeviceType, TransportError};
use renogy_protocols::{FieldKey, FieldValue};
use renogysrv::runtime::test_utils::{controller_blocks, controller_identity, ScriptedTransport};
use renogysrv::runtime::{DeviceHealth, HealthState, PollOutcome, PollingCoordinator};

fn coordinator_with(transport: ScriptedTransport) -> PollingCoordinator {
    PollingCoordinator::new(controller_identity("/dev/ttyUSB0"), Box::new(transport)).unwrap()
}

// ============================================================================
// Snapshot Tests
// ============================================================================

#[tokio::test]
async fn test_successful_poll_decodes_all_blocks() {
    let mut coordinator = coordinator_with(ScriptedTransport::controller("/dev/ttyUSB0"));

    assert!(coordinator.poll_once().await.is_updated());

    let snapshot = coordinator.snapshot();
    assert_eq!(snapshot[&FieldKey::Model], FieldValue::from("RNG-CTRL-RVR40"));
    assert_eq!(snapshot[&FieldKey::DeviceId], FieldValue::Int(16));
    assert_eq!(snapshot[&FieldKey::BatteryType], FieldValue::from("lithium"));
    assert_eq!(snapshot[&FieldKey::BatteryVoltage], FieldValue::Float(12.6));
    assert_eq!(snapshot[&FieldKey::PvVoltage], FieldValue::Float(18.3));
    assert_eq!(snapshot[&FieldKey::ControllerTemperature], FieldValue::Int(25));
    assert_eq!(snapshot[&FieldKey::BatteryTemperature], FieldValue::Int(22));
    assert_eq!(snapshot[&FieldKey::PowerGenerationTotal], FieldValue::Int(48_213));
    assert_eq!(snapshot[&FieldKey::LoadStatus], FieldValue::from("on"));
    assert_eq!(snapshot[&FieldKey::ChargingStatus], FieldValue::from("mppt"));
}

#[tokio::test]
async fn test_failed_poll_keeps_previous_snapshot() {
    let transport = ScriptedTransport::controller("/dev/ttyUSB0");
    let script = transport.script();
    let mut coordinator = coordinator_with(transport);

    coordinator.poll_once().await;
    let before = coordinator.snapshot();
    assert_eq!(before[&FieldKey::BatteryVoltage], FieldValue::Float(12.6));

    script.fail_reads(1, TransportError::timeout("no answer"));
    let outcome = coordinator.poll_once().await;

    assert!(outcome.is_failed());
    assert_eq!(coordinator.snapshot(), before);
    assert!(coordinator.is_available());
    assert_eq!(coordinator.health().state(), HealthState::Degraded(1));
}

#[tokio::test]
async fn test_partial_cycle_is_discarded() {
    // Every block but the PV block answers
    let transport = ScriptedTransport::new("/dev/ttyUSB0");
    let script = transport.script();
    for (register, words) in controller_blocks() {
        if register != 256 {
            script.set_block(register, words);
        }
    }
    let mut coordinator = coordinator_with(transport);

    let outcome = coordinator.poll_once().await;

    assert!(matches!(outcome, PollOutcome::Failed { kind: "protocol", .. }));
    assert_eq!(script.read_registers(), vec![12, 26, 57348, 256]);
    assert!(coordinator.snapshot().is_empty());
}

#[tokio::test]
async fn test_snapshot_watch_and_outcome_broadcast() {
    let transport = ScriptedTransport::controller("/dev/ttyUSB0");
    let script = transport.script();
    let mut coordinator = coordinator_with(transport);
    let mut snapshots = coordinator.subscribe_snapshot();
    let mut outcomes = coordinator.subscribe();

    coordinator.poll_once().await;
    assert!(snapshots.has_changed().unwrap());
    assert_eq!(
        snapshots.borrow_and_update()[&FieldKey::PvPower],
        FieldValue::Int(57)
    );
    assert!(outcomes.recv().await.unwrap().is_updated());

    script.fail_reads(1, TransportError::protocol("Modbus exception 0x04"));
    coordinator.poll_once().await;
    assert!(!snapshots.has_changed().unwrap());

    match outcomes.recv().await.unwrap() {
        PollOutcome::Failed { error, .. } => {
            assert_eq!(
                error,
                ComLinkError::Transport(TransportError::protocol("Modbus exception 0x04"))
            );
        },
        other => panic!("unexpected outcome {:?}", other),
    }
    assert!(coordinator.last_outcome().unwrap().is_failed());
}

// ============================================================================
// Availability Tests
// ============================================================================

#[tokio::test]
async fn test_unavailable_after_three_failures() {
    let transport = ScriptedTransport::controller("/dev/ttyUSB0");
    let script = transport.script();
    script.fail_connect(Some(TransportError::connect("no such port")));
    let mut coordinator = coordinator_with(transport);

    for expected_available in [true, true, false] {
        let outcome = coordinator.poll_once().await;
        match outcome {
            PollOutcome::Failed {
                kind, available, ..
            } => {
                assert_eq!(kind, "connect");
                assert_eq!(available, expected_available);
            },
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    assert!(!coordinator.is_available());
    assert_eq!(coordinator.health().consecutive_failures(), 3);
    assert_eq!(script.reads(), 0);
    // Connect failures close the link so the next attempt reopens it
    assert_eq!(script.closes(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_retry_window_gates_transport_activity() {
    let transport = ScriptedTransport::controller("/dev/ttyUSB0");
    let script = transport.script();
    script.fail_connect(Some(TransportError::connect("no such port")));
    let mut coordinator = coordinator_with(transport);

    for _ in 0..3 {
        coordinator.poll_once().await;
    }
    let operations = script.operations();

    // Inside the window: skipped, nothing sent
    assert!(coordinator.poll_once().await.is_skipped());
    tokio::time::advance(Duration::from_secs(599)).await;
    assert!(coordinator.poll_once().await.is_skipped());
    assert_eq!(script.operations(), operations);

    // Window elapsed: one probe, which fails again
    tokio::time::advance(Duration::from_secs(1)).await;
    assert!(coordinator.poll_once().await.is_failed());
    assert!(script.operations() > operations);
    assert!(coordinator.poll_once().await.is_skipped());

    // Device back: the next probe restores availability
    script.fail_connect(None);
    tokio::time::advance(Duration::from_secs(600)).await;
    assert!(coordinator.poll_once().await.is_updated());
    assert!(coordinator.is_available());
    assert_eq!(coordinator.health().state(), HealthState::Available);
    assert!(coordinator.poll_once().await.is_updated());
}

#[tokio::test(start_paused = true)]
async fn test_custom_health_policy() {
    let transport = ScriptedTransport::controller("/dev/ttyUSB0");
    let script = transport.script();
    let health = DeviceHealth::with_policy("/dev/ttyUSB0", 1, Duration::from_secs(30));
    let mut coordinator = coordinator_with(transport).with_health(health);

    script.fail_reads(1, TransportError::timeout("no answer"));
    assert!(coordinator.poll_once().await.is_failed());
    assert!(!coordinator.is_available());

    tokio::time::advance(Duration::from_secs(29)).await;
    assert!(coordinator.poll_once().await.is_skipped());

    tokio::time::advance(Duration::from_secs(1)).await;
    assert!(coordinator.poll_once().await.is_updated());
    assert!(coordinator.is_available());
}

#[tokio::test]
async fn test_success_resets_failure_count() {
    let transport = ScriptedTransport::controller("/dev/ttyUSB0");
    let script = transport.script();
    let mut coordinator = coordinator_with(transport);

    script.fail_reads(2, TransportError::timeout("no answer"));
    coordinator.poll_once().await;
    coordinator.poll_once().await;
    assert_eq!(coordinator.health().consecutive_failures(), 2);

    assert!(coordinator.poll_once().await.is_updated());
    assert_eq!(coordinator.health().consecutive_failures(), 0);

    // Two more failures do not reach the threshold
    script.fail_reads(2, TransportError::timeout("no answer"));
    coordinator.poll_once().await;
    coordinator.poll_once().await;
    assert!(coordinator.is_available());
}

// ============================================================================
// Setup Tests
// ============================================================================

#[tokio::test]
async fn test_unsupported_device_type_fails_fast() {
    for device_type in [DeviceType::Battery, DeviceType::Inverter] {
        let transport = ScriptedTransport::controller("/dev/ttyUSB0");
        let script = transport.script();
        let mut identity = controller_identity("/dev/ttyUSB0");
        identity.device_type = device_type;

        let result = PollingCoordinator::new(identity, Box::new(transport));

        assert!(matches!(
            result,
            Err(ComLinkError::UnsupportedDeviceType(t)) if t == device_type
        ));
        assert_eq!(script.operations(), 0);
    }
}
