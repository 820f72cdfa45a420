//! Polling coordinator
//!
//! Runs one full poll cycle per call: connect, read every block of the
//! device's command table, decode, merge. A cycle either publishes a complete
//! new snapshot or nothing; failures become `PollOutcome::Failed` and the
//! previous snapshot stays visible.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use renogy_comlink::{ComLinkError, DeviceType, RegisterTransport, DEFAULT_UNIT_ID};
use renogy_protocols::{build_frame, decode, lookup, CommandEntry, ParsedSnapshot};

use super::health::{DeviceHealth, HealthState};

/// Outcome channel depth; slow subscribers lag rather than block polling
const OUTCOME_CHANNEL_CAPACITY: usize = 16;

/// Who is being polled
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceIdentity {
    pub port: String,
    pub device_type: DeviceType,
    pub name: String,
}

fn serialize_error<S: Serializer>(err: &ComLinkError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&err.to_string())
}

/// Result of one poll cycle
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PollOutcome {
    /// New snapshot published
    Updated {
        fields: usize,
        timestamp: DateTime<Utc>,
    },
    /// Cycle failed; previous snapshot kept
    Failed {
        #[serde(serialize_with = "serialize_error")]
        error: ComLinkError,
        kind: &'static str,
        consecutive_failures: u32,
        available: bool,
        timestamp: DateTime<Utc>,
    },
    /// Device unavailable and its retry window has not elapsed; nothing was sent
    Skipped { timestamp: DateTime<Utc> },
}

impl PollOutcome {
    pub fn is_updated(&self) -> bool {
        matches!(self, PollOutcome::Updated { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, PollOutcome::Failed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, PollOutcome::Skipped { .. })
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            PollOutcome::Updated { timestamp, .. }
            | PollOutcome::Failed { timestamp, .. }
            | PollOutcome::Skipped { timestamp } => *timestamp,
        }
    }

    /// Error behind a failed or skipped cycle
    pub fn error(&self) -> Option<ComLinkError> {
        match self {
            PollOutcome::Updated { .. } => None,
            PollOutcome::Failed { error, .. } => Some(error.clone()),
            PollOutcome::Skipped { .. } => Some(ComLinkError::RetryWindowNotElapsed),
        }
    }
}

/// Point-in-time summary of one device
#[derive(Debug, Clone, Serialize)]
pub struct DeviceStatus {
    #[serde(flatten)]
    pub identity: DeviceIdentity,
    pub available: bool,
    pub health: HealthState,
    pub consecutive_failures: u32,
    pub last_updated: Option<DateTime<Utc>>,
    pub last_outcome: Option<PollOutcome>,
    pub data: ParsedSnapshot,
}

pub struct PollingCoordinator {
    identity: DeviceIdentity,
    commands: &'static [CommandEntry],
    unit_id: u8,
    transport: Box<dyn RegisterTransport>,
    health: DeviceHealth,
    snapshot_tx: watch::Sender<Arc<ParsedSnapshot>>,
    outcome_tx: broadcast::Sender<PollOutcome>,
    last_outcome: Option<PollOutcome>,
    last_updated: Option<DateTime<Utc>>,
}

impl PollingCoordinator {
    /// Fails with `UnsupportedDeviceType` before touching the transport
    pub fn new(
        identity: DeviceIdentity,
        transport: Box<dyn RegisterTransport>,
    ) -> Result<Self, ComLinkError> {
        let commands = lookup(identity.device_type)?;
        let health = DeviceHealth::new(identity.name.clone());
        let (snapshot_tx, _) = watch::channel(Arc::new(ParsedSnapshot::new()));
        let (outcome_tx, _) = broadcast::channel(OUTCOME_CHANNEL_CAPACITY);

        debug!(
            "Coordinator {}: {} on {}, {} blocks",
            identity.name,
            identity.device_type,
            identity.port,
            commands.len()
        );

        Ok(Self {
            identity,
            commands,
            unit_id: DEFAULT_UNIT_ID,
            transport,
            health,
            snapshot_tx,
            outcome_tx,
            last_outcome: None,
            last_updated: None,
        })
    }

    /// Replace the health tracker (custom failure threshold or retry window)
    pub fn with_health(mut self, health: DeviceHealth) -> Self {
        self.health = health;
        self
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn health(&self) -> &DeviceHealth {
        &self.health
    }

    pub fn is_available(&self) -> bool {
        self.health.is_available()
    }

    /// Last good snapshot; empty before the first success
    pub fn snapshot(&self) -> Arc<ParsedSnapshot> {
        self.snapshot_tx.borrow().clone()
    }

    pub fn subscribe_snapshot(&self) -> watch::Receiver<Arc<ParsedSnapshot>> {
        self.snapshot_tx.subscribe()
    }

    /// One outcome per `poll_once` call
    pub fn subscribe(&self) -> broadcast::Receiver<PollOutcome> {
        self.outcome_tx.subscribe()
    }

    pub fn last_outcome(&self) -> Option<&PollOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn status(&self) -> DeviceStatus {
        DeviceStatus {
            identity: self.identity.clone(),
            available: self.health.is_available(),
            health: self.health.state(),
            consecutive_failures: self.health.consecutive_failures(),
            last_updated: self.last_updated,
            last_outcome: self.last_outcome.clone(),
            data: self.snapshot().as_ref().clone(),
        }
    }

    /// Run one poll cycle and publish its outcome
    pub async fn poll_once(&mut self) -> PollOutcome {
        if !self.health.should_attempt() {
            debug!(
                "{}: unavailable, retry window not elapsed, skipping poll",
                self.identity.name
            );
            let outcome = PollOutcome::Skipped {
                timestamp: Utc::now(),
            };
            self.publish(outcome.clone());
            return outcome;
        }

        let outcome = match self.read_all().await {
            Ok(fields) => {
                self.health.report_success();
                let timestamp = Utc::now();
                let count = fields.len();
                self.snapshot_tx.send_replace(Arc::new(fields));
                self.last_updated = Some(timestamp);
                debug!("{}: poll ok, {} fields", self.identity.name, count);
                PollOutcome::Updated {
                    fields: count,
                    timestamp,
                }
            },
            Err(error) => {
                if error.needs_reconnect() {
                    self.transport.close().await;
                }
                self.health.report_failure();
                warn!("{}: poll failed: {}", self.identity.name, error);
                PollOutcome::Failed {
                    kind: error.kind(),
                    error,
                    consecutive_failures: self.health.consecutive_failures(),
                    available: self.health.is_available(),
                    timestamp: Utc::now(),
                }
            },
        };

        self.publish(outcome.clone());
        outcome
    }

    /// Connect if needed, then read and decode every block in table order
    ///
    /// Nothing is kept from a cycle that fails part way.
    async fn read_all(&mut self) -> Result<ParsedSnapshot, ComLinkError> {
        self.transport.connect().await?;

        let mut accumulator = ParsedSnapshot::new();
        for command in self.commands {
            let words = self
                .transport
                .read_holding_registers(command.register, command.word_count, self.unit_id)
                .await?;
            let frame = build_frame(self.unit_id, command.function_code, &words)?;
            let fields = decode(&frame, self.identity.device_type, command.register)?;

            debug!(
                "{}: {} @{} -> {} fields",
                self.identity.name,
                command.operation,
                command.register,
                fields.len()
            );
            // Later blocks win on key collisions
            accumulator.extend(fields);
        }

        Ok(accumulator)
    }

    fn publish(&mut self, outcome: PollOutcome) {
        // No receivers is fine
        let _ = self.outcome_tx.send(outcome.clone());
        self.last_outcome = Some(outcome);
    }

    /// Release the transport
    pub async fn close(&mut self) {
        self.transport.close().await;
        info!("{}: closed {}", self.identity.name, self.identity.port);
    }
}
