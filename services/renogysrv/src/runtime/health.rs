//! Device availability tracking
//!
//! Counts consecutive poll failures, flips a device to unavailable after
//! `MAX_FAILURES`, and then allows a single probe per retry window until a
//! success clears it.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, error, info};

/// Consecutive failures before a device is marked unavailable
pub const MAX_FAILURES: u32 = 3;

/// Minimum time between probes of an unavailable device
pub const UNAVAILABLE_RETRY_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Externally visible health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "failures", rename_all = "snake_case")]
pub enum HealthState {
    Available,
    /// Still available, with this many consecutive failures
    Degraded(u32),
    Unavailable,
}

#[derive(Debug, Clone)]
pub struct DeviceHealth {
    name: String,
    max_failures: u32,
    retry_interval: Duration,
    consecutive_failures: u32,
    available: bool,
    last_unavailable_at: Option<Instant>,
}

impl DeviceHealth {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_policy(name, MAX_FAILURES, UNAVAILABLE_RETRY_INTERVAL)
    }

    pub fn with_policy(
        name: impl Into<String>,
        max_failures: u32,
        retry_interval: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            max_failures: max_failures.max(1),
            retry_interval,
            consecutive_failures: 0,
            available: true,
            last_unavailable_at: None,
        }
    }

    pub fn state(&self) -> HealthState {
        match (self.available, self.consecutive_failures) {
            (false, _) => HealthState::Unavailable,
            (true, 0) => HealthState::Available,
            (true, n) => HealthState::Degraded(n),
        }
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn max_failures(&self) -> u32 {
        self.max_failures
    }

    /// Start of the current retry window, set only while unavailable
    pub fn last_unavailable_at(&self) -> Option<Instant> {
        self.last_unavailable_at
    }

    pub fn report_success(&mut self) {
        if self.consecutive_failures > 0 {
            info!(
                "{}: communication restored after {} consecutive failures",
                self.name, self.consecutive_failures
            );
        }
        self.consecutive_failures = 0;

        if !self.available {
            self.available = true;
            self.last_unavailable_at = None;
            info!("{} is now available", self.name);
        }
    }

    pub fn report_failure(&mut self) {
        self.report_failure_at(Instant::now());
    }

    pub fn report_failure_at(&mut self, now: Instant) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);

        if self.available && self.consecutive_failures >= self.max_failures {
            self.available = false;
            self.last_unavailable_at = Some(now);
            error!(
                "{} marked unavailable after {} consecutive polling failures",
                self.name, self.consecutive_failures
            );
        } else {
            debug!(
                "{}: failure {}/{}",
                self.name, self.consecutive_failures, self.max_failures
            );
        }
    }

    /// Whether a poll may run now
    ///
    /// Always true while available. While unavailable, true once per
    /// retry window; granting the attempt restarts the window.
    pub fn should_attempt(&mut self) -> bool {
        self.should_attempt_at(Instant::now())
    }

    pub fn should_attempt_at(&mut self, now: Instant) -> bool {
        if self.available {
            return true;
        }

        match self.last_unavailable_at {
            Some(since) if now.duration_since(since) < self.retry_interval => false,
            _ => {
                self.last_unavailable_at = Some(now);
                info!(
                    "{}: retry window elapsed, attempting to reconnect",
                    self.name
                );
                true
            },
        }
    }
}
