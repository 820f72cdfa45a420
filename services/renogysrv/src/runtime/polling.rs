//! Interval-driven polling task

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::coordinator::{PollOutcome, PollingCoordinator};

/// Poll `coordinator` every `period` until `cancel` fires
///
/// The first cycle runs immediately. Ticks that fall due while a cycle is
/// still running are skipped, so polls never overlap. Cancellation drops any
/// in-flight cycle unpublished, closes the transport, and hands the
/// coordinator back through the join handle.
pub fn spawn_polling_task(
    mut coordinator: PollingCoordinator,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<PollingCoordinator> {
    tokio::spawn(async move {
        let name = coordinator.identity().name.clone();
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("{}: polling every {:?}", name, period);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {},
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("{}: in-flight poll cancelled", name);
                    break;
                },
                outcome = coordinator.poll_once() => {
                    if let PollOutcome::Skipped { .. } = outcome {
                        debug!("{}: skipped", name);
                    }
                },
            }
        }

        coordinator.close().await;
        info!("{}: polling stopped", name);
        coordinator
    })
}
