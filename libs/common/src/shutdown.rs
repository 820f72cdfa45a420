//! Graceful shutdown utilities

use tracing::warn;

/// Signal that ended `wait_for_shutdown`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
}

impl std::fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShutdownSignal::Interrupt => f.write_str("SIGINT"),
            ShutdownSignal::Terminate => f.write_str("SIGTERM"),
        }
    }
}

/// Wait for Ctrl+C, or SIGTERM on Unix
///
/// ```ignore
/// let signal = common::shutdown::wait_for_shutdown().await;
/// info!("{} received, stopping", signal);
/// cancel.cancel();
/// ```
pub async fn wait_for_shutdown() -> ShutdownSignal {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut term_signal = match signal(SignalKind::terminate()) {
            Ok(sig) => Some(sig),
            Err(e) => {
                warn!("SIGTERM handler unavailable ({}), Ctrl+C only", e);
                None
            },
        };

        tokio::select! {
            _ = interrupt() => ShutdownSignal::Interrupt,
            _ = async {
                match term_signal.as_mut() {
                    Some(sig) => {
                        sig.recv().await;
                    },
                    None => std::future::pending::<()>().await,
                }
            } => ShutdownSignal::Terminate,
        }
    }
    #[cfg(not(unix))]
    {
        interrupt().await;
        ShutdownSignal::Interrupt
    }
}

async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Ctrl+C handler failed: {}", e);
        std::future::pending::<()>().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_display() {
        assert_eq!(ShutdownSignal::Interrupt.to_string(), "SIGINT");
        assert_eq!(ShutdownSignal::Terminate.to_string(), "SIGTERM");
    }
}
