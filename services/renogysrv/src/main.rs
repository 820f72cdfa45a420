//! Renogy Polling Service
//!
//! Polls every configured device on its own interval until SIGINT/SIGTERM.

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

use renogysrv::{
    core::{
        bootstrap::{self, Args},
        config::AppConfig,
    },
    error::RenogySrvError,
    runtime::{build_devices, poll_once_all, run_until_cancelled, serial_transport},
};

#[tokio::main]
async fn main() -> Result<(), RenogySrvError> {
    let args = Args::parse();

    let config = AppConfig::load(args.config.as_deref())?;
    bootstrap::initialize_logging(&args, &config.service)?;
    config.validate()?;

    if args.validate {
        bootstrap::describe_devices(&config);
        println!("{}", config.to_yaml()?);
        info!("Validation completed successfully");
        return Ok(());
    }

    // Unsupported device types stop the service here, before any port is opened
    let devices = build_devices(&config, serial_transport)?;

    if args.once {
        let statuses = poll_once_all(devices).await;
        bootstrap::describe_statuses(&statuses);
        println!("{}", serde_json::to_string_pretty(&statuses)?);
        return Ok(());
    }

    info!("{} v{} starting", config.service.name, env!("CARGO_PKG_VERSION"));
    let cancel = CancellationToken::new();
    let service = tokio::spawn(run_until_cancelled(devices, cancel.clone()));

    let signal = common::shutdown::wait_for_shutdown().await;
    info!("{} received, shutting down", signal);
    cancel.cancel();

    let statuses = service.await?;
    for status in &statuses {
        info!(
            "{}: stopped ({} consecutive failures)",
            status.identity.name, status.consecutive_failures
        );
    }
    info!("{} stopped", config.service.name);
    Ok(())
}
