//! Unified logging module for Renogy services
//!
//! Console output always; a daily rolling file when a log directory is configured.

use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::Writer, FmtContext, FormatEvent, FormatFields},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Custom format for log level with brackets: `[INFO]`, `[WARN]`, etc.
fn format_level(level: &Level) -> &'static str {
    match *level {
        Level::TRACE => "[TRACE]",
        Level::DEBUG => "[DEBUG]",
        Level::INFO => "[INFO]",
        Level::WARN => "[WARN]",
        Level::ERROR => "[ERROR]",
    }
}

/// Custom event formatter that outputs: `timestamp [LEVEL] message`
///
/// Example output: `2025-12-02T00:50:44.809123Z [INFO] renogysrv started`
struct BracketedLevelFormat;

impl<S, N> FormatEvent<S, N> for BracketedLevelFormat
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let now = chrono::Utc::now();
        write!(writer, "{} ", now.format("%Y-%m-%dT%H:%M:%S%.6fZ"))?;

        let level = *event.metadata().level();
        if writer.has_ansi_escapes() {
            let color = match level {
                Level::TRACE => "\x1b[35m", // magenta
                Level::DEBUG => "\x1b[34m", // blue
                Level::INFO => "\x1b[32m",  // green
                Level::WARN => "\x1b[33m",  // yellow
                Level::ERROR => "\x1b[31m", // red
            };
            write!(writer, "{}{}\x1b[0m ", color, format_level(&level))?;
        } else {
            write!(writer, "{} ", format_level(&level))?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

// File writer guards must outlive the subscriber
static GUARDS: OnceLock<Mutex<Vec<WorkerGuard>>> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Service name, used as the filter target and the log file prefix
    pub service_name: String,
    /// Directory for rolling log files; console only when `None`
    pub log_dir: Option<PathBuf>,
    /// Level for the service's own targets when `RUST_LOG` is unset
    pub console_level: Level,
    /// Write the file layer as JSON lines
    pub enable_json: bool,
    /// ANSI colors on the console
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".to_string(),
            log_dir: None,
            console_level: Level::INFO,
            enable_json: false,
            ansi: true,
        }
    }
}

/// Filter directive used when `RUST_LOG` is not set
///
/// Dependencies stay at `info`; the service's own crates follow `level`.
fn default_directive(service_name: &str, level: Level) -> String {
    let level = level.as_str().to_lowercase();
    format!(
        "info,{}={},renogy_protocols={},renogy_comlink={}",
        service_name.replace('-', "_"),
        level,
        level,
        level
    )
}

fn build_filter(config: &LogConfig) -> EnvFilter {
    match std::env::var("RUST_LOG") {
        Ok(env_str) if !env_str.trim().is_empty() => EnvFilter::new(env_str),
        _ => EnvFilter::new(default_directive(
            &config.service_name,
            config.console_level,
        )),
    }
}

fn keep_guard(guard: WorkerGuard) {
    let guards = GUARDS.get_or_init(|| Mutex::new(Vec::new()));
    match guards.lock() {
        Ok(mut guards) => guards.push(guard),
        Err(poisoned) => {
            eprintln!("Warning: GUARDS lock was poisoned, recovering...");
            poisoned.into_inner().push(guard);
        },
    }
}

/// Initialize logging system with configuration
pub fn init_with_config(config: LogConfig) -> Result<(), Box<dyn std::error::Error>> {
    let console_layer = fmt::layer()
        .with_ansi(config.ansi)
        .event_format(BracketedLevelFormat)
        .boxed();

    let file_layer = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender =
                tracing_appender::rolling::daily(dir, format!("{}.log", config.service_name));
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            keep_guard(guard);

            let layer = if config.enable_json {
                fmt::layer()
                    .json()
                    .with_writer(non_blocking)
                    .with_target(true)
                    .boxed()
            } else {
                fmt::layer()
                    .with_writer(non_blocking)
                    .with_ansi(false)
                    .event_format(BracketedLevelFormat)
                    .boxed()
            };
            Some(layer)
        },
        None => None,
    };

    tracing_subscriber::registry()
        .with(build_filter(&config))
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    match &config.log_dir {
        Some(dir) => tracing::info!("Logging: {} @ {:?}", config.service_name, dir),
        None => tracing::debug!("Logging: {} (console only)", config.service_name),
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_format_level() {
        assert_eq!(format_level(&Level::INFO), "[INFO]");
        assert_eq!(format_level(&Level::ERROR), "[ERROR]");
        assert_eq!(format_level(&Level::TRACE), "[TRACE]");
    }

    #[test]
    fn test_default_directive() {
        assert_eq!(
            default_directive("renogysrv", Level::DEBUG),
            "info,renogysrv=debug,renogy_protocols=debug,renogy_comlink=debug"
        );
        assert!(default_directive("renogy-srv", Level::WARN).starts_with("info,renogy_srv=warn"));
    }

    #[test]
    fn test_log_config_default() {
        let config = LogConfig::default();
        assert!(config.log_dir.is_none());
        assert_eq!(config.console_level, Level::INFO);
        assert!(config.ansi);
    }

    // Only test in this crate that installs the global subscriber
    #[test]
    fn test_init_creates_log_dir() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("logs");
        let config = LogConfig {
            service_name: "renogysrv-test".to_string(),
            log_dir: Some(dir.clone()),
            ansi: false,
            ..Default::default()
        };

        init_with_config(config).unwrap();
        assert!(dir.is_dir());

        // Second install is rejected, not a panic
        assert!(init_with_config(LogConfig::default()).is_err());
    }
}
