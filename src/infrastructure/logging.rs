//! Logging system configuration and initialization.
//!
//! Console plus non-blocking file output through `tracing`, with the level
//! taken from the configuration and overridable via `RUST_LOG`. The
//! returned worker guards must stay alive for the life of the process or
//! buffered log lines are lost.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    fmt::{self, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

pub use crate::infrastructure::config::LoggingConfig;

/// UTC timestamps with millisecond precision.
struct UtcTimeFormatter;

impl FormatTime for UtcTimeFormatter {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Initializes the global subscriber. Call once, from the binary.
pub fn init_logging(config: &LoggingConfig, log_dir: &Path) -> Result<Vec<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    let mut guards = Vec::new();

    let console_layer = if config.console_output {
        Some(
            fmt::layer()
                .with_timer(UtcTimeFormatter)
                .with_target(false),
        )
    } else {
        None
    };

    let file_layer = if config.file_output {
        std::fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;
        let appender = rolling::daily(log_dir, &config.file_name);
        let (writer, guard) = non_blocking(appender);
        guards.push(guard);
        Some(
            fmt::layer()
                .with_timer(UtcTimeFormatter)
                .with_target(true)
                .with_ansi(false)
                .with_writer(writer),
        )
    } else {
        None
    };

    Registry::default()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    Ok(guards)
}
