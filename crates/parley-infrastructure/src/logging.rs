//! Tracing subscriber setup.
//!
//! Logs always go to stderr. With `log_to_file` set they are also written
//! to a daily rolling file (`parley.log.YYYY-MM-DD`) in the logs directory.

use crate::paths::ParleyPaths;
use parley_core::config::LoggingConfig;
use parley_core::error::{ParleyError, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Builds the filter from `RUST_LOG`, falling back to the configured one.
fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter))
}

/// Installs the global tracing subscriber.
///
/// Keep the returned guard alive for as long as the process logs; dropping
/// it flushes and stops the file writer.
///
/// # Errors
///
/// Fails if the logs directory cannot be resolved or created, or if a
/// global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    let (file_layer, guard) = if config.log_to_file {
        let directory = match &config.directory {
            Some(directory) => directory.clone(),
            None => ParleyPaths::logs_dir()?,
        };
        std::fs::create_dir_all(&directory)?;
        let appender = tracing_appender::rolling::daily(&directory, "parley.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .with_file(true)
            .with_line_number(true);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| ParleyError::internal(format!("Failed to set tracing subscriber: {e}")))?;

    tracing::debug!(filter = %config.filter, file = config.log_to_file, "Logging initialized");
    Ok(guard)
}
