//! Structured logging setup
//!
//! Console output is pretty for humans or JSON for log shippers. File output rolls
//! hourly and keeps `retention_hours` files, which bounds disk use without a separate
//! cleanup job.
//!
//! `RUST_LOG` overrides the configured level when set.

use crate::config::LoggingConfig;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

const LOG_FILE_PREFIX: &str = "volume-refill";
const LOG_FILE_SUFFIX: &str = "log";

/// Install the global subscriber.
///
/// The returned guard flushes buffered file output when dropped; keep it alive for
/// the lifetime of the process.
pub fn init_logging(config: &LoggingConfig, log_dir: &Path) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.output.as_str() {
        "file" => init_file_logging(env_filter, config, log_dir).map(Some),
        "both" => init_combined_logging(env_filter, config, log_dir).map(Some),
        _ => {
            init_console_logging(env_filter, &config.format);
            Ok(None)
        }
    }
}

fn file_writer(config: &LoggingConfig, log_dir: &Path) -> Result<RollingFileAppender> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

    RollingFileAppender::builder()
        .rotation(Rotation::HOURLY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .max_log_files(config.retention_hours.max(1))
        .build(log_dir)
        .context("Failed to create rolling log file")
}

fn init_console_logging(filter: EnvFilter, format: &str) {
    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        "json" => {
            subscriber
                .with(
                    fmt::layer()
                        .json()
                        .with_current_span(true)
                        .with_span_list(true)
                        .with_target(true),
                )
                .init();
        }
        _ => {
            subscriber
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_ansi(true)
                        .with_span_events(FmtSpan::NONE),
                )
                .init();
        }
    }
}

fn init_file_logging(filter: EnvFilter, config: &LoggingConfig, log_dir: &Path) -> Result<WorkerGuard> {
    let (non_blocking, guard) = tracing_appender::non_blocking(file_writer(config, log_dir)?);

    let subscriber = tracing_subscriber::registry().with(filter);

    match config.format.as_str() {
        "json" => {
            subscriber
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(non_blocking)
                        .with_current_span(true)
                        .with_span_list(true),
                )
                .init();
        }
        _ => {
            subscriber
                .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                .init();
        }
    }

    Ok(guard)
}

fn init_combined_logging(filter: EnvFilter, config: &LoggingConfig, log_dir: &Path) -> Result<WorkerGuard> {
    let (non_blocking, guard) = tracing_appender::non_blocking(file_writer(config, log_dir)?);

    let subscriber = tracing_subscriber::registry().with(filter);

    match config.format.as_str() {
        "json" => {
            subscriber
                .with(fmt::layer().json().with_writer(std::io::stdout))
                .with(fmt::layer().json().with_writer(non_blocking))
                .init();
        }
        _ => {
            subscriber
                .with(fmt::layer().with_writer(std::io::stdout))
                .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
                .init();
        }
    }

    Ok(guard)
}

/// Id attached to each monitoring cycle's span
pub fn new_cycle_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..12].to_string()
}
