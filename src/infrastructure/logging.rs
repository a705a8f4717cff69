//! Subscriber setup for the binary
//!
//! Console output goes to stderr so the REPL keeps stdout for answers. A
//! rolling daily `app.log` mirrors the console, and with auditing enabled
//! the per-turn `audit` events are also written as JSON lines.

use std::path::Path;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::Targets,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

use crate::config::{LogFormat, LoggingConfig};
use crate::domain::DomainError;

pub const APP_LOG_FILE: &str = "app.log";
pub const AUDIT_LOG_FILE: &str = "audit.jsonl";
pub const AUDIT_TARGET: &str = "audit";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Keeps the background log writers alive; drop it last
#[must_use]
pub struct LoggingGuard {
    _guards: Vec<WorkerGuard>,
}

/// `RUST_LOG` wins over the configured level
fn level_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

fn console_layer(config: &LoggingConfig) -> BoxedLayer {
    let layer: BoxedLayer = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_span_events(FmtSpan::CLOSE)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed(),
    };

    layer.with_filter(level_filter(&config.level)).boxed()
}

fn file_layer(directory: &Path, level: &str, guards: &mut Vec<WorkerGuard>) -> BoxedLayer {
    let appender = tracing_appender::rolling::daily(directory, APP_LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    guards.push(guard);

    fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_filter(level_filter(level))
        .boxed()
}

fn audit_layer(directory: &Path, guards: &mut Vec<WorkerGuard>) -> BoxedLayer {
    let appender = tracing_appender::rolling::never(directory, AUDIT_LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    guards.push(guard);

    // INFO regardless of the console level
    fmt::layer()
        .json()
        .with_writer(writer)
        .with_current_span(false)
        .with_span_list(false)
        .with_filter(Targets::new().with_target(AUDIT_TARGET, Level::INFO))
        .boxed()
}

pub fn init_logging(config: &LoggingConfig, audit: bool) -> Result<LoggingGuard, DomainError> {
    std::fs::create_dir_all(&config.directory).map_err(|e| {
        DomainError::configuration(format!(
            "cannot create log directory {}: {}",
            config.directory.display(),
            e
        ))
    })?;

    let mut guards = Vec::new();
    let mut layers = vec![
        console_layer(config),
        file_layer(&config.directory, &config.level, &mut guards),
    ];
    if audit {
        layers.push(audit_layer(&config.directory, &mut guards));
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| DomainError::configuration(format!("logging already initialized: {}", e)))?;

    tracing::info!(
        level = %config.level,
        directory = %config.directory.display(),
        audit,
        "Logging initialized"
    );

    Ok(LoggingGuard { _guards: guards })
}
