//! Logging setup and the log sink used by framework collaborators.
//!
//! Framework internals log through `tracing` directly. Diagnostics that are
//! part of the module contract (unsupported outputs, options errors) go
//! through a [`LogService`] resolved from the context, so they can be
//! captured and asserted on.

use crate::config::LoggingSettings;
use crate::error::{FrameworkError, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Best-effort log sink. Implementations must never panic.
#[cfg_attr(test, mockall::automock)]
pub trait LogService: Send + Sync {
    fn warn(&self, message: &str);
    fn error(&self, message: &str);

    /// Error with the cause chain appended to the message.
    fn error_with(&self, message: &str, cause: &anyhow::Error) {
        self.error(&format!("{}: {:#}", message, cause));
    }
}

/// Forwards to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl LogService for TracingLog {
    fn warn(&self, message: &str) {
        tracing::warn!("{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!("{}", message);
    }

    fn error_with(&self, message: &str, cause: &anyhow::Error) {
        let cause = format!("{:#}", cause);
        tracing::error!(%cause, "{}", message);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Warn,
    Error,
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Records entries in memory (and forwards them to `tracing`).
#[derive(Debug, Default)]
pub struct MemoryLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.messages(LogLevel::Warn)
    }

    pub fn errors(&self) -> Vec<String> {
        self.messages(LogLevel::Error)
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    fn messages(&self, level: LogLevel) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.level == level)
            .map(|e| e.message.clone())
            .collect()
    }

    fn record(&self, level: LogLevel, message: &str) {
        self.entries.lock().push(LogEntry {
            level,
            message: message.to_string(),
            timestamp: Utc::now(),
        });
    }
}

impl LogService for MemoryLog {
    fn warn(&self, message: &str) {
        TracingLog.warn(message);
        self.record(LogLevel::Warn, message);
    }

    fn error(&self, message: &str) {
        TracingLog.error(message);
        self.record(LogLevel::Error, message);
    }

    fn error_with(&self, message: &str, cause: &anyhow::Error) {
        TracingLog.error_with(message, cause);
        self.record(LogLevel::Error, &format!("{}: {:#}", message, cause));
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the configured filter. When file logging is enabled
/// the returned guard must be kept alive to flush the writer.
pub fn init_logging(settings: &LoggingSettings) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.filter))
        .map_err(|e| FrameworkError::Config(format!("Invalid log filter: {}", e)))?;

    let log_dir = settings
        .log_dir
        .clone()
        .or_else(|| crate::config::app_data_dir().map(|d| d.join("logs")))
        .filter(|_| settings.log_to_file);
    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            let appender = tracing_appender::rolling::daily(&dir, &settings.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .try_init()
        .map_err(|e| FrameworkError::Config(format!("Failed to initialize logging: {}", e)))?;

    Ok(guard)
}
