//! Global tracing subscriber setup.
//!
//! Layers: an `EnvFilter` (`RUST_LOG`, else the configured level), an optional
//! stderr formatter, an optional daily-rolling file, and an optional
//! [`LogForwardLayer`].

use crate::tracing_layer::{LogEvent, LogForwardLayer};
use formdesk_core::error::{FormdeskError, Result};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// What the global subscriber should write to.
pub struct LoggingOptions {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Directory for daily-rolling files; `None` disables file output.
    pub log_dir: Option<PathBuf>,
    /// File name prefix, e.g. `formdesk` -> `formdesk.log.2024-05-01`.
    pub file_prefix: String,
    pub stderr: bool,
    pub forward: Option<mpsc::UnboundedSender<LogEvent>>,
}

impl LoggingOptions {
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            log_dir: None,
            file_prefix: "formdesk".to_string(),
            stderr: true,
            forward: None,
        }
    }

    pub fn with_log_dir(mut self, log_dir: PathBuf) -> Self {
        self.log_dir = Some(log_dir);
        self
    }

    pub fn with_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_prefix = prefix.into();
        self
    }

    pub fn with_stderr(mut self, stderr: bool) -> Self {
        self.stderr = stderr;
        self
    }

    pub fn with_forwarding(mut self, sender: mpsc::UnboundedSender<LogEvent>) -> Self {
        self.forward = Some(sender);
        self
    }
}

/// Builds the filter from `RUST_LOG`, falling back to `level`, then `info`.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global subscriber.
///
/// The returned guard flushes the file writer on drop and must be held for
/// the lifetime of the process.
pub fn init_tracing(options: LoggingOptions) -> Result<Option<WorkerGuard>> {
    let (file_layer, guard) = match &options.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender =
                tracing_appender::rolling::daily(dir, format!("{}.log", options.file_prefix));
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let stderr_layer = options.stderr.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    let forward_layer = options.forward.map(LogForwardLayer::new);

    tracing_subscriber::registry()
        .with(env_filter(&options.level))
        .with(stderr_layer)
        .with(file_layer)
        .with(forward_layer)
        .try_init()
        .map_err(|e| FormdeskError::config(format!("tracing already initialized: {}", e)))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_falls_back() {
        // Must not panic on garbage directives.
        let _ = env_filter("[[[not a filter");
    }

    #[test]
    fn test_options_builder() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let options = LoggingOptions::new("debug")
            .with_log_dir(PathBuf::from("/tmp/logs"))
            .with_file_prefix("formdesk-console")
            .with_stderr(false)
            .with_forwarding(tx);

        assert_eq!(options.level, "debug");
        assert_eq!(options.file_prefix, "formdesk-console");
        assert!(!options.stderr);
        assert!(options.forward.is_some());
    }
}
