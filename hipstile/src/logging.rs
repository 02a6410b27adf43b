//! Tracing subscriber setup shared by binaries embedding the engine.

use std::path::PathBuf;

use thiserror::Error;
pub use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "hipstile=info";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to create log directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("a global subscriber is already installed: {0}")]
    AlreadyInitialized(String),
}

/// Where and how verbosely to log.
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Filter directive used when `RUST_LOG` is unset, in place of
    /// [`DEFAULT_FILTER`].
    pub filter: Option<String>,
    /// Also append to a daily-rolling file in this directory.
    pub directory: Option<PathBuf>,
}

impl LogOptions {
    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let directive = self.filter.as_deref().unwrap_or(DEFAULT_FILTER);
            EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
        })
    }
}

/// Install the global subscriber: stderr always, plus a file when
/// `options.directory` is set.
///
/// The returned guard flushes the file writer on drop and must be held for
/// the life of the process.
pub fn init_logging(options: &LogOptions) -> Result<Option<WorkerGuard>, LoggingError> {
    let stderr = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let (file, guard) = match &options.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|source| LoggingError::Directory {
                path: dir.clone(),
                source,
            })?;
            let appender = tracing_appender::rolling::daily(dir, "hipstile.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false).boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(options.env_filter())
        .with(stderr)
        .with(file)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    // One test owns RUST_LOG so parallel tests never observe each other's value.
    #[test]
    fn test_rust_log_takes_precedence() {
        let options = LogOptions {
            filter: Some("hipstile=debug".to_string()),
            directory: None,
        };

        std::env::set_var("RUST_LOG", "warn");
        assert_eq!(options.env_filter().to_string(), "warn");

        std::env::remove_var("RUST_LOG");
        assert_eq!(options.env_filter().to_string(), "hipstile=debug");
        assert_eq!(
            LogOptions::default().env_filter().to_string(),
            DEFAULT_FILTER
        );

        let invalid = LogOptions {
            filter: Some("hipstile=notalevel".to_string()),
            directory: None,
        };
        assert_eq!(invalid.env_filter().to_string(), DEFAULT_FILTER);
    }
}
