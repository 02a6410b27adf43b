//! CLI error type.

use std::path::PathBuf;
use std::time::Duration;

use hipstile::config::ConfigError;
use hipstile::logging::LoggingError;
use hipstile::properties::ParseError;
use hipstile::transport::TransportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Config(String),

    #[error(transparent)]
    ConfigFile(#[from] ConfigError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out after {}s waiting for {what}", .after.as_secs())]
    Timeout { what: String, after: Duration },

    #[error("tile {tile} unavailable: {reason}")]
    Tile { tile: String, reason: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
