//! Load failures and their cache error codes.

use thiserror::Error;

use crate::cache::TileErrorCode;
use crate::decode::DecodeError;
use crate::transport::TransportError;

/// Why a single load attempt failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoadError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("decode task failed: {0}")]
    Task(String),
}

impl LoadError {
    /// Outcome code recorded in the cache for this failure.
    pub fn code(&self) -> TileErrorCode {
        match self {
            LoadError::Transport(e) if e.is_not_found() => TileErrorCode::NotFound,
            LoadError::Transport(_) => TileErrorCode::Network,
            LoadError::Decode(_) | LoadError::Task(_) => TileErrorCode::Decode,
        }
    }
}
