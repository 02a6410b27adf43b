//! Byte transports for survey resources.
//!
//! The loader never talks to the network directly; it goes through the
//! [`Transport`] trait so surveys can be served over HTTP, from a local
//! directory, or from an in-memory script in tests.

mod file;
mod http;
mod memory;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;

pub use file::FileTransport;
pub use http::ReqwestTransport;
pub use memory::MemoryTransport;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors raised while fetching a resource.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("resource not found: {url}")]
    NotFound { url: String },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request failed: {0}")]
    Request(String),

    #[error("failed to read {path}: {message}")]
    Io { path: String, message: String },
}

impl TransportError {
    /// Whether the resource is definitively absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TransportError::NotFound { .. })
    }
}

/// Asynchronous byte fetcher.
pub trait Transport: Send + Sync {
    /// Fetch the full body at `url`.
    fn fetch(&self, url: &str) -> BoxFuture<'_, Result<Bytes, TransportError>>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn fetch(&self, url: &str) -> BoxFuture<'_, Result<Bytes, TransportError>> {
        (**self).fetch(url)
    }
}

/// Settings for the network transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Per-request timeout.
    pub timeout: Duration,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("hipstile/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Transport that routes `http(s)://` URLs to the network and everything
/// else to the local filesystem.
pub struct AutoTransport {
    http: ReqwestTransport,
    file: FileTransport,
}

impl AutoTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        Ok(Self {
            http: ReqwestTransport::new(config)?,
            file: FileTransport::new(),
        })
    }
}

impl Transport for AutoTransport {
    fn fetch(&self, url: &str) -> BoxFuture<'_, Result<Bytes, TransportError>> {
        if is_remote(url) {
            self.http.fetch(url)
        } else {
            self.file.fetch(url)
        }
    }
}

/// Whether a URL must be fetched over the network.
pub fn is_remote(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
