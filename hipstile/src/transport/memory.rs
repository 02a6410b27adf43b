//! Scripted in-memory transport.
//!
//! Serves canned responses keyed by URL and records every request, which
//! makes it the transport of choice for tests and offline demos. Unknown
//! URLs answer `NotFound`.

use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;

use super::{BoxFuture, Transport, TransportError};

#[derive(Default)]
pub struct MemoryTransport {
    routes: Mutex<HashMap<String, Result<Bytes, TransportError>>>,
    requests: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every response by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Serve `body` at `url`.
    pub fn insert(&self, url: impl Into<String>, body: impl Into<Bytes>) {
        self.routes.lock().insert(url.into(), Ok(body.into()));
    }

    /// Answer `url` with an error.
    pub fn insert_error(&self, url: impl Into<String>, error: TransportError) {
        self.routes.lock().insert(url.into(), Err(error));
    }

    /// Stop serving `url`.
    pub fn remove(&self, url: &str) {
        self.routes.lock().remove(url);
    }

    /// All URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    /// How many times `url` was requested.
    pub fn request_count(&self, url: &str) -> usize {
        self.requests.lock().iter().filter(|u| *u == url).count()
    }
}

impl Transport for MemoryTransport {
    fn fetch(&self, url: &str) -> BoxFuture<'_, Result<Bytes, TransportError>> {
        self.requests.lock().push(url.to_string());
        let response = self
            .routes
            .lock()
            .get(url)
            .cloned()
            .unwrap_or_else(|| {
                Err(TransportError::NotFound {
                    url: url.to_string(),
                })
            });
        let delay = self.delay;
        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            response
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_responses() {
        let transport = MemoryTransport::new();
        transport.insert("a", &b"alpha"[..]);
        transport.insert_error(
            "b",
            TransportError::Status {
                url: "b".to_string(),
                status: 503,
            },
        );

        assert_eq!(&transport.fetch("a").await.unwrap()[..], b"alpha");
        assert!(matches!(
            transport.fetch("b").await,
            Err(TransportError::Status { status: 503, .. })
        ));
        assert!(transport.fetch("c").await.unwrap_err().is_not_found());
        assert_eq!(transport.requests(), vec!["a", "b", "c"]);
        assert_eq!(transport.request_count("a"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay() {
        let transport = MemoryTransport::new().with_delay(Duration::from_secs(5));
        transport.insert("a", &b"x"[..]);
        let start = tokio::time::Instant::now();
        transport.fetch("a").await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(5));
    }
}
