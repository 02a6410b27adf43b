//! HTTP transport backed by reqwest.

use bytes::Bytes;
use reqwest::StatusCode;
use tracing::trace;

use super::{BoxFuture, Transport, TransportConfig, TransportError};

/// Network transport using an async reqwest client.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| TransportError::Request(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    async fn get(&self, url: &str) -> Result<Bytes, TransportError> {
        trace!(url, "HTTP GET");
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout {
                    url: url.to_string(),
                }
            } else {
                TransportError::Request(format!("{}: {}", url, e))
            }
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(TransportError::NotFound {
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .bytes()
            .await
            .map_err(|e| TransportError::Request(format!("failed to read {}: {}", url, e)))
    }
}

impl Transport for ReqwestTransport {
    fn fetch(&self, url: &str) -> BoxFuture<'_, Result<Bytes, TransportError>> {
        let url = url.to_string();
        Box::pin(async move { self.get(&url).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_with_default_config() {
        assert!(ReqwestTransport::new(&TransportConfig::default()).is_ok());
    }
}
