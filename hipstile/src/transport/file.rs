//! Local filesystem transport for surveys stored on disk.

use std::io::ErrorKind;
use std::path::PathBuf;

use bytes::Bytes;

use super::{BoxFuture, Transport, TransportError};

/// Reads survey files from disk; accepts plain paths and `file://` URLs.
#[derive(Debug, Default, Clone)]
pub struct FileTransport;

impl FileTransport {
    pub fn new() -> Self {
        Self
    }
}

fn to_path(url: &str) -> PathBuf {
    PathBuf::from(url.strip_prefix("file://").unwrap_or(url))
}

impl Transport for FileTransport {
    fn fetch(&self, url: &str) -> BoxFuture<'_, Result<Bytes, TransportError>> {
        // Cache-busting query strings do not name files.
        let path = to_path(url.split('?').next().unwrap_or(url));
        let url = url.to_string();
        Box::pin(async move {
            match tokio::fs::read(&path).await {
                Ok(data) => Ok(Bytes::from(data)),
                Err(e) if e.kind() == ErrorKind::NotFound => Err(TransportError::NotFound { url }),
                Err(e) => Err(TransportError::Io {
                    path: path.display().to_string(),
                    message: e.to_string(),
                }),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_reads_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("properties");
        std::fs::write(&path, b"hips_order = 3\n").unwrap();

        let transport = FileTransport::new();
        let data = transport.fetch(path.to_str().unwrap()).await.unwrap();
        assert_eq!(&data[..], b"hips_order = 3\n");

        let url = format!("file://{}?v=60000", path.display());
        assert!(transport.fetch(&url).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Norder3/Dir0/Npix1.jpg");
        let err = FileTransport::new()
            .fetch(path.to_str().unwrap())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
