//! Image retrieval for snapshot documents.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::StatusCode;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Default cap on a single fetched image.
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Access to {url} was refused (HTTP {status})")]
    Refused { url: String, status: u16 },

    #[error("HTTP {status} while fetching {url}")]
    Status { url: String, status: u16 },

    #[error("Image at {url} exceeds the {limit} byte limit")]
    TooLarge { url: String, limit: u64 },

    #[error("Unsupported image source scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Image fetching is disabled")]
    Disabled,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl FetchError {
    /// The server answered but withheld the bytes; the cross-origin analogue.
    pub fn is_refusal(&self) -> bool {
        matches!(self, FetchError::Refused { .. })
    }
}

#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError>;
}

/// Fetches http(s) images with a size-capped streaming body.
#[derive(Debug, Clone)]
pub struct HttpImageFetcher {
    client: reqwest::Client,
    max_bytes: u64,
}

impl HttpImageFetcher {
    pub fn new(timeout: Duration, max_bytes: u64) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("h2d/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, max_bytes })
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FetchError::UnsupportedScheme(url.scheme().to_string()));
        }

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(FetchError::Refused {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        if response
            .content_length()
            .is_some_and(|len| len > self.max_bytes)
        {
            return Err(FetchError::TooLarge {
                url: url.to_string(),
                limit: self.max_bytes,
            });
        }

        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if (body.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(FetchError::TooLarge {
                    url: url.to_string(),
                    limit: self.max_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }
        debug!(url = %url, bytes = body.len(), "fetched image");
        Ok(body)
    }
}

/// Serves images from memory; anything unknown is a 404.
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    images: HashMap<String, Vec<u8>>,
    refused: Vec<String>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, url: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.images.insert(url.into(), bytes);
        self
    }

    pub fn with_refused(mut self, url: impl Into<String>) -> Self {
        self.refused.push(url.into());
        self
    }
}

#[async_trait]
impl ImageFetcher for StaticFetcher {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        if self.refused.iter().any(|refused| refused == url.as_str()) {
            return Err(FetchError::Refused {
                url: url.to_string(),
                status: 403,
            });
        }
        self.images
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

/// Offline mode: every remote image fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFetch;

#[async_trait]
impl ImageFetcher for NoFetch {
    async fn fetch(&self, _url: &Url) -> Result<Vec<u8>, FetchError> {
        Err(FetchError::Disabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_fetcher_serves_and_refuses() {
        let fetcher = StaticFetcher::new()
            .with_image("https://example.com/a.png", vec![1, 2, 3])
            .with_refused("https://other.com/b.png");

        let a = Url::parse("https://example.com/a.png").unwrap();
        assert_eq!(fetcher.fetch(&a).await.unwrap(), vec![1, 2, 3]);

        let b = Url::parse("https://other.com/b.png").unwrap();
        assert!(fetcher.fetch(&b).await.unwrap_err().is_refusal());

        let c = Url::parse("https://example.com/missing.png").unwrap();
        let err = fetcher.fetch(&c).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
        assert!(!err.is_refusal());
    }

    #[tokio::test]
    async fn http_fetcher_rejects_other_schemes() {
        let fetcher = HttpImageFetcher::new(Duration::from_secs(1), 1024).unwrap();
        let url = Url::parse("file:///etc/passwd").unwrap();
        assert!(matches!(
            fetcher.fetch(&url).await,
            Err(FetchError::UnsupportedScheme(_))
        ));
    }

    #[tokio::test]
    async fn offline_fetcher_always_fails() {
        let url = Url::parse("https://example.com/a.png").unwrap();
        assert!(matches!(NoFetch.fetch(&url).await, Err(FetchError::Disabled)));
    }
}
