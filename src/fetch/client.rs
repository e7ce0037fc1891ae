use crate::config::FetchConfig;
use crate::error::FetchError;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::header::{HeaderName, HeaderValue};
use tracing::{debug, info};

/// Network retrieval of a snapshot
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError>;
}

/// Fetches snapshots from the NVR over HTTP(S)
pub struct HttpFetcher {
    client: reqwest::Client,
    api_key: Option<(HeaderName, HeaderValue)>,
    max_bytes: usize,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| FetchError::ClientSetup {
                details: e.to_string(),
            })?;

        let api_key = match &config.api_key {
            Some(key) => {
                let name = HeaderName::from_bytes(config.api_key_header.as_bytes()).map_err(|e| {
                    FetchError::ClientSetup {
                        details: format!("invalid header name {}: {}", config.api_key_header, e),
                    }
                })?;
                let mut value =
                    HeaderValue::from_str(key).map_err(|e| FetchError::ClientSetup {
                        details: format!("invalid API key: {}", e),
                    })?;
                value.set_sensitive(true);
                Some((name, value))
            }
            None => None,
        };

        info!(
            "HTTP fetcher ready (timeout {:?}, api key {})",
            config.request_timeout(),
            if api_key.is_some() { "set" } else { "not set" }
        );

        Ok(Self {
            client,
            api_key,
            max_bytes: config.max_artifact_bytes,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        let mut request = self.client.get(url);
        if let Some((name, value)) = &self.api_key {
            request = request.header(name.clone(), value.clone());
        }

        let mut response = request.send().await.map_err(|e| FetchError::Transport {
            url: url.to_string(),
            details: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if let Some(length) = response.content_length() {
            if length as usize > self.max_bytes {
                return Err(FetchError::TooLarge {
                    url: url.to_string(),
                    limit: self.max_bytes,
                });
            }
        }

        let mut body = BytesMut::with_capacity(
            response
                .content_length()
                .map(|len| len as usize)
                .unwrap_or(0),
        );
        while let Some(chunk) = response.chunk().await.map_err(|e| FetchError::Transport {
            url: url.to_string(),
            details: e.to_string(),
        })? {
            if body.len() + chunk.len() > self.max_bytes {
                return Err(FetchError::TooLarge {
                    url: url.to_string(),
                    limit: self.max_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(body.freeze())
    }
}
