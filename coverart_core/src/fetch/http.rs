//! HTTP fetch strategies backed by reqwest

use super::{NetworkFetcher, RawPayload, StreamedBody};
use crate::config::NetworkConfig;
use crate::error::{NetworkError, Result};
use crate::request::RequestPolicy;
use async_trait::async_trait;
use futures::TryStreamExt;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

/// Builds the artwork URL for an item
pub trait ArtworkUrl<T>: Send + Sync {
    fn url_for(&self, item: &T) -> Option<String>;
}

impl<T, F> ArtworkUrl<T> for F
where
    F: Fn(&T) -> Option<String> + Send + Sync,
{
    fn url_for(&self, item: &T) -> Option<String> {
        self(item)
    }
}

fn build_client(config: &NetworkConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(|e| NetworkError::transport(format!("Failed to create HTTP client: {e}")).into())
}

/// Request shared by both strategies: resolve URL, send, check status
struct HttpSource<T> {
    client: reqwest::Client,
    urls: Arc<dyn ArtworkUrl<T>>,
}

impl<T: Debug> HttpSource<T> {
    fn new(config: &NetworkConfig, urls: Arc<dyn ArtworkUrl<T>>) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
            urls,
        })
    }

    async fn send(&self, item: &T) -> Result<reqwest::Response> {
        let url = self
            .urls
            .url_for(item)
            .ok_or_else(|| NetworkError::missing_url(format!("{item:?}")))?;
        log::trace!("GET {url}");

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                log::warn!(
                    "Artwork request failed for {url} (timeout: {}, connect: {}): {e}",
                    e.is_timeout(),
                    e.is_connect()
                );
                return Err(e.into());
            }
        };

        let status = response.status();
        if !status.is_success() {
            log::warn!("HTTP {status} for {url}");
            return Err(NetworkError::http_status(status.as_u16(), &url).into());
        }
        log::debug!("HTTP {status} for {url}");
        Ok(response)
    }
}

/// Reads the whole response body into memory
pub struct HttpBufferedFetcher<T> {
    source: HttpSource<T>,
}

impl<T: Debug> HttpBufferedFetcher<T> {
    pub fn new(config: &NetworkConfig, urls: Arc<dyn ArtworkUrl<T>>) -> Result<Self> {
        Ok(Self {
            source: HttpSource::new(config, urls)?,
        })
    }
}

#[async_trait]
impl<T: Debug + Send + Sync> NetworkFetcher<T> for HttpBufferedFetcher<T> {
    async fn fetch(&self, item: &T, _policy: &RequestPolicy) -> Result<RawPayload> {
        let response = self.source.send(item).await?;
        let body = response.bytes().await?;
        Ok(RawPayload::Buffered(body))
    }
}

/// Hands back the response body as a stream
///
/// The client keeps no HTTP cache of its own, so bodies are never flagged as
/// served from the transport cache. `Age` and `X-Cache` describe CDN and
/// proxy caches, which still count as network.
pub struct HttpStreamedFetcher<T> {
    source: HttpSource<T>,
}

impl<T: Debug> HttpStreamedFetcher<T> {
    pub fn new(config: &NetworkConfig, urls: Arc<dyn ArtworkUrl<T>>) -> Result<Self> {
        Ok(Self {
            source: HttpSource::new(config, urls)?,
        })
    }
}

#[async_trait]
impl<T: Debug + Send + Sync> NetworkFetcher<T> for HttpStreamedFetcher<T> {
    async fn fetch(&self, item: &T, _policy: &RequestPolicy) -> Result<RawPayload> {
        let response = self.source.send(item).await?;
        let length = response.content_length();

        let stream = response.bytes_stream().map_err(crate::Error::from);
        Ok(RawPayload::Streamed(
            StreamedBody::new(stream).with_content_length(length),
        ))
    }
}
