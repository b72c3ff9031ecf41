//! Mock network fetcher

use async_trait::async_trait;
use bytes::Bytes;
use coverart_core::error::NetworkError;
use coverart_core::{Error, NetworkFetcher, RawPayload, RequestPolicy, Result, StreamedBody};
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock implementation of [`NetworkFetcher`] for testing
///
/// Counts invocations and serves a configurable payload, either buffered or
/// as a chunked stream. Failures can be injected before the transfer starts
/// or partway through a stream.
///
/// # Examples
///
/// ```rust,no_run
/// use coverart_test_utils::{ArtworkBuilder, MockFetcher};
/// use coverart_core::{NetworkFetcher, RequestPolicy};
///
/// # async fn example() -> coverart_core::Result<()> {
/// let mut mock = MockFetcher::new();
/// mock.expect_streamed(256);
///
/// let item = ArtworkBuilder::movie(42).build();
/// let payload = mock.fetch(&item, &RequestPolicy::default()).await?;
/// assert_eq!(mock.invocations(), 1);
/// # Ok(())
/// # }
/// ```
pub struct MockFetcher {
    behavior: Arc<Mutex<MockBehavior>>,
    invocations: Arc<AtomicUsize>,
}

#[derive(Debug, Clone)]
struct MockBehavior {
    payload: Bytes,
    mode: PayloadMode,
    served_from_cache: bool,
    failure: Option<MockError>,
    delay: Duration,
}

#[derive(Debug, Clone, Copy)]
enum PayloadMode {
    Buffered,
    Streamed { chunk_size: usize },
    /// Stream fails after `after_chunks` chunks were delivered
    BrokenStream { chunk_size: usize, after_chunks: usize },
    /// Stream never finishes after `after_chunks` chunks
    StalledStream { chunk_size: usize, after_chunks: usize },
}

#[derive(Debug, Clone)]
enum MockError {
    Offline,
    HttpStatus(u16),
    MissingUrl,
}

impl From<MockError> for Error {
    fn from(mock_error: MockError) -> Self {
        match mock_error {
            MockError::Offline => Error::Network(NetworkError::Offline),
            MockError::HttpStatus(status) => Error::Network(NetworkError::http_status(
                status,
                "https://mock.invalid/artwork",
            )),
            MockError::MissingUrl => Error::Network(NetworkError::missing_url("mock item")),
        }
    }
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            payload: crate::payloads::png(1024),
            mode: PayloadMode::Buffered,
            served_from_cache: false,
            failure: None,
            delay: Duration::ZERO,
        }
    }
}

impl MockFetcher {
    /// Create a mock serving a 1 KiB PNG-like buffer
    pub fn new() -> Self {
        Self {
            behavior: Arc::new(Mutex::new(MockBehavior::default())),
            invocations: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Serve `payload` on every call
    pub fn expect_payload(&mut self, payload: impl Into<Bytes>) {
        self.behavior.lock().unwrap().payload = payload.into();
    }

    /// Return the payload as one buffer
    pub fn expect_buffered(&mut self) {
        self.behavior.lock().unwrap().mode = PayloadMode::Buffered;
    }

    /// Return the payload as a stream of `chunk_size` chunks
    pub fn expect_streamed(&mut self, chunk_size: usize) {
        self.behavior.lock().unwrap().mode = PayloadMode::Streamed {
            chunk_size: chunk_size.max(1),
        };
    }

    /// Stream that fails with a transport error after `after_chunks` chunks
    pub fn expect_broken_stream(&mut self, chunk_size: usize, after_chunks: usize) {
        self.behavior.lock().unwrap().mode = PayloadMode::BrokenStream {
            chunk_size: chunk_size.max(1),
            after_chunks,
        };
    }

    /// Stream that stops making progress after `after_chunks` chunks
    pub fn expect_stalled_stream(&mut self, chunk_size: usize, after_chunks: usize) {
        self.behavior.lock().unwrap().mode = PayloadMode::StalledStream {
            chunk_size: chunk_size.max(1),
            after_chunks,
        };
    }

    /// Mark streamed payloads as answered by an intermediate cache
    pub fn expect_served_from_cache(&mut self, served: bool) {
        self.behavior.lock().unwrap().served_from_cache = served;
    }

    /// Fail every call as if the network were down
    pub fn expect_offline(&mut self) {
        self.behavior.lock().unwrap().failure = Some(MockError::Offline);
    }

    /// Fail every call with an HTTP status
    pub fn expect_http_status(&mut self, status: u16) {
        self.behavior.lock().unwrap().failure = Some(MockError::HttpStatus(status));
    }

    /// Fail every call as if no URL could be built
    pub fn expect_missing_url(&mut self) {
        self.behavior.lock().unwrap().failure = Some(MockError::MissingUrl);
    }

    /// Wait before answering
    pub fn with_delay(&mut self, delay: Duration) {
        self.behavior.lock().unwrap().delay = delay;
    }

    /// Number of `fetch` calls so far
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    /// Reset to the default behavior and zero the invocation count
    pub fn reset(&mut self) {
        *self.behavior.lock().unwrap() = MockBehavior::default();
        self.invocations.store(0, Ordering::SeqCst);
    }
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MockFetcher {
    fn clone(&self) -> Self {
        Self {
            behavior: Arc::clone(&self.behavior),
            invocations: Arc::clone(&self.invocations),
        }
    }
}

fn chunks(payload: &Bytes, chunk_size: usize) -> Vec<Bytes> {
    (0..payload.len())
        .step_by(chunk_size)
        .map(|start| payload.slice(start..(start + chunk_size).min(payload.len())))
        .collect()
}

#[async_trait]
impl<T: Sync> NetworkFetcher<T> for MockFetcher {
    async fn fetch(&self, _item: &T, _policy: &RequestPolicy) -> Result<RawPayload> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        let behavior = self.behavior.lock().unwrap().clone();

        if !behavior.delay.is_zero() {
            tokio::time::sleep(behavior.delay).await;
        }
        if let Some(failure) = behavior.failure {
            return Err(failure.into());
        }

        let body = match behavior.mode {
            PayloadMode::Buffered => return Ok(RawPayload::Buffered(behavior.payload)),
            PayloadMode::Streamed { chunk_size } => {
                StreamedBody::from_chunks(chunks(&behavior.payload, chunk_size))
            }
            PayloadMode::BrokenStream {
                chunk_size,
                after_chunks,
            } => {
                let head: Vec<Result<Bytes>> = chunks(&behavior.payload, chunk_size)
                    .into_iter()
                    .take(after_chunks)
                    .map(Ok)
                    .collect();
                let failure: Error = NetworkError::transport("connection reset by peer").into();
                StreamedBody::new(stream::iter(head).chain(stream::once(async move { Err(failure) })))
            }
            PayloadMode::StalledStream {
                chunk_size,
                after_chunks,
            } => {
                let head: Vec<Result<Bytes>> = chunks(&behavior.payload, chunk_size)
                    .into_iter()
                    .take(after_chunks)
                    .map(Ok)
                    .collect();
                StreamedBody::new(stream::iter(head).chain(stream::pending()))
            }
        };

        Ok(RawPayload::Streamed(
            body.with_served_from_cache(behavior.served_from_cache)
                .with_content_length(Some(behavior.payload.len() as u64)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_counts_invocations() {
        let mock = MockFetcher::new();
        let shared = mock.clone();

        NetworkFetcher::<u64>::fetch(&mock, &1, &RequestPolicy::default())
            .await
            .unwrap();
        assert_eq!(shared.invocations(), 1);
    }

    #[tokio::test]
    async fn test_streamed_payload_reassembles() {
        let mut mock = MockFetcher::new();
        mock.expect_payload(Bytes::from_static(b"0123456789"));
        mock.expect_streamed(3);

        let payload = NetworkFetcher::<u64>::fetch(&mock, &1, &RequestPolicy::default())
            .await
            .unwrap();
        assert!(matches!(payload, RawPayload::Streamed(_)));
        assert_eq!(payload.into_bytes().await.unwrap().as_ref(), b"0123456789");
    }

    #[tokio::test]
    async fn test_broken_stream_fails_on_read() {
        let mut mock = MockFetcher::new();
        mock.expect_broken_stream(100, 2);

        let payload = NetworkFetcher::<u64>::fetch(&mock, &1, &RequestPolicy::default())
            .await
            .unwrap();
        assert!(payload.into_bytes().await.is_err());
    }

    #[tokio::test]
    async fn test_injected_status() {
        let mut mock = MockFetcher::new();
        mock.expect_http_status(404);

        let err = NetworkFetcher::<u64>::fetch(&mock, &1, &RequestPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Network(NetworkError::HttpStatus { status: 404, .. })
        ));
    }
}
