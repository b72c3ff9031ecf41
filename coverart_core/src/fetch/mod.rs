//! Network fetch strategies
//!
//! Both strategies sit behind one [`NetworkFetcher`] contract and differ only
//! in the [`RawPayload`] variant they return: a complete buffer, or a
//! [`StreamedBody`] that is read incrementally and can be peeked without
//! being consumed.

pub mod http;
pub mod streamed;

pub use http::{ArtworkUrl, HttpBufferedFetcher, HttpStreamedFetcher};
pub use streamed::{ByteStream, StreamedBody};

use crate::error::Result;
use crate::request::RequestPolicy;
use async_trait::async_trait;
use bytes::Bytes;

/// Bytes obtained from the network for one item
pub enum RawPayload {
    /// The whole body, already in memory
    Buffered(Bytes),
    /// A transfer still in progress
    Streamed(StreamedBody),
}

impl RawPayload {
    /// Whether the transport answered from its own cache
    pub fn served_from_cache(&self) -> bool {
        match self {
            Self::Buffered(_) => false,
            Self::Streamed(body) => body.served_from_cache(),
        }
    }

    /// Collect the remaining payload into one buffer
    pub async fn into_bytes(self) -> Result<Bytes> {
        match self {
            Self::Buffered(bytes) => Ok(bytes),
            Self::Streamed(body) => body.into_bytes().await,
        }
    }
}

impl std::fmt::Debug for RawPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buffered(bytes) => f.debug_tuple("Buffered").field(&bytes.len()).finish(),
            Self::Streamed(body) => f.debug_tuple("Streamed").field(body).finish(),
        }
    }
}

/// Fetches artwork for an item from the network
///
/// Timeouts are the fetcher's responsibility and surface as errors.
#[async_trait]
pub trait NetworkFetcher<T: Sync>: Send + Sync {
    async fn fetch(&self, item: &T, policy: &RequestPolicy) -> Result<RawPayload>;
}
