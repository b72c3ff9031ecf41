//! Incrementally read response bodies

use crate::error::{NetworkError, Result};
use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};

/// Boxed stream of body chunks
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// A response body that may be peeked before it is consumed
///
/// [`StreamedBody::peek`] pulls the rest of the transfer into an internal
/// buffer and returns a copy; the chunks are replayed by
/// [`StreamedBody::into_stream`], so the primary consumer always sees the
/// full payload.
pub struct StreamedBody {
    buffered: Vec<Bytes>,
    inner: Option<ByteStream>,
    failure: Option<String>,
    served_from_cache: bool,
    content_length: Option<u64>,
}

impl StreamedBody {
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes>> + Send + 'static,
    {
        Self {
            buffered: Vec::new(),
            inner: Some(stream.boxed()),
            failure: None,
            served_from_cache: false,
            content_length: None,
        }
    }

    /// Body backed by chunks already in memory
    pub fn from_chunks(chunks: Vec<Bytes>) -> Self {
        Self::new(stream::iter(chunks.into_iter().map(Ok)))
    }

    /// Mark the body as answered from the transport's own cache
    pub fn with_served_from_cache(mut self, served: bool) -> Self {
        self.served_from_cache = served;
        self
    }

    pub fn with_content_length(mut self, length: Option<u64>) -> Self {
        self.content_length = length;
        self
    }

    pub fn served_from_cache(&self) -> bool {
        self.served_from_cache
    }

    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Read the whole body without consuming it
    ///
    /// A transfer error is returned here and replayed to the primary
    /// consumer, so a broken body can never be mistaken for a short one.
    pub async fn peek(&mut self) -> Result<Bytes> {
        if let Some(mut inner) = self.inner.take() {
            while let Some(chunk) = inner.next().await {
                match chunk {
                    Ok(chunk) => self.buffered.push(chunk),
                    Err(e) => {
                        self.failure = Some(e.to_string());
                        return Err(e);
                    }
                }
            }
        }
        if let Some(message) = &self.failure {
            return Err(NetworkError::transport(message.clone()).into());
        }

        let total = self.buffered.iter().map(Bytes::len).sum();
        let mut out = BytesMut::with_capacity(total);
        for chunk in &self.buffered {
            out.extend_from_slice(chunk);
        }
        Ok(out.freeze())
    }

    /// Consume the body as a stream, starting with any peeked chunks
    pub fn into_stream(self) -> ByteStream {
        let head = stream::iter(self.buffered.into_iter().map(Ok));
        let tail: ByteStream = match (self.inner, self.failure) {
            (Some(inner), _) => inner,
            (None, Some(message)) => {
                let failure: crate::Error = NetworkError::transport(message).into();
                stream::once(async move { Err::<Bytes, _>(failure) }).boxed()
            }
            (None, None) => stream::empty::<Result<Bytes>>().boxed(),
        };
        head.chain(tail).boxed()
    }

    /// Consume the body into one buffer
    pub async fn into_bytes(mut self) -> Result<Bytes> {
        self.peek().await
    }
}

impl std::fmt::Debug for StreamedBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamedBody")
            .field("buffered_chunks", &self.buffered.len())
            .field("exhausted", &self.inner.is_none())
            .field("served_from_cache", &self.served_from_cache)
            .field("content_length", &self.content_length)
            .finish()
    }
}
