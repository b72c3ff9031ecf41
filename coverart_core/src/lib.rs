//! Coverart Core Library
//!
//! Tiered artwork fetch-and-cache pipeline: an in-memory LRU, a transactional
//! on-disk cache, permanent cover files for library titles, and pluggable
//! network fetch strategies, sequenced by a [`Resolver`].

pub mod artwork;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod image;
pub mod key;
pub mod request;
pub mod resolver;

// Re-export main types
pub use artwork::{Artwork, ArtworkKeys, MediaKind, MediaRef, UrlTemplate, library_covers};
pub use cache::{
    CoverStore, DiskCache, DiskCacheSizing, DiskCacheStats, Editor, LibraryCoverStore,
    MemoryCache, MemoryCacheConfig, MemoryCacheStats, Snapshot,
};
pub use config::{NetworkConfig, PipelineConfig};
pub use error::{Error, Result};
pub use fetch::{
    ArtworkUrl, HttpBufferedFetcher, HttpStreamedFetcher, NetworkFetcher, RawPayload,
    StreamedBody,
};
pub use image::{DecodedImage, ImageDecoder, ImageFormat, PassthroughDecoder};
pub use key::{CacheKey, KeyDeriver, derive_key};
pub use request::{DataSource, FetchResult, RequestPolicy};
pub use resolver::{OverrideHook, Resolver, ResolverBuilder};
