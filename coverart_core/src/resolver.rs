//! Tiered resolution of one item to a decoded image
//!
//! Tiers are consulted in a fixed order: memory, caller override, permanent
//! cover, generic disk cache, network. Every successful resolution lands in
//! the memory cache. Disk handles are RAII guards, so an error or a dropped
//! future releases whatever editor or snapshot the resolution was holding.
//!
//! Network bytes are decoded before they are persisted anywhere. A cover or
//! disk entry that is missing or fails to decode is dropped and treated as a
//! miss, so one bad response can't pin an item to an unusable copy.

use crate::cache::{CoverStore, DiskCache, MemoryCache, Snapshot, cover};
use crate::error::{Error, IoErrorKind, Result, at_path};
use crate::fetch::{NetworkFetcher, RawPayload, StreamedBody};
use crate::image::{DecodedImage, ImageDecoder, PassthroughDecoder};
use crate::key::{CacheKey, KeyDeriver, derive_key};
use crate::request::{DataSource, FetchResult, RequestPolicy};
use bytes::Bytes;
use std::fmt::Debug;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

/// Caller hook consulted after a memory miss
///
/// Returning `Some` short-circuits every remaining tier; the result is put
/// into the memory cache and handed back unchanged.
pub type OverrideHook<T> = Arc<dyn Fn(&RequestPolicy, &T) -> Option<FetchResult> + Send + Sync>;

/// Resolves items through the memory, cover, disk and network tiers
pub struct Resolver<T: Sync> {
    keys: Arc<dyn KeyDeriver<T>>,
    fetcher: Arc<dyn NetworkFetcher<T>>,
    covers: Option<Arc<dyn CoverStore<T>>>,
    override_hook: Option<OverrideHook<T>>,
    memory: Arc<MemoryCache>,
    disk: Option<DiskCache>,
    decoder: Arc<dyn ImageDecoder>,
}

/// Builder for [`Resolver`]
pub struct ResolverBuilder<T: Sync> {
    keys: Arc<dyn KeyDeriver<T>>,
    fetcher: Arc<dyn NetworkFetcher<T>>,
    covers: Option<Arc<dyn CoverStore<T>>>,
    override_hook: Option<OverrideHook<T>>,
    memory: Option<Arc<MemoryCache>>,
    disk: Option<DiskCache>,
    decoder: Option<Arc<dyn ImageDecoder>>,
}

impl<T: Sync> ResolverBuilder<T> {
    pub fn covers(mut self, covers: Arc<dyn CoverStore<T>>) -> Self {
        self.covers = Some(covers);
        self
    }

    pub fn override_hook(mut self, hook: OverrideHook<T>) -> Self {
        self.override_hook = Some(hook);
        self
    }

    /// Share a memory cache between resolvers; a private one is created otherwise
    pub fn memory(mut self, memory: Arc<MemoryCache>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn disk(mut self, disk: DiskCache) -> Self {
        self.disk = Some(disk);
        self
    }

    pub fn decoder(mut self, decoder: Arc<dyn ImageDecoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    pub fn build(self) -> Resolver<T> {
        Resolver {
            keys: self.keys,
            fetcher: self.fetcher,
            covers: self.covers,
            override_hook: self.override_hook,
            memory: self.memory.unwrap_or_default(),
            disk: self.disk,
            decoder: self.decoder.unwrap_or_else(|| Arc::new(PassthroughDecoder)),
        }
    }
}

impl<T: Debug + Send + Sync> Resolver<T> {
    pub fn builder(
        keys: Arc<dyn KeyDeriver<T>>,
        fetcher: Arc<dyn NetworkFetcher<T>>,
    ) -> ResolverBuilder<T> {
        ResolverBuilder {
            keys,
            fetcher,
            covers: None,
            override_hook: None,
            memory: None,
            disk: None,
            decoder: None,
        }
    }

    pub fn memory(&self) -> &Arc<MemoryCache> {
        &self.memory
    }

    pub fn disk(&self) -> Option<&DiskCache> {
        self.disk.as_ref()
    }

    /// Resolve `item` to an image, honoring the tier flags in `policy`
    pub async fn resolve(&self, item: &T, policy: &RequestPolicy) -> Result<FetchResult> {
        let key = derive_key(self.keys.as_ref(), item, policy)?;

        if policy.memory_read
            && let Some(image) = self.memory.get(&key).await
        {
            log::debug!("{key}: memory hit");
            return Ok(FetchResult::new(image, DataSource::Memory));
        }

        if let Some(hook) = &self.override_hook
            && let Some(result) = hook(policy, item)
        {
            log::debug!("{key}: resolved by override hook");
            self.memory.put(&key, result.image.clone()).await;
            return Ok(result);
        }

        let cover_path = self.covers.as_ref().and_then(|c| c.path_for(item));

        if policy.disk_read {
            if let Some(path) = cover_path.as_deref()
                && let Some(data) = read_cover(path).await?
            {
                match self.decoder.decode(key.as_str(), data) {
                    Ok(image) => {
                        log::debug!("{key}: cover hit at {}", path.display());
                        return Ok(self.remember(&key, image, DataSource::Disk).await);
                    }
                    Err(e) => {
                        log::warn!("{key}: cover at {} is unusable: {e}", path.display());
                        cover::discard(path).await;
                    }
                }
            }

            if let Some(snapshot) = self.disk.as_ref().and_then(|d| d.open_snapshot(&key))
                && let Some(result) = self
                    .admit_snapshot(&key, snapshot, cover_path.as_deref(), policy)
                    .await?
            {
                return Ok(result);
            }
        }

        log::debug!("{key}: fetching from network");
        match self.fetcher.fetch(item, policy).await? {
            RawPayload::Buffered(data) => {
                self.store_buffered(&key, data, cover_path.as_deref(), policy)
                    .await
            }
            RawPayload::Streamed(body) => {
                self.store_streamed(&key, body, cover_path.as_deref(), policy)
                    .await
            }
        }
    }

    /// Serve a generic disk hit, migrating it to the cover path when possible
    ///
    /// `None` means the entry was unusable and has been dropped.
    async fn admit_snapshot(
        &self,
        key: &CacheKey,
        snapshot: Snapshot,
        cover_path: Option<&Path>,
        policy: &RequestPolicy,
    ) -> Result<Option<FetchResult>> {
        let data = match snapshot.read().await {
            Ok(data) => data,
            Err(Error::Io(e)) if e.kind == IoErrorKind::FileNotFound => {
                log::warn!("{key}: disk entry lost its blob, treating as a miss");
                snapshot.discard().await;
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let image = match self.decoder.decode(key.as_str(), data.clone()) {
            Ok(image) => image,
            Err(e) => {
                log::warn!("{key}: disk entry is unusable: {e}");
                snapshot.discard().await;
                return Ok(None);
            }
        };
        log::debug!("{key}: disk hit");

        // The cover ends up holding exactly the snapshot bytes decoded above
        if policy.disk_write
            && let Some(path) = cover_path
            && let Some(migrated) = cover::write_if_absent(&data, path).await
        {
            log::debug!("{key}: migrated to cover {}", migrated.display());
        }

        snapshot.close();
        Ok(Some(self.remember(key, image, DataSource::Disk).await))
    }

    async fn store_buffered(
        &self,
        key: &CacheKey,
        data: Bytes,
        cover_path: Option<&Path>,
        policy: &RequestPolicy,
    ) -> Result<FetchResult> {
        let image = self.decoder.decode(key.as_str(), data.clone())?;
        let source = self.persist_in_hand(key, &data, cover_path, policy, false).await;
        Ok(self.remember(key, image, source).await)
    }

    async fn store_streamed(
        &self,
        key: &CacheKey,
        mut body: StreamedBody,
        cover_path: Option<&Path>,
        policy: &RequestPolicy,
    ) -> Result<FetchResult> {
        let from_cache = body.served_from_cache();

        if policy.disk_write
            && let Some(path) = cover_path
        {
            // The peeked copy stays buffered inside the body for the fallbacks below
            match body.peek().await {
                Ok(data) => {
                    let image = self.decoder.decode(key.as_str(), data.clone())?;
                    let source = self
                        .persist_in_hand(key, &data, Some(path), policy, from_cache)
                        .await;
                    return Ok(self.remember(key, image, source).await);
                }
                Err(e) => log::warn!("{key}: could not peek body for cover: {e}"),
            }
        }

        let editor = if policy.disk_write {
            self.disk.as_ref().and_then(|d| d.open_editor(key))
        } else {
            None
        };

        let Some(mut editor) = editor else {
            let data = body.into_bytes().await?;
            let image = self.decoder.decode(key.as_str(), data)?;
            return Ok(self.remember(key, image, DataSource::Network).await);
        };

        // Payload is not in hand: a failed transfer or write aborts the
        // editor on drop and propagates
        editor.write_stream(body.into_stream()).await?;
        let snapshot = editor.commit().await?;
        let data = snapshot.read().await?;

        match self.decoder.decode(key.as_str(), data) {
            Ok(image) => {
                snapshot.close();
                Ok(self.remember(key, image, tier_for(from_cache)).await)
            }
            Err(e) => {
                snapshot.discard().await;
                Err(e)
            }
        }
    }

    /// Persist a decoded, fully buffered payload to the cover or disk cache
    ///
    /// Returns the tier to report. Failures are logged, not raised: the
    /// caller still holds the bytes.
    async fn persist_in_hand(
        &self,
        key: &CacheKey,
        data: &[u8],
        cover_path: Option<&Path>,
        policy: &RequestPolicy,
        from_cache: bool,
    ) -> DataSource {
        if !policy.disk_write {
            return DataSource::Network;
        }
        if let Some(path) = cover_path
            && cover::write_if_absent(data, path).await.is_some()
        {
            return DataSource::Disk;
        }
        let Some(mut editor) = self.disk.as_ref().and_then(|d| d.open_editor(key)) else {
            log::debug!("{key}: no editor available, skipping disk write");
            return DataSource::Network;
        };

        if let Err(e) = editor.write_all(data).await {
            log::warn!("{key}: disk cache write failed: {e}");
            editor.abort();
            return DataSource::Network;
        }
        match editor.commit().await {
            Ok(snapshot) => {
                snapshot.close();
                tier_for(from_cache)
            }
            Err(e) => {
                log::warn!("{key}: disk cache commit failed: {e}");
                DataSource::Network
            }
        }
    }

    async fn remember(&self, key: &CacheKey, image: DecodedImage, source: DataSource) -> FetchResult {
        self.memory.put(key, image.clone()).await;
        FetchResult::new(image, source)
    }
}

fn tier_for(served_from_cache: bool) -> DataSource {
    if served_from_cache {
        DataSource::Disk
    } else {
        DataSource::Network
    }
}

async fn read_cover(path: &Path) -> Result<Option<Bytes>> {
    match tokio::fs::read(path).await {
        Ok(data) => Ok(Some(Bytes::from(data))),
        Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => Ok(None),
        Err(e) => Err(at_path(path)(e)),
    }
}
