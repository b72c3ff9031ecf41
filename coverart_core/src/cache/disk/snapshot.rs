//! Read side of the disk cache transaction protocol

use super::DiskCache;
use crate::error::{Result, at_path};
use crate::key::CacheKey;
use bytes::Bytes;
use std::path::{Path, PathBuf};

/// Read handle to a committed blob
///
/// While a snapshot is open no editor can be opened for its key. The read
/// lock is released by [`Snapshot::close`] or when the snapshot is dropped.
pub struct Snapshot {
    cache: DiskCache,
    key: CacheKey,
    path: PathBuf,
    size: u64,
}

impl Snapshot {
    pub(super) fn new(cache: DiskCache, key: CacheKey, path: PathBuf, size: u64) -> Self {
        Self {
            cache,
            key,
            path,
            size,
        }
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Durable location of the committed blob
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Read the whole blob
    pub async fn read(&self) -> Result<Bytes> {
        let data = tokio::fs::read(&self.path)
            .await
            .map_err(at_path(&self.path))?;
        Ok(Bytes::from(data))
    }

    /// Release the read lock
    pub fn close(self) {}

    /// Drop the entry from the cache, then release the read lock
    ///
    /// For blobs that went missing or hold bytes that can't be decoded.
    pub async fn discard(self) {
        self.cache.discard(&self.key, &self.path).await;
    }
}

impl Drop for Snapshot {
    fn drop(&mut self) {
        self.cache.release_reader(&self.key);
    }
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("key", &self.key)
            .field("path", &self.path)
            .field("size", &self.size)
            .finish()
    }
}
