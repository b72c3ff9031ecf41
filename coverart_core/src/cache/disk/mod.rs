//! Generic size-bounded disk cache
//!
//! Blobs are published through an editor/snapshot protocol:
//!
//! - [`DiskCache::open_editor`] grants the single write lock for a key, or
//!   `None` if the key is busy. Bytes go to a private temp file and only
//!   become visible when [`Editor::commit`] renames it into place.
//! - [`DiskCache::open_snapshot`] hands out a read handle to a committed
//!   blob. An open snapshot keeps editors away from its key.
//!
//! Both handles release their lock on drop, so an abandoned or cancelled
//! resolution can never leave a key locked.

mod editor;
mod index;
mod sizing;
mod snapshot;

pub use editor::Editor;
pub use sizing::{DiskCacheSizing, available_space};
pub use snapshot::Snapshot;

use crate::error::{Result, at_path};
use crate::key::CacheKey;
use index::{IndexEntry, blob_name};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::fs;

const BLOB_EXTENSION: &str = "blob";
const TEMP_EXTENSION: &str = "tmp";

/// Disk cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiskCacheStats {
    pub entry_count: usize,
    pub total_size_bytes: u64,
    pub max_size_bytes: u64,
}

#[derive(Debug, Default, Clone, Copy)]
struct KeyLock {
    editing: bool,
    readers: usize,
}

#[derive(Default)]
struct DiskState {
    entries: HashMap<CacheKey, IndexEntry>,
    locks: HashMap<CacheKey, KeyLock>,
    total_size: u64,
    access_seq: u64,
}

impl DiskState {
    fn is_locked(&self, key: &CacheKey) -> bool {
        self.locks.contains_key(key)
    }

    fn next_access(&mut self) -> u64 {
        self.access_seq += 1;
        self.access_seq
    }

    fn release_reader(&mut self, key: &CacheKey) {
        if let Some(lock) = self.locks.get_mut(key) {
            lock.readers = lock.readers.saturating_sub(1);
            if lock.readers == 0 && !lock.editing {
                self.locks.remove(key);
            }
        }
    }

    fn release_editor(&mut self, key: &CacheKey) {
        if let Some(lock) = self.locks.get_mut(key) {
            lock.editing = false;
            if lock.readers == 0 {
                self.locks.remove(key);
            }
        }
    }

    fn insert(&mut self, key: CacheKey, entry: IndexEntry) {
        self.total_size += entry.size;
        if let Some(old) = self.entries.insert(key, entry) {
            self.total_size = self.total_size.saturating_sub(old.size);
        }
    }

    fn remove(&mut self, key: &CacheKey) -> Option<IndexEntry> {
        let entry = self.entries.remove(key)?;
        self.total_size = self.total_size.saturating_sub(entry.size);
        Some(entry)
    }

    /// Remove an unlocked entry and hold its key until the blob is deleted
    ///
    /// Blob names are derived from the key, so a new editor must not publish
    /// before the old blob is gone. Release with [`Self::release_editor`].
    fn claim(&mut self, key: &CacheKey) -> Option<IndexEntry> {
        if self.is_locked(key) {
            return None;
        }
        let entry = self.remove(key)?;
        self.locks.insert(
            key.clone(),
            KeyLock {
                editing: true,
                readers: 0,
            },
        );
        Some(entry)
    }

    /// Claim least-recently-read unlocked entries until the budget fits
    fn take_eviction_victims(&mut self, max_size: u64) -> Vec<(CacheKey, IndexEntry)> {
        if self.total_size <= max_size {
            return Vec::new();
        }

        let mut candidates: Vec<(u64, CacheKey)> = self
            .entries
            .iter()
            .filter(|(key, _)| !self.locks.contains_key(*key))
            .map(|(key, entry)| (entry.last_access, key.clone()))
            .collect();
        candidates.sort();

        let mut victims = Vec::new();
        for (_, key) in candidates {
            if self.total_size <= max_size {
                break;
            }
            if let Some(entry) = self.claim(&key) {
                victims.push((key, entry));
            }
        }
        victims
    }
}

struct DiskCacheInner {
    root: PathBuf,
    max_size_bytes: u64,
    state: Mutex<DiskState>,
    // Serializes index rewrites so a stale snapshot can't overwrite a newer one
    index_writer: tokio::sync::Mutex<()>,
    temp_counter: AtomicU64,
}

/// Handle to a disk cache directory
///
/// Cheap to clone; all clones share the same locks and index. Construct one
/// per cache directory and pass it to every consumer.
#[derive(Clone)]
pub struct DiskCache {
    inner: Arc<DiskCacheInner>,
}

impl DiskCache {
    /// Open (or create) a cache rooted at `root` with a fixed byte budget
    ///
    /// Entries whose blob vanished are dropped; orphan blobs and leftover
    /// temp files from an interrupted process are deleted.
    pub async fn open(root: impl Into<PathBuf>, max_size_bytes: u64) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await.map_err(at_path(&root))?;

        let mut state = DiskState::default();
        for (key, mut entry) in index::load(&root).await {
            let path = root.join(&entry.blob);
            match fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => {
                    entry.size = meta.len();
                    state.access_seq = state.access_seq.max(entry.last_access);
                    state.insert(key, entry);
                }
                _ => log::debug!("Dropping index entry for {key}: blob missing"),
            }
        }

        let cache = Self {
            inner: Arc::new(DiskCacheInner {
                root,
                max_size_bytes,
                state: Mutex::new(state),
                index_writer: tokio::sync::Mutex::new(()),
                temp_counter: AtomicU64::new(0),
            }),
        };

        cache.remove_strays().await?;
        cache.evict().await;
        cache.persist_index().await?;

        let stats = cache.stats();
        log::debug!(
            "Opened disk cache at {} ({} entries, {} of {} bytes)",
            cache.inner.root.display(),
            stats.entry_count,
            stats.total_size_bytes,
            stats.max_size_bytes
        );
        Ok(cache)
    }

    /// Open a cache whose budget is derived from free space
    pub async fn open_with_sizing(root: impl Into<PathBuf>, sizing: &DiskCacheSizing) -> Result<Self> {
        sizing.validate()?;
        let root = root.into();
        fs::create_dir_all(&root).await.map_err(at_path(&root))?;
        let max_size_bytes = sizing.resolve(&root);
        Self::open(root, max_size_bytes).await
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    pub fn max_size_bytes(&self) -> u64 {
        self.inner.max_size_bytes
    }

    /// Acquire the write lock for `key`
    ///
    /// Returns `None` while another editor or an open snapshot holds the
    /// key. Callers treat that as "can't persist right now", never as an
    /// error, and do not wait.
    pub fn open_editor(&self, key: &CacheKey) -> Option<Editor> {
        let mut state = self.state();
        if state.is_locked(key) {
            log::trace!("Editor for {key} unavailable: key busy");
            return None;
        }
        state.locks.insert(
            key.clone(),
            KeyLock {
                editing: true,
                readers: 0,
            },
        );
        drop(state);

        let seq = self.inner.temp_counter.fetch_add(1, Ordering::Relaxed);
        let temp_path = self
            .inner
            .root
            .join(format!("{}.{seq}.{TEMP_EXTENSION}", key.file_stem()));
        Some(Editor::new(self.clone(), key.clone(), temp_path))
    }

    /// Open a read handle to the committed blob for `key`
    ///
    /// Returns `None` on a miss, including while an editor is rewriting the
    /// key.
    pub fn open_snapshot(&self, key: &CacheKey) -> Option<Snapshot> {
        let mut state = self.state();
        if state.locks.get(key).is_some_and(|lock| lock.editing) {
            return None;
        }

        let access = state.next_access();
        let entry = state.entries.get_mut(key)?;
        entry.last_access = access;
        let path = self.inner.root.join(&entry.blob);
        let size = entry.size;

        state.locks.entry(key.clone()).or_default().readers += 1;
        drop(state);

        Some(Snapshot::new(self.clone(), key.clone(), path, size))
    }

    /// Whether an editor or snapshot currently holds `key`
    pub fn is_locked(&self, key: &CacheKey) -> bool {
        self.state().is_locked(key)
    }

    /// Whether a committed blob exists for `key`
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.state().entries.contains_key(key)
    }

    /// Remove a committed entry
    ///
    /// Returns `false` when the key is absent or currently locked.
    pub async fn remove(&self, key: &CacheKey) -> Result<bool> {
        let Some(entry) = self.state().claim(key) else {
            return Ok(false);
        };
        self.delete_claimed(key, &entry).await;
        self.persist_index().await?;
        Ok(true)
    }

    /// Remove every entry that isn't currently locked
    pub async fn clear(&self) -> Result<()> {
        let removed: Vec<(CacheKey, IndexEntry)> = {
            let mut state = self.state();
            let keys: Vec<CacheKey> = state.entries.keys().cloned().collect();
            keys.into_iter()
                .filter_map(|key| state.claim(&key).map(|entry| (key, entry)))
                .collect()
        };

        for (key, entry) in &removed {
            self.delete_claimed(key, entry).await;
        }
        self.persist_index().await
    }

    pub fn stats(&self) -> DiskCacheStats {
        let state = self.state();
        DiskCacheStats {
            entry_count: state.entries.len(),
            total_size_bytes: state.total_size,
            max_size_bytes: self.inner.max_size_bytes,
        }
    }

    fn state(&self) -> MutexGuard<'_, DiskState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish a fully written temp file under `key`
    ///
    /// The editor lock turns into a reader lock held by the returned
    /// snapshot.
    async fn publish(&self, key: &CacheKey, temp_path: &Path, size: u64) -> Result<Snapshot> {
        let blob = blob_name(key);
        let path = self.inner.root.join(&blob);
        fs::rename(temp_path, &path).await.map_err(at_path(&path))?;

        {
            let mut state = self.state();
            let last_access = state.next_access();
            state.insert(
                key.clone(),
                IndexEntry {
                    blob,
                    size,
                    last_access,
                },
            );
            let lock = state.locks.entry(key.clone()).or_default();
            lock.editing = false;
            lock.readers += 1;
        }
        log::trace!("Committed {key} ({size} bytes)");

        self.evict().await;
        if let Err(e) = self.persist_index().await {
            // The blob is live for this process; a restart just forgets it
            log::warn!("Failed to persist disk cache index after committing {key}: {e}");
        }

        Ok(Snapshot::new(self.clone(), key.clone(), path, size))
    }

    fn release_editor(&self, key: &CacheKey) {
        self.state().release_editor(key);
    }

    fn release_reader(&self, key: &CacheKey) {
        self.state().release_reader(key);
    }

    async fn evict(&self) {
        let victims = self
            .state()
            .take_eviction_victims(self.inner.max_size_bytes);
        for (key, entry) in victims {
            log::debug!("Evicting {key} ({} bytes) from disk cache", entry.size);
            self.delete_claimed(&key, &entry).await;
        }
    }

    async fn delete_claimed(&self, key: &CacheKey, entry: &IndexEntry) {
        self.delete_blob(&entry.blob).await;
        self.release_editor(key);
    }

    /// Forget the entry behind a snapshot whose blob is missing or unusable
    ///
    /// The caller's read lock keeps editors away while the blob is deleted.
    async fn discard(&self, key: &CacheKey, path: &Path) {
        let removed = {
            let mut state = self.state();
            let current = state
                .entries
                .get(key)
                .is_some_and(|entry| self.inner.root.join(&entry.blob) == path);
            if current { state.remove(key) } else { None }
        };
        let Some(entry) = removed else {
            return;
        };
        log::warn!("Dropping unusable disk cache entry {key}");
        self.delete_blob(&entry.blob).await;
        if let Err(e) = self.persist_index().await {
            log::warn!("Failed to persist disk cache index after dropping {key}: {e}");
        }
    }

    async fn delete_blob(&self, blob: &str) {
        let path = self.inner.root.join(blob);
        if let Err(e) = fs::remove_file(&path).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            log::warn!("Failed to delete {}: {e}", path.display());
        }
    }

    async fn persist_index(&self) -> Result<()> {
        let _guard = self.inner.index_writer.lock().await;
        let entries: Vec<(CacheKey, IndexEntry)> = self
            .state()
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        index::save(&self.inner.root, entries).await
    }

    /// Delete temp files and blobs the index doesn't know about
    async fn remove_strays(&self) -> Result<()> {
        let root = &self.inner.root;
        let known: HashSet<String> = self
            .state()
            .entries
            .values()
            .map(|e| e.blob.clone())
            .collect();
        let mut dir = fs::read_dir(root).await.map_err(at_path(root))?;

        while let Some(dirent) = dir.next_entry().await.map_err(at_path(root))? {
            let path = dirent.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let extension = path.extension().and_then(|e| e.to_str());

            let stray = match extension {
                Some(TEMP_EXTENSION) => true,
                Some(BLOB_EXTENSION) => !known.contains(name),
                _ => false,
            };
            if stray {
                log::debug!("Removing stray cache file {}", path.display());
                self.delete_blob(name).await;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for DiskCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskCache")
            .field("root", &self.inner.root)
            .field("max_size_bytes", &self.inner.max_size_bytes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn key(s: &str) -> CacheKey {
        CacheKey::new(s).unwrap()
    }

    async fn put(cache: &DiskCache, k: &str, data: &[u8]) {
        let mut editor = cache.open_editor(&key(k)).unwrap();
        editor.write_all(data).await.unwrap();
        editor.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_commit_publishes_blob() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::open(dir.path(), 1024).await.unwrap();
        let k = key("movie:42:w500");

        let mut editor = cache.open_editor(&k).unwrap();
        editor.write_all(b"poster").await.unwrap();
        assert!(cache.open_snapshot(&k).is_none());

        let snapshot = editor.commit().await.unwrap();
        assert_eq!(std::fs::read(snapshot.path()).unwrap(), b"poster");
        assert_eq!(snapshot.size(), 6);
        snapshot.close();

        assert!(!cache.is_locked(&k));
        assert_eq!(cache.stats().total_size_bytes, 6);
    }

    #[tokio::test]
    async fn test_single_editor_per_key() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::open(dir.path(), 1024).await.unwrap();
        let k = key("movie:42:w500");

        let first = cache.open_editor(&k);
        assert!(first.is_some());
        assert!(cache.open_editor(&k).is_none());
        assert!(cache.open_editor(&key("movie:43:w500")).is_some());

        drop(first);
        assert!(cache.open_editor(&k).is_some());
    }

    #[tokio::test]
    async fn test_abort_discards_partial_write() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::open(dir.path(), 1024).await.unwrap();
        let k = key("show:9:w185");

        let mut editor = cache.open_editor(&k).unwrap();
        editor.write_all(b"half").await.unwrap();
        editor.abort();

        assert!(cache.open_snapshot(&k).is_none());
        assert!(!cache.is_locked(&k));
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|x| x == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_open_snapshot_blocks_editor() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::open(dir.path(), 1024).await.unwrap();
        put(&cache, "a", b"1").await;

        let snapshot = cache.open_snapshot(&key("a")).unwrap();
        assert!(cache.open_editor(&key("a")).is_none());
        snapshot.close();
        assert!(cache.open_editor(&key("a")).is_some());
    }

    #[tokio::test]
    async fn test_evicts_least_recently_read() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::open(dir.path(), 10).await.unwrap();
        put(&cache, "a", b"aaaa").await;
        put(&cache, "b", b"bbbb").await;

        // Reading "a" makes "b" the eviction candidate
        cache.open_snapshot(&key("a")).unwrap().close();
        put(&cache, "c", b"cccc").await;

        assert!(cache.contains(&key("a")));
        assert!(!cache.contains(&key("b")));
        assert!(cache.contains(&key("c")));
        assert_eq!(cache.stats().total_size_bytes, 8);
    }

    #[tokio::test]
    async fn test_reopen_restores_index_and_cleans_strays() {
        let dir = TempDir::new().unwrap();
        {
            let cache = DiskCache::open(dir.path(), 1024).await.unwrap();
            put(&cache, "movie:1:w92", b"one").await;
        }
        std::fs::write(dir.path().join("deadbeef.3.tmp"), b"partial").unwrap();
        std::fs::write(dir.path().join("cafebabe.blob"), b"orphan").unwrap();

        let cache = DiskCache::open(dir.path(), 1024).await.unwrap();
        let snapshot = cache.open_snapshot(&key("movie:1:w92")).unwrap();
        assert_eq!(snapshot.read().await.unwrap().as_ref(), b"one");

        assert!(!dir.path().join("deadbeef.3.tmp").exists());
        assert!(!dir.path().join("cafebabe.blob").exists());
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::open(dir.path(), 1024).await.unwrap();
        put(&cache, "a", b"1").await;
        put(&cache, "b", b"22").await;

        assert!(cache.remove(&key("a")).await.unwrap());
        assert!(!cache.remove(&key("a")).await.unwrap());

        let held = cache.open_snapshot(&key("b")).unwrap();
        cache.clear().await.unwrap();
        assert!(cache.contains(&key("b")));
        held.close();

        cache.clear().await.unwrap();
        assert_eq!(cache.stats().entry_count, 0);
        assert_eq!(cache.stats().total_size_bytes, 0);
        assert!(!cache.is_locked(&key("a")));
        assert!(!cache.is_locked(&key("b")));
    }

    #[tokio::test]
    async fn test_claimed_key_blocks_editor_until_blob_is_gone() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::open(dir.path(), 1024).await.unwrap();
        put(&cache, "a", b"old").await;

        let entry = cache.state().claim(&key("a")).unwrap();
        assert!(!cache.contains(&key("a")));
        assert!(cache.open_editor(&key("a")).is_none());

        cache.delete_claimed(&key("a"), &entry).await;
        assert!(!cache.is_locked(&key("a")));

        put(&cache, "a", b"new").await;
        let snapshot = cache.open_snapshot(&key("a")).unwrap();
        assert_eq!(snapshot.read().await.unwrap().as_ref(), b"new");
    }

    #[tokio::test]
    async fn test_discard_drops_entry_and_blob() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::open(dir.path(), 1024).await.unwrap();
        put(&cache, "a", b"broken").await;

        let snapshot = cache.open_snapshot(&key("a")).unwrap();
        let path = snapshot.path().to_path_buf();
        snapshot.discard().await;

        assert!(!cache.contains(&key("a")));
        assert!(!cache.is_locked(&key("a")));
        assert!(!path.exists());
        assert_eq!(cache.stats().total_size_bytes, 0);
    }
}
