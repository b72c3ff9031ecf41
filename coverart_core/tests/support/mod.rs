//! Shared pipeline fixture for integration tests

#![allow(dead_code)]

use coverart_core::{
    Artwork, ArtworkKeys, CacheKey, DiskCache, KeyDeriver, MemoryCache, RequestPolicy, Resolver,
};
use coverart_test_utils::{MemoryCoverStore, MockFetcher};
use std::sync::Arc;
use tempfile::TempDir;

/// Resolver wired to a mock fetcher, a temp disk cache and an in-memory
/// cover store
pub struct Pipeline {
    pub dir: TempDir,
    pub fetcher: MockFetcher,
    pub covers: MemoryCoverStore,
    pub memory: Arc<MemoryCache>,
    pub disk: DiskCache,
    pub resolver: Arc<Resolver<Artwork>>,
}

impl Pipeline {
    pub async fn new() -> Self {
        Self::with_disk_budget(1024 * 1024).await
    }

    pub async fn with_disk_budget(max_size_bytes: u64) -> Self {
        let dir = TempDir::new().unwrap();
        let fetcher = MockFetcher::new();
        let covers = MemoryCoverStore::new(dir.path().join("covers"));
        let memory = Arc::new(MemoryCache::new());
        let disk = DiskCache::open(dir.path().join("cache"), max_size_bytes)
            .await
            .unwrap();

        let resolver = Resolver::builder(Arc::new(ArtworkKeys), Arc::new(fetcher.clone()))
            .memory(Arc::clone(&memory))
            .disk(disk.clone())
            .covers(Arc::new(covers.clone()))
            .build();

        Self {
            dir,
            fetcher,
            covers,
            memory,
            disk,
            resolver: Arc::new(resolver),
        }
    }

    pub fn key(item: &Artwork) -> CacheKey {
        CacheKey::new(ArtworkKeys.derive(item, &RequestPolicy::default()).unwrap()).unwrap()
    }

    /// Seed the disk cache directly
    pub async fn seed_disk(&self, item: &Artwork, data: &[u8]) {
        let mut editor = self.disk.open_editor(&Self::key(item)).unwrap();
        editor.write_all(data).await.unwrap();
        editor.commit().await.unwrap().close();
    }

    /// Names of leftover temp files in the cache directory
    pub fn temp_files(&self) -> Vec<String> {
        std::fs::read_dir(self.disk.root())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp"))
            .collect()
    }
}
