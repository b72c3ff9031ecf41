//! Artwork service for the coverart CLI
//!
//! Wires the core resolver to the configured cache directories and HTTP
//! fetcher, and exposes the cache maintenance operations the commands need.

use crate::config::AppConfig;
use anyhow::{Context, Result};
use coverart_core::{
    Artwork, ArtworkKeys, ArtworkUrl, DiskCache, DiskCacheStats, FetchResult,
    HttpBufferedFetcher, HttpStreamedFetcher, LibraryCoverStore, MemoryCache, NetworkFetcher,
    RequestPolicy, Resolver, UrlTemplate, library_covers,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// Which fetch strategy the service uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    #[default]
    Buffered,
    Streamed,
}

/// Summary of both on-disk stores
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StorageStats {
    pub cache_dir: PathBuf,
    pub cache_entries: usize,
    pub cache_bytes: u64,
    pub cache_max_bytes: u64,
    pub covers_dir: PathBuf,
    pub cover_files: usize,
    pub cover_bytes: u64,
}

/// Resolver plus the stores it was built over
pub struct ArtworkService {
    resolver: Resolver<Artwork>,
    disk: DiskCache,
    covers_dir: PathBuf,
}

impl ArtworkService {
    /// Open the caches named in `config` and build a resolver over them
    pub async fn open(config: &AppConfig, mode: FetchMode) -> Result<Self> {
        let disk = Self::open_disk(config).await?;

        let urls: Arc<dyn ArtworkUrl<Artwork>> =
            Arc::new(UrlTemplate::new(config.artwork.url_template.clone()));
        let network = &config.pipeline.network;
        let fetcher: Arc<dyn NetworkFetcher<Artwork>> = match mode {
            FetchMode::Buffered => Arc::new(HttpBufferedFetcher::new(network, urls)?),
            FetchMode::Streamed => Arc::new(HttpStreamedFetcher::new(network, urls)?),
        };

        let covers: LibraryCoverStore<Artwork> = library_covers(&config.paths.covers_dir);
        let resolver = Resolver::builder(Arc::new(ArtworkKeys), fetcher)
            .memory(Arc::new(MemoryCache::with_config(
                config.pipeline.memory.clone(),
            )))
            .disk(disk.clone())
            .covers(Arc::new(covers))
            .build();

        Ok(Self {
            resolver,
            disk,
            covers_dir: config.paths.covers_dir.clone(),
        })
    }

    /// Open only the stores, for maintenance commands
    pub async fn open_disk(config: &AppConfig) -> Result<DiskCache> {
        DiskCache::open_with_sizing(&config.paths.cache_dir, &config.pipeline.disk)
            .await
            .with_context(|| {
                format!(
                    "Failed to open disk cache at {}",
                    config.paths.cache_dir.display()
                )
            })
    }

    pub async fn fetch(&self, item: &Artwork, policy: &RequestPolicy) -> Result<FetchResult> {
        self.resolver
            .resolve(item, policy)
            .await
            .with_context(|| format!("Failed to resolve {} {}", item.media.kind, item.media.id))
    }

    pub fn disk(&self) -> &DiskCache {
        &self.disk
    }

    pub fn covers_dir(&self) -> &Path {
        &self.covers_dir
    }
}

/// Collect statistics for the disk cache and the cover directory
pub async fn storage_stats(disk: &DiskCache, covers_dir: &Path) -> Result<StorageStats> {
    let DiskCacheStats {
        entry_count,
        total_size_bytes,
        max_size_bytes,
    } = disk.stats();
    let (cover_files, cover_bytes) = scan_covers(covers_dir).await?;

    Ok(StorageStats {
        cache_dir: disk.root().to_path_buf(),
        cache_entries: entry_count,
        cache_bytes: total_size_bytes,
        cache_max_bytes: max_size_bytes,
        covers_dir: covers_dir.to_path_buf(),
        cover_files,
        cover_bytes,
    })
}

/// Empty the disk cache, and the cover directory when `covers` is set
///
/// Returns the number of cache entries and cover files removed.
pub async fn clear_storage(disk: &DiskCache, covers_dir: &Path, covers: bool) -> Result<(usize, usize)> {
    let before = disk.stats().entry_count;
    disk.clear().await.context("Failed to clear disk cache")?;
    let cleared = before.saturating_sub(disk.stats().entry_count);

    let mut removed_covers = 0;
    if covers && tokio::fs::try_exists(covers_dir).await.unwrap_or(false) {
        removed_covers = scan_covers(covers_dir).await?.0;
        tokio::fs::remove_dir_all(covers_dir)
            .await
            .with_context(|| format!("Failed to remove {}", covers_dir.display()))?;
    }
    Ok((cleared, removed_covers))
}

/// Count files and bytes below the cover directory
async fn scan_covers(root: &Path) -> Result<(usize, u64)> {
    let root = root.to_path_buf();
    tokio::task::spawn_blocking(move || walk_covers(&root))
        .await
        .context("Cover scan task panicked")?
}

fn walk_covers(root: &Path) -> Result<(usize, u64)> {
    if !root.exists() {
        return Ok((0, 0));
    }

    let mut files = 0;
    let mut bytes = 0;
    for entry in WalkDir::new(root) {
        let entry = entry.with_context(|| format!("Failed to scan {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let metadata = entry
            .metadata()
            .with_context(|| format!("Failed to stat {}", entry.path().display()))?;
        files += 1;
        bytes += metadata.len();
    }
    Ok((files, bytes))
}
