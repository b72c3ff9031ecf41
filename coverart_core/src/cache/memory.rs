//! Memory-based artwork cache
//!
//! Bounded by total decoded bytes (and optionally entry count) with
//! least-recently-used eviction. A miss is always a legal outcome.

use crate::image::DecodedImage;
use crate::key::CacheKey;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;

/// Configuration for the memory cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryCacheConfig {
    /// Maximum number of entries to keep in cache
    pub max_entries: Option<usize>,
    /// Maximum total decoded bytes to hold
    pub max_memory_bytes: u64,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: None,
            max_memory_bytes: 64 * 1024 * 1024, // 64MB default
        }
    }
}

/// Memory cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryCacheStats {
    pub entry_count: usize,
    pub total_size_bytes: u64,
    pub hit_count: u64,
    pub miss_count: u64,
    pub eviction_count: u64,
}

struct MemoryEntry {
    image: DecodedImage,
    size: u64,
    last_access: u64,
}

#[derive(Default)]
struct MemoryState {
    entries: HashMap<CacheKey, MemoryEntry>,
    // access tick -> key, oldest first
    recency: BTreeMap<u64, CacheKey>,
    tick: u64,
    stats: MemoryCacheStats,
}

impl MemoryState {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn detach(&mut self, key: &CacheKey) -> Option<MemoryEntry> {
        let entry = self.entries.remove(key)?;
        self.recency.remove(&entry.last_access);
        self.stats.entry_count -= 1;
        self.stats.total_size_bytes = self.stats.total_size_bytes.saturating_sub(entry.size);
        Some(entry)
    }

    fn evict_oldest(&mut self) -> bool {
        let Some((_, key)) = self.recency.pop_first() else {
            return false;
        };
        if let Some(entry) = self.entries.remove(&key) {
            self.stats.entry_count -= 1;
            self.stats.total_size_bytes = self.stats.total_size_bytes.saturating_sub(entry.size);
            self.stats.eviction_count += 1;
            log::trace!("Evicted {key} from memory cache");
        }
        true
    }
}

/// Process-wide decoded artwork cache shared by all resolutions
pub struct MemoryCache {
    state: Mutex<MemoryState>,
    config: MemoryCacheConfig,
}

impl MemoryCache {
    /// Create a new memory cache with default configuration
    pub fn new() -> Self {
        Self::with_config(MemoryCacheConfig::default())
    }

    /// Create a new memory cache with custom configuration
    pub fn with_config(config: MemoryCacheConfig) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            config,
        }
    }

    pub fn config(&self) -> &MemoryCacheConfig {
        &self.config
    }

    /// Look up an image, marking it most recently used on a hit
    pub async fn get(&self, key: &CacheKey) -> Option<DecodedImage> {
        let mut state = self.state.lock().await;
        let tick = state.next_tick();

        let MemoryState {
            entries,
            recency,
            stats,
            ..
        } = &mut *state;

        match entries.get_mut(key) {
            Some(entry) => {
                recency.remove(&entry.last_access);
                entry.last_access = tick;
                recency.insert(tick, key.clone());
                stats.hit_count += 1;
                Some(entry.image.clone())
            }
            None => {
                stats.miss_count += 1;
                None
            }
        }
    }

    /// Store an image, replacing any previous entry for the key
    ///
    /// An image larger than the whole budget is not retained.
    pub async fn put(&self, key: &CacheKey, image: DecodedImage) {
        let size = image.byte_size();
        let mut state = self.state.lock().await;

        state.detach(key);

        if size > self.config.max_memory_bytes {
            log::debug!(
                "Not caching {key} in memory: {size} bytes exceeds budget of {}",
                self.config.max_memory_bytes
            );
            return;
        }

        while state.stats.total_size_bytes + size > self.config.max_memory_bytes {
            if !state.evict_oldest() {
                break;
            }
        }
        if let Some(max) = self.config.max_entries {
            while state.entries.len() >= max {
                if !state.evict_oldest() {
                    break;
                }
            }
        }

        let tick = state.next_tick();
        state.recency.insert(tick, key.clone());
        state.entries.insert(
            key.clone(),
            MemoryEntry {
                image,
                size,
                last_access: tick,
            },
        );
        state.stats.entry_count += 1;
        state.stats.total_size_bytes += size;
    }

    /// Check for an entry without touching recency or statistics
    pub async fn contains(&self, key: &CacheKey) -> bool {
        self.state.lock().await.entries.contains_key(key)
    }

    /// Remove a specific entry
    pub async fn remove(&self, key: &CacheKey) -> Option<DecodedImage> {
        let mut state = self.state.lock().await;
        state.detach(key).map(|entry| entry.image)
    }

    /// Drop every entry and reset statistics
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        *state = MemoryState::default();
    }

    pub async fn stats(&self) -> MemoryCacheStats {
        self.state.lock().await.stats.clone()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}
