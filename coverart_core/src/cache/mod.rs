//! Cache tiers used by the artwork resolver
//!
//! - [`memory`]: decoded images, bounded by bytes, LRU
//! - [`cover`]: permanent per-item cover files, never evicted
//! - [`disk`]: generic keyed blob store with editor/snapshot transactions

pub mod cover;
pub mod disk;
pub mod memory;

pub use cover::{CoverStore, LibraryCoverStore};
pub use disk::{DiskCache, DiskCacheSizing, DiskCacheStats, Editor, Snapshot};
pub use memory::{MemoryCache, MemoryCacheConfig, MemoryCacheStats};
