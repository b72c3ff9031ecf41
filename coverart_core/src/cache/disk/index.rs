//! Persistent index of committed disk-cache entries

use crate::error::{Result, at_path};
use crate::key::CacheKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tokio::fs;

pub(super) const INDEX_FILE: &str = "index.json";
const INDEX_VERSION: u32 = 1;

/// One committed blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(super) struct IndexEntry {
    pub blob: String,
    pub size: u64,
    pub last_access: u64,
}

#[derive(Serialize, Deserialize)]
struct IndexFile {
    version: u32,
    // Stored as pairs to keep the on-disk order stable and readable
    entries: Vec<(CacheKey, IndexEntry)>,
}

/// Blob file name for a key
pub(super) fn blob_name(key: &CacheKey) -> String {
    format!("{}.blob", key.file_stem())
}

/// Load the index, treating an unreadable file as empty
pub(super) async fn load(root: &Path) -> HashMap<CacheKey, IndexEntry> {
    let path = root.join(INDEX_FILE);
    let data = match fs::read_to_string(&path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return HashMap::new(),
        Err(e) => {
            log::warn!("Failed to read disk cache index {}: {e}", path.display());
            return HashMap::new();
        }
    };

    match serde_json::from_str::<IndexFile>(&data) {
        Ok(file) if file.version == INDEX_VERSION => file
            .entries
            .into_iter()
            // Never trust a blob name that doesn't match its key
            .filter(|(key, entry)| entry.blob == blob_name(key))
            .collect(),
        Ok(file) => {
            log::warn!(
                "Ignoring disk cache index with unsupported version {}",
                file.version
            );
            HashMap::new()
        }
        Err(e) => {
            log::warn!("Discarding corrupt disk cache index: {e}");
            HashMap::new()
        }
    }
}

/// Atomically replace the index file
pub(super) async fn save(root: &Path, entries: Vec<(CacheKey, IndexEntry)>) -> Result<()> {
    let mut entries = entries;
    entries.sort_by(|a, b| a.1.last_access.cmp(&b.1.last_access));

    let data = serde_json::to_string_pretty(&IndexFile {
        version: INDEX_VERSION,
        entries,
    })?;

    let path = root.join(INDEX_FILE);
    let temp = root.join(format!("{INDEX_FILE}.tmp"));
    fs::write(&temp, data).await.map_err(at_path(&temp))?;
    fs::rename(&temp, &path).await.map_err(at_path(&path))?;
    Ok(())
}
