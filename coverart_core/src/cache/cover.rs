//! Permanent per-item cover files
//!
//! Items the domain layer wants kept forever (e.g. titles in the user's
//! library) get a cover file outside the generic disk cache, so eviction
//! never touches them. Cover writes are best effort: failures are logged and
//! reported as `None`, never raised.

use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Resolves the permanent cover path for an item, if it has one
pub trait CoverStore<T>: Send + Sync {
    /// `Some(path)` only when the item qualifies for permanent storage
    fn path_for(&self, item: &T) -> Option<PathBuf>;
}

type PathResolver<T> = Box<dyn Fn(&T) -> Option<PathBuf> + Send + Sync>;
type Qualifier<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

/// Cover store rooted at a directory
///
/// The domain layer supplies both the relative path for an item and the
/// predicate deciding whether the item qualifies.
pub struct LibraryCoverStore<T> {
    root: PathBuf,
    relative_path: PathResolver<T>,
    qualifies: Qualifier<T>,
}

impl<T> LibraryCoverStore<T> {
    pub fn new<R, Q>(root: impl Into<PathBuf>, relative_path: R, qualifies: Q) -> Self
    where
        R: Fn(&T) -> Option<PathBuf> + Send + Sync + 'static,
        Q: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self {
            root: root.into(),
            relative_path: Box::new(relative_path),
            qualifies: Box::new(qualifies),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl<T> CoverStore<T> for LibraryCoverStore<T> {
    fn path_for(&self, item: &T) -> Option<PathBuf> {
        if !(self.qualifies)(item) {
            return None;
        }
        let relative = (self.relative_path)(item)?;
        if !is_contained(&relative) {
            log::warn!(
                "Refusing cover path outside {}: {}",
                self.root.display(),
                relative.display()
            );
            return None;
        }
        Some(self.root.join(relative))
    }
}

fn is_contained(relative: &Path) -> bool {
    !relative.as_os_str().is_empty()
        && relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

static STAGING_SEQ: AtomicU64 = AtomicU64::new(0);

/// Write `data` to `path` unless a cover already exists there
///
/// Returns the path only when this call wrote the cover; an existing file is
/// left alone and yields `None`. The write is staged next to the target and
/// renamed into place, so readers never see a partial cover.
pub async fn write_if_absent(data: &[u8], path: &Path) -> Option<PathBuf> {
    if fs::try_exists(path).await.unwrap_or(false) {
        log::debug!("Cover {} already present, not overwriting", path.display());
        return None;
    }

    match stage_and_rename(data, path).await {
        Ok(()) => {
            log::debug!("Wrote cover {} ({} bytes)", path.display(), data.len());
            Some(path.to_path_buf())
        }
        Err(e) => {
            log::warn!("Failed to write cover {}: {e}", path.display());
            None
        }
    }
}

/// Delete a cover that can't be decoded so the next fetch can replace it
pub async fn discard(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => log::warn!("Discarded unreadable cover {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("Failed to discard cover {}: {e}", path.display()),
    }
}

async fn stage_and_rename(data: &[u8], path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| std::io::Error::other("cover path has no file name"))?;
    let seq = STAGING_SEQ.fetch_add(1, Ordering::Relaxed);
    let staging = path.with_file_name(format!(".{file_name}.{seq}.part"));

    let result = async {
        let mut file = fs::File::create(&staging).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&staging, path).await
    }
    .await;

    if result.is_err() {
        let _ = fs::remove_file(&staging).await;
    }
    result
}
