//! Cover store with an in-memory qualification set

use coverart_core::{Artwork, CoverStore, MediaRef};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Cover store whose library membership is kept in memory
///
/// Unlike the real library store, qualification is decided by the set of
/// media registered here rather than the item's own `in_library` flag, so
/// tests can flip membership between resolutions.
#[derive(Clone)]
pub struct MemoryCoverStore {
    root: PathBuf,
    library: Arc<Mutex<HashSet<MediaRef>>>,
    lookups: Arc<Mutex<Vec<MediaRef>>>,
}

impl MemoryCoverStore {
    /// Create a store writing covers under `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            library: Arc::new(Mutex::new(HashSet::new())),
            lookups: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Register media as a library title
    pub fn add(&self, media: MediaRef) {
        self.library.lock().unwrap().insert(media);
    }

    pub fn remove(&self, media: &MediaRef) {
        self.library.lock().unwrap().remove(media);
    }

    /// Cover path for media regardless of membership
    pub fn cover_path(&self, media: &MediaRef) -> PathBuf {
        self.root.join(format!("{}-{}.cover", media.kind, media.id))
    }

    /// Media `path_for` was asked about, in call order
    pub fn lookups(&self) -> Vec<MediaRef> {
        self.lookups.lock().unwrap().clone()
    }
}

impl CoverStore<Artwork> for MemoryCoverStore {
    fn path_for(&self, item: &Artwork) -> Option<PathBuf> {
        self.lookups.lock().unwrap().push(item.media);
        self.library
            .lock()
            .unwrap()
            .contains(&item.media)
            .then(|| self.cover_path(&item.media))
    }
}
