//! Builder for artwork items

use coverart_core::{Artwork, MediaKind};

/// Builder for [`Artwork`] test items
#[derive(Debug, Clone)]
pub struct ArtworkBuilder {
    kind: MediaKind,
    id: u64,
    size: Option<String>,
    url: Option<String>,
    in_library: bool,
}

impl ArtworkBuilder {
    pub fn new(kind: MediaKind, id: u64) -> Self {
        Self {
            kind,
            id,
            size: None,
            url: None,
            in_library: false,
        }
    }

    pub fn movie(id: u64) -> Self {
        Self::new(MediaKind::Movie, id)
    }

    pub fn show(id: u64) -> Self {
        Self::new(MediaKind::Show, id)
    }

    /// Set size variant
    pub fn size(mut self, size: &str) -> Self {
        self.size = Some(size.to_string());
        self
    }

    /// Set explicit source URL
    pub fn url(mut self, url: &str) -> Self {
        self.url = Some(url.to_string());
        self
    }

    /// Mark as a library title
    pub fn in_library(mut self) -> Self {
        self.in_library = true;
        self
    }

    pub fn build(self) -> Artwork {
        let mut artwork = Artwork::new(self.kind, self.id).with_in_library(self.in_library);
        if let Some(size) = self.size {
            artwork = artwork.with_size(size);
        }
        if let Some(url) = self.url {
            artwork = artwork.with_source_url(url);
        }
        artwork
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let artwork = ArtworkBuilder::movie(42).build();
        assert_eq!(artwork.media.id, 42);
        assert_eq!(artwork.size, "w500");
        assert!(!artwork.in_library);
        assert!(artwork.source_url.is_none());
    }
}
