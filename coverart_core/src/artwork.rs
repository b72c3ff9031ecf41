//! Artwork domain items
//!
//! The concrete item type resolved by the command line front end: a piece of
//! artwork for a movie, show, anime or book at a given size.

use crate::cache::LibraryCoverStore;
use crate::error::{Result, ValidationError};
use crate::fetch::ArtworkUrl;
use crate::key::KeyDeriver;
use crate::request::RequestPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Default size variant when none is requested
pub const DEFAULT_SIZE: &str = "w500";

/// Kind of media a piece of artwork belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Show,
    Anime,
    Book,
}

impl MediaKind {
    pub const ALL: [MediaKind; 4] = [Self::Movie, Self::Show, Self::Anime, Self::Book];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Show => "show",
            Self::Anime => "anime",
            Self::Book => "book",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                ValidationError::invalid_parameter("kind", "expected movie, show, anime or book")
                    .into()
            })
    }
}

/// Identity of the media item the artwork depicts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaRef {
    pub kind: MediaKind,
    pub id: u64,
}

/// One artwork request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artwork {
    pub media: MediaRef,
    /// Size or crop variant, e.g. `w500` or `original`
    pub size: String,
    /// Explicit URL; takes precedence over any URL template
    pub source_url: Option<String>,
    /// Library titles keep a permanent cover file
    pub in_library: bool,
}

impl Artwork {
    pub fn new(kind: MediaKind, id: u64) -> Self {
        Self {
            media: MediaRef { kind, id },
            size: DEFAULT_SIZE.to_string(),
            source_url: None,
            in_library: false,
        }
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = size.into();
        self
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    pub fn with_in_library(mut self, in_library: bool) -> Self {
        self.in_library = in_library;
        self
    }
}

/// Derives `"{kind}:{id}:{size}"` keys
#[derive(Debug, Clone, Copy, Default)]
pub struct ArtworkKeys;

impl KeyDeriver<Artwork> for ArtworkKeys {
    fn derive(&self, item: &Artwork, _policy: &RequestPolicy) -> Option<String> {
        let size = item.size.trim();
        if size.is_empty() {
            return None;
        }
        Some(format!("{}:{}:{size}", item.media.kind, item.media.id))
    }
}

/// Builds artwork URLs from a template
///
/// `{kind}`, `{id}` and `{size}` are substituted. Items carrying their own
/// `source_url` bypass the template.
#[derive(Debug, Clone, Default)]
pub struct UrlTemplate {
    template: Option<String>,
}

impl UrlTemplate {
    pub fn new(template: Option<String>) -> Self {
        Self {
            template: template.filter(|t| !t.trim().is_empty()),
        }
    }
}

impl ArtworkUrl<Artwork> for UrlTemplate {
    fn url_for(&self, item: &Artwork) -> Option<String> {
        if let Some(url) = &item.source_url {
            return Some(url.clone());
        }
        let template = self.template.as_ref()?;
        Some(
            template
                .replace("{kind}", item.media.kind.as_str())
                .replace("{id}", &item.media.id.to_string())
                .replace("{size}", &item.size),
        )
    }
}

/// Cover store keeping `<root>/<kind>/<id>-<size>.img` for library titles
pub fn library_covers(root: impl Into<PathBuf>) -> LibraryCoverStore<Artwork> {
    LibraryCoverStore::new(
        root,
        |item: &Artwork| {
            let size = item.size.trim();
            if size.is_empty() || size.contains(['/', '\\']) {
                return None;
            }
            let file_name = format!("{}-{size}.img", item.media.id);
            Some(PathBuf::from(item.media.kind.as_str()).join(file_name))
        },
        |item: &Artwork| item.in_library,
    )
}
