//! Cache keys and the derivers that produce them

use crate::error::{Result, ValidationError};
use crate::request::RequestPolicy;
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier for one cacheable artwork request
///
/// Never empty: an empty key would alias unrelated items in both caches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CacheKey(String);

impl CacheKey {
    /// Create a key, rejecting blank input
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(ValidationError::invalid_parameter("key", "must not be blank").into());
        }
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Hex MD5 of the key, used as the on-disk file stem
    pub fn file_stem(&self) -> String {
        let digest = Md5::digest(self.0.as_bytes());
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CacheKey {
    type Error = crate::Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}

/// Maps a domain item to its cache key
///
/// Implementations must be pure: the same item and policy always yield the
/// same key. Returning `None` (or an empty string) fails the request.
pub trait KeyDeriver<T>: Send + Sync {
    fn derive(&self, item: &T, policy: &RequestPolicy) -> Option<String>;
}

impl<T, F> KeyDeriver<T> for F
where
    F: Fn(&T, &RequestPolicy) -> Option<String> + Send + Sync,
{
    fn derive(&self, item: &T, policy: &RequestPolicy) -> Option<String> {
        self(item, policy)
    }
}

/// Run a deriver and turn an undecidable result into a fatal error
pub fn derive_key<T: fmt::Debug>(
    deriver: &dyn KeyDeriver<T>,
    item: &T,
    policy: &RequestPolicy,
) -> Result<CacheKey> {
    match deriver.derive(item, policy) {
        Some(key) if !key.trim().is_empty() => Ok(CacheKey(key)),
        _ => Err(ValidationError::missing_cache_key(format!("{item:?}")).into()),
    }
}
