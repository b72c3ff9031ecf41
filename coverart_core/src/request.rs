//! Per-request policy and the result handed back to callers

use crate::image::DecodedImage;
use serde::{Deserialize, Serialize};

/// Which tiers a single resolution may read from or write to
///
/// Writing to memory is not configurable: every successful resolution lands
/// in the memory cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPolicy {
    pub memory_read: bool,
    pub disk_read: bool,
    pub disk_write: bool,
}

impl Default for RequestPolicy {
    fn default() -> Self {
        Self {
            memory_read: true,
            disk_read: true,
            disk_write: true,
        }
    }
}

impl RequestPolicy {
    /// Skip every cache read and persist nothing to disk
    pub fn network_only() -> Self {
        Self {
            memory_read: false,
            disk_read: false,
            disk_write: false,
        }
    }

    pub fn with_memory_read(mut self, enabled: bool) -> Self {
        self.memory_read = enabled;
        self
    }

    pub fn with_disk_read(mut self, enabled: bool) -> Self {
        self.disk_read = enabled;
        self
    }

    pub fn with_disk_write(mut self, enabled: bool) -> Self {
        self.disk_write = enabled;
        self
    }
}

/// Tier a resolved image came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataSource {
    Memory,
    Disk,
    Network,
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Memory => "memory",
            Self::Disk => "disk",
            Self::Network => "network",
        };
        f.write_str(name)
    }
}

/// Outcome of a successful resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    pub image: DecodedImage,
    pub source: DataSource,
}

impl FetchResult {
    pub fn new(image: DecodedImage, source: DataSource) -> Self {
        Self { image, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_enables_everything() {
        let policy = RequestPolicy::default();
        assert!(policy.memory_read && policy.disk_read && policy.disk_write);
    }

    #[test]
    fn test_policy_builders() {
        let policy = RequestPolicy::default()
            .with_memory_read(false)
            .with_disk_write(false);

        assert!(!policy.memory_read);
        assert!(policy.disk_read);
        assert!(!policy.disk_write);
        assert_eq!(RequestPolicy::network_only(), policy.with_disk_read(false));
    }

    #[test]
    fn test_data_source_display() {
        assert_eq!(DataSource::Memory.to_string(), "memory");
        assert_eq!(DataSource::Network.to_string(), "network");
    }
}
