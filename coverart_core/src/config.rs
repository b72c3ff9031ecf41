//! Pipeline configuration
//!
//! Plain serde types so front ends can layer them from files and the
//! environment.

use crate::cache::{DiskCacheSizing, MemoryCacheConfig};
use crate::error::{Result, ValidationError};
use serde::{Deserialize, Serialize};

/// HTTP transport settings shared by both fetch strategies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Whole-request timeout
    pub timeout_seconds: u64,
    pub connect_timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            connect_timeout_seconds: 10,
            user_agent: format!("coverart/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Everything needed to build a resolver's cache tiers and fetchers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub memory: MemoryCacheConfig,
    #[serde(default)]
    pub disk: DiskCacheSizing,
    #[serde(default)]
    pub network: NetworkConfig,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        self.disk.validate()?;
        if self.memory.max_memory_bytes == 0 {
            return Err(
                ValidationError::invalid_configuration("memory.max_memory_bytes must be > 0").into(),
            );
        }
        if self.network.timeout_seconds == 0 {
            return Err(ValidationError::invalid_configuration(
                "network.timeout_seconds must be > 0",
            )
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let mut config = PipelineConfig::default();
        config.network.timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"memory":{"max_entries":10,"max_memory_bytes":1024}}"#)
                .unwrap();

        assert_eq!(config.memory.max_entries, Some(10));
        assert_eq!(config.disk, DiskCacheSizing::default());
        assert_eq!(config.network.timeout_seconds, 30);
    }
}
