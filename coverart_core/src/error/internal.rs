//! Internal library error types

use thiserror::Error;

/// Internal library errors
#[derive(Error, Debug)]
pub enum InternalError {
    /// Artwork bytes could not be turned into a renderable image
    #[error("Failed to decode artwork for '{key}': {message}")]
    Decode { key: String, message: String },

    /// The disk cache index is unreadable or inconsistent
    #[error("Disk cache index error: {message}")]
    CacheIndex { message: String },

    /// Internal assertion failure
    #[error("Internal assertion failed: {message}")]
    Assertion { message: String },
}

impl InternalError {
    /// Create a decode error
    pub fn decode(key: &str, message: &str) -> Self {
        Self::Decode {
            key: key.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a cache index error
    pub fn cache_index(message: impl Into<String>) -> Self {
        Self::CacheIndex {
            message: message.into(),
        }
    }

    /// Create an internal assertion failure error
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::Assertion {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error() {
        let error = InternalError::decode("show:9:w185", "empty payload");
        assert!(error.to_string().contains("Failed to decode"));
        assert!(error.to_string().contains("show:9:w185"));
        assert!(error.to_string().contains("empty payload"));
    }

    #[test]
    fn test_cache_index_error() {
        let error = InternalError::cache_index("duplicate blob name");
        assert!(error.to_string().contains("Disk cache index error"));
        assert!(error.to_string().contains("duplicate blob name"));
    }

    #[test]
    fn test_assertion_error() {
        let error = InternalError::assertion("Invariant violated");
        assert!(error.to_string().contains("Internal assertion failed"));
        assert!(error.to_string().contains("Invariant violated"));
    }
}
