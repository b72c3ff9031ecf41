//! Error types for the coverart pipeline
//!
//! Errors are grouped by where they originate so callers can decide what to
//! surface: storage, the network transport, caller-supplied input, or the
//! pipeline's own bookkeeping.

use thiserror::Error;

pub mod internal;
pub mod io;
pub mod network;
pub mod validation;

pub(crate) use self::io::at_path;
pub use self::io::{IoError, IoErrorKind};
pub use self::network::NetworkError;
pub use self::validation::ValidationError;
pub use internal::InternalError;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the coverart pipeline
///
/// Errors are categorized into four main types:
/// - I/O errors: cache directory and cover file operations
/// - Network errors: artwork transfer failures
/// - Validation errors: undecidable keys and bad configuration
/// - Internal errors: decoding and cache index bookkeeping
#[derive(Error, Debug)]
pub enum Error {
    /// I/O related errors
    #[error(transparent)]
    Io(#[from] IoError),

    /// Network related errors
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// Validation related errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Internal library errors
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl Error {
    /// Whether retrying the same resolution later could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(err) => err.is_transient(),
            Self::Io(err) => err.kind == IoErrorKind::Other,
            _ => false,
        }
    }
}

// Conversions from external error types

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::Io(IoError::from_std(source))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(NetworkError::from_reqwest(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(InternalError::cache_index(format!(
            "Failed to (de)serialize cache index: {err}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;
    use std::io;
    use std::path::Path;

    #[test]
    fn test_file_not_found_error_creation() {
        let path = Path::new("/covers/movie/42.jpg");
        let error = Error::Io(IoError::file_not_found(path));

        match error {
            Error::Io(io_err) => {
                assert_eq!(io_err.kind, IoErrorKind::FileNotFound);
                assert_eq!(io_err.path, Some(path.to_path_buf()));
            }
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_missing_cache_key_error() {
        let error = Error::Validation(ValidationError::missing_cache_key("movie:42"));

        assert!(matches!(
            error,
            Error::Validation(ValidationError::MissingCacheKey { .. })
        ));
        assert!(error.to_string().contains("movie:42"));
        assert!(!error.is_transient());
    }

    #[test]
    fn test_network_errors_are_transient() {
        assert!(Error::Network(NetworkError::Offline).is_transient());
        assert!(Error::Network(NetworkError::http_status(503, "https://x/y.jpg")).is_transient());
        assert!(!Error::Network(NetworkError::http_status(404, "https://x/y.jpg")).is_transient());
    }

    #[test]
    fn test_decode_error_display() {
        let error = Error::Internal(InternalError::decode("movie:42:w500", "truncated stream"));
        let display = error.to_string();

        assert!(display.contains("movie:42:w500"));
        assert!(display.contains("truncated stream"));
    }

    #[test]
    fn test_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "missing blob");
        let error: Error = io_error.into();

        match error {
            Error::Io(io_err) => assert_eq!(io_err.kind, IoErrorKind::FileNotFound),
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_from_json_error_is_index_error() {
        let json_error = serde_json::from_str::<u32>("not json").unwrap_err();
        let error: Error = json_error.into();

        assert!(matches!(
            error,
            Error::Internal(InternalError::CacheIndex { .. })
        ));
    }

    #[test]
    fn test_error_source_chain() {
        let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "Access denied");
        let error = Error::Io(IoError::permission_denied(Path::new("/covers"), io_error));

        assert!(error.source().is_some());
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
