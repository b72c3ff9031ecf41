//! Network related error types

use thiserror::Error;

/// Errors raised while transferring artwork from the network
#[derive(Error, Debug)]
pub enum NetworkError {
    /// No route to the artwork host
    #[error("Network is offline or the artwork host is unreachable")]
    Offline,

    /// The transfer did not finish in time
    #[error("Request timed out: {url}")]
    Timeout { url: String },

    /// Non-success HTTP status
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// Transport failure while sending or reading a body
    #[error("Transfer failed: {message}")]
    Transport { message: String },

    /// No URL could be built for the requested item
    #[error("No artwork URL for '{item}'")]
    MissingUrl { item: String },
}

impl NetworkError {
    /// Create an HTTP status error
    pub fn http_status(status: u16, url: &str) -> Self {
        Self::HttpStatus {
            status,
            url: url.to_string(),
        }
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a missing URL error
    pub fn missing_url(item: impl Into<String>) -> Self {
        Self::MissingUrl { item: item.into() }
    }

    /// Classify a reqwest failure
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "<unknown>".to_string());

        if err.is_timeout() {
            Self::Timeout { url }
        } else if err.is_connect() {
            Self::Offline
        } else if let Some(status) = err.status() {
            Self::http_status(status.as_u16(), &url)
        } else {
            Self::transport(err.to_string())
        }
    }

    /// Check if this error is transient and can be retried by the caller
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Offline | Self::Timeout { .. } | Self::Transport { .. } => true,
            Self::HttpStatus { status, .. } => matches!(status, 408 | 429 | 500..=504),
            Self::MissingUrl { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_error() {
        let error = NetworkError::Offline;
        assert!(error.to_string().contains("offline"));
        assert!(error.is_transient());
    }

    #[test]
    fn test_http_status_error() {
        let error = NetworkError::http_status(502, "https://img.example/w500/42.jpg");
        assert!(error.to_string().contains("502"));
        assert!(error.to_string().contains("w500/42.jpg"));
        assert!(error.is_transient());
    }

    #[test]
    fn test_client_errors_are_permanent() {
        let error = NetworkError::http_status(404, "https://img.example/w500/42.jpg");
        assert!(!error.is_transient());
    }

    #[test]
    fn test_missing_url_error() {
        let error = NetworkError::missing_url("book:7:w342");
        assert!(error.to_string().contains("book:7:w342"));
        assert!(!error.is_transient());
    }
}
