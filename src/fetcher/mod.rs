//! Remote API access

pub mod api_config;
pub mod api_http;

pub use api_config::ApiConfig;
pub use api_http::{ApiClient, Credential};

/// Fetcher errors
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    /// Non-success HTTP status
    #[error("HTTP {status}: {reason}")]
    HttpStatus {
        /// Status code
        status: u16,
        /// Canonical reason phrase or body excerpt
        reason: String,
    },

    /// Response parse error
    #[error("parse error: {0}")]
    ParseError(String),

    /// Rate limit exceeded (HTTP 429)
    #[error("rate limit exceeded")]
    RateLimitExceeded,

    /// Network error (connect, timeout, TLS)
    #[error("network error: {0}")]
    NetworkError(String),

    /// Client construction error
    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl FetcherError {
    /// Whether this error must stop the whole batch
    pub fn is_fatal(&self) -> bool {
        matches!(self, FetcherError::RateLimitExceeded)
    }
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;
