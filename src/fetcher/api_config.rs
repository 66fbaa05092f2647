//! API connection configuration
//!
//! Everything that differs between the production API and a test server is
//! configuration: base URL, probe resource, usage header name and timeouts.

use reqwest::Client;
use std::time::Duration;

use super::{FetcherError, FetcherResult};
use crate::downloader::config::{
    DEFAULT_BASE_URL, DEFAULT_PROBE_PATH, HTTP_CONNECT_TIMEOUT_SECS, HTTP_REQUEST_TIMEOUT_SECS,
    USAGE_HEADER,
};

/// Connection settings for the remote API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL for API endpoints (e.g., <https://www.strava.com/api/v3>)
    pub base_url: String,
    /// Path of the resource used to refresh the usage signal
    pub probe_path: String,
    /// Response header carrying the quota usage percentage
    pub usage_header: String,
    /// Time to establish a TCP connection
    pub connect_timeout: Duration,
    /// Overall time for one request
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            probe_path: DEFAULT_PROBE_PATH.to_string(),
            usage_header: USAGE_HEADER.to_string(),
            connect_timeout: Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl ApiConfig {
    /// Use a different base URL (trailing slash is ignored)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Use a different probe resource
    pub fn with_probe_path(mut self, probe_path: impl Into<String>) -> Self {
        self.probe_path = probe_path.into();
        self
    }

    /// Use a different request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Full URL of the probe resource
    pub fn probe_url(&self) -> String {
        format!("{}{}", self.base_url, self.probe_path)
    }

    /// Build an HTTP client with this configuration's timeouts
    pub fn build_client(&self) -> FetcherResult<Client> {
        Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .build()
            .map_err(|e| FetcherError::ConfigError(format!("failed to build HTTP client: {e}")))
    }
}
