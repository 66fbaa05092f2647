//! Authenticated HTTP session for the remote API
//!
//! [`ApiClient`] is the explicit session value: one HTTP connection pool, one
//! bearer credential and the session's [`SharedBudget`]. It is built once and
//! passed by reference to everything that talks to the API.

use reqwest::header::{HeaderMap, ACCEPT};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::{ApiConfig, FetcherError, FetcherResult};
use crate::downloader::rate_limit::{RateBudget, SharedBudget};
use crate::metrics::{record_rate_budget, HttpRequestMetrics};

/// Opaque bearer token
///
/// Never printed: `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a bearer token
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token for the `Authorization` header
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether the token is blank
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Authenticated API session
pub struct ApiClient {
    client: Arc<Client>,
    config: ApiConfig,
    credential: Credential,
    budget: SharedBudget,
}

impl ApiClient {
    /// Create a session with a fresh HTTP client and an unknown budget
    pub fn new(config: ApiConfig, credential: Credential) -> FetcherResult<Self> {
        let client = Arc::new(config.build_client()?);
        Ok(Self::with_client(client, config, credential))
    }

    /// Create a session on top of an existing HTTP client
    ///
    /// # Arguments
    /// * `client` - Shared HTTP client (Arc for cheap cloning)
    /// * `config` - Base URL, probe resource, usage header
    /// * `credential` - Bearer token attached to every request
    pub fn with_client(client: Arc<Client>, config: ApiConfig, credential: Credential) -> Self {
        Self {
            client,
            config,
            credential,
            budget: SharedBudget::new(),
        }
    }

    /// Connection settings
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Session-wide rate budget
    pub fn budget(&self) -> &SharedBudget {
        &self.budget
    }

    /// GET `url` and decode the JSON body
    ///
    /// On HTTP 200 the usage header refreshes the shared budget. HTTP 429 is
    /// reported as [`FetcherError::RateLimitExceeded`]; any other status as
    /// [`FetcherError::HttpStatus`].
    pub async fn get_json(&self, url: &str, label: &str) -> FetcherResult<Value> {
        let metrics = HttpRequestMetrics::start(label);
        debug!(url = url, endpoint = label, "Sending request");

        let response = match self.send(url).await {
            Ok(response) => response,
            Err(e) => {
                metrics.record_network_error();
                return Err(e);
            }
        };

        let status = response.status();
        metrics.record_complete(status.as_u16());

        if status == StatusCode::TOO_MANY_REQUESTS {
            error!(url = url, endpoint = label, "Rate limit exceeded (429)");
            return Err(FetcherError::RateLimitExceeded);
        }

        if status != StatusCode::OK {
            return Err(FetcherError::HttpStatus {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let usage = self.parse_usage_header(response.headers());
        let budget = self.budget.observe_usage(usage.as_deref());
        record_rate_budget(budget.remaining());

        response
            .json::<Value>()
            .await
            .map_err(|e| FetcherError::ParseError(format!("Failed to deserialize response: {e}")))
    }

    /// Refresh the shared budget from a live usage signal
    ///
    /// The probe's response always overwrites the budget, whatever its status;
    /// a response without the header leaves the session with no budget.
    pub async fn probe(&self) -> FetcherResult<RateBudget> {
        let url = self.config.probe_url();
        info!("Sending request to refresh rate limit usage");

        let metrics = HttpRequestMetrics::start("probe");
        let response = match self.send(&url).await {
            Ok(response) => response,
            Err(e) => {
                metrics.record_network_error();
                return Err(e);
            }
        };

        let status = response.status();
        metrics.record_complete(status.as_u16());

        if status == StatusCode::TOO_MANY_REQUESTS {
            error!(url = %url, "Rate limit exceeded (429) on usage probe");
            return Err(FetcherError::RateLimitExceeded);
        }

        let usage = self.parse_usage_header(response.headers());
        let budget = self.budget.observe_usage(usage.as_deref());
        record_rate_budget(budget.remaining());

        if status != StatusCode::OK {
            warn!(
                status = status.as_u16(),
                reason = status.canonical_reason().unwrap_or("Unknown"),
                "Failed to fetch rate limit usage"
            );
        }

        Ok(budget)
    }

    async fn send(&self, url: &str) -> FetcherResult<reqwest::Response> {
        self.client
            .get(url)
            .bearer_auth(self.credential.expose())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| FetcherError::NetworkError(e.to_string()))
    }

    /// Extract the usage signal from response headers
    ///
    /// Returns the raw header value; parsing is left to [`RateBudget`].
    pub fn parse_usage_header(&self, headers: &HeaderMap) -> Option<String> {
        let raw = headers.get(self.config.usage_header.as_str())?;
        match raw.to_str() {
            Ok(value) => Some(value.to_string()),
            Err(e) => {
                warn!(error = %e, "Usage header is not valid text");
                None
            }
        }
    }
}
