//! # Strava Archive Library
//!
//! Rate-limit-aware batch fetching of per-item API sub-resources into a local,
//! write-once JSON archive. Given a set of identifiers (activities, routes,
//! clubs) and one endpoint, the engine fetches the endpoint for every
//! identifier without exceeding the server's windowed read quota.
//!
//! ## Features
//!
//! - **Server-Driven Budget**: Chunk sizes follow the usage percentage reported
//!   on every response, never a local counter
//! - **Window Waits**: An exhausted budget suspends the batch until the next
//!   wall-clock window boundary
//! - **Restartable**: Existing artifacts are skipped without a request, so
//!   re-running a batch only fetches what is missing
//! - **Atomic Writes**: Artifacts are written to a temp file and linked into place
//! - **Fail-Fast on 429**: A rate-limit response halts the batch instead of guessing
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use strava_archive::downloader::{BatchExecutor, BatchJob};
//! use strava_archive::fetcher::{ApiClient, ApiConfig, Credential};
//! use strava_archive::output::ArtifactStore;
//! use strava_archive::Endpoint;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ApiConfig::default();
//! let descriptor = Endpoint::ActivityZones.descriptor(config.base_url.clone());
//! let api = Arc::new(ApiClient::new(config, Credential::new("token"))?);
//!
//! let executor = BatchExecutor::new(api, ArtifactStore::new("./data"));
//! let report = executor
//!     .execute(&BatchJob::new(descriptor, [101, 102, 103]))
//!     .await?;
//! println!("{} fetched, {} skipped", report.fetched.len(), report.skipped.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`endpoint`] - Closed registry of fetchable sub-resources
//! - [`fetcher`] - Authenticated API session and usage probe
//! - [`downloader`] - Budget tracking, window clock and the batch coordinator
//! - [`output`] - Write-once artifact storage
//! - [`shutdown`] - Cooperative cancellation
//! - [`metrics`] - Prometheus metrics

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::{Deserialize, Serialize};

/// CLI command implementations
pub mod cli;

/// Batch orchestration
pub mod downloader;

/// Endpoint registry
pub mod endpoint;

/// Remote API access
pub mod fetcher;

/// Metrics and observability
pub mod metrics;

/// Artifact storage
pub mod output;

/// Graceful shutdown coordination shared across modules
pub mod shutdown;

pub use endpoint::{Category, Endpoint, EndpointDescriptor, EndpointError};

/// Integer key of one remote resource instance (one activity, route or club)
pub type ItemId = u64;

/// The persisted JSON result of one successful fetch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// Identifier the artifact was fetched for
    pub id: ItemId,
    /// Endpoint that produced it
    pub endpoint: Endpoint,
    /// Storage category (subdirectory)
    pub category: Category,
    /// File name inside the category directory
    pub name: String,
    /// Response body as returned by the server
    pub body: serde_json::Value,
}

impl Artifact {
    /// Path of the artifact relative to the storage root
    pub fn relative_path(&self) -> std::path::PathBuf {
        std::path::Path::new(self.category.dir_name()).join(&self.name)
    }
}
