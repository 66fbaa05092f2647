//! Batch download orchestration and rate limiting
//!
//! This module provides the engine that fetches one sub-resource for every
//! identifier of a batch while staying inside the server's read quota.
//!
//! # Overview
//!
//! 1. **Job Creation**: Define what to fetch using [`job::BatchJob`]
//! 2. **Execution**: Run the job with [`executor::BatchExecutor`]
//! 3. **Rate Limiting**: Chunk sizes follow [`rate_limit::RateBudget`], recomputed
//!    from the usage signal of every response
//! 4. **Windows**: When the budget runs out the executor sleeps until the next
//!    boundary reported by [`window::WindowClock`]
//! 5. **Restartability**: Persisted artifacts are skipped, so re-running a batch
//!    only fetches what is missing
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use strava_archive::downloader::{BatchExecutor, BatchJob};
//! use strava_archive::endpoint::Endpoint;
//! use strava_archive::fetcher::{ApiClient, ApiConfig, Credential};
//! use strava_archive::output::ArtifactStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ApiConfig::default();
//! let descriptor = Endpoint::ActivityLaps.descriptor(config.base_url.clone());
//! let api = Arc::new(ApiClient::new(config, Credential::new("token"))?);
//!
//! let executor = BatchExecutor::new(api, ArtifactStore::new("./data"));
//! let report = executor.execute(&BatchJob::new(descriptor, [1, 2, 3])).await?;
//! println!("fetched {} items", report.fetched.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! Per-item failures never abort a batch; they are collected as
//! [`job::ItemOutcome::Failed`]. Only the conditions in [`DownloadError`] stop
//! a run, and an in-flight chunk always settles first.

pub mod config;
pub mod executor;
pub mod job;
pub mod progress;
pub mod rate_limit;
pub mod window;

pub use config::BatchConfig;
pub use executor::BatchExecutor;
pub use job::{BatchJob, BatchReport, ItemFailure, ItemOutcome, JobStatus};
pub use rate_limit::{RateBudget, SharedBudget};
pub use window::{WindowClock, WindowSchedule};

use crate::fetcher::FetcherError;

/// Errors that stop a batch run
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// The server answered 429: the local budget no longer matches its counter
    #[error("rate limit exceeded (HTTP 429), halting batch")]
    RateLimitExceeded,

    /// The configured ceiling of window waits was reached
    #[error("rate budget still exhausted after {cycles} window waits, {remaining} identifiers left")]
    BudgetExhausted {
        /// Window waits performed
        cycles: u32,
        /// Identifiers never dispatched
        remaining: usize,
    },

    /// Shutdown was requested
    #[error("batch cancelled by shutdown request")]
    Cancelled,

    /// Invalid batch settings
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Fetcher error outside of any single item
    #[error("fetcher error: {0}")]
    FetcherError(FetcherError),
}

impl From<FetcherError> for DownloadError {
    fn from(e: FetcherError) -> Self {
        match e {
            FetcherError::RateLimitExceeded => DownloadError::RateLimitExceeded,
            other => DownloadError::FetcherError(other),
        }
    }
}

impl DownloadError {
    /// Final coordinator state for a run stopped by this error
    pub fn terminal_status(&self) -> JobStatus {
        match self {
            DownloadError::Cancelled => JobStatus::Cancelled,
            _ => JobStatus::Failed,
        }
    }
}
