//! Batch executor: single-item fetch/persist unit and the chunked coordinator

use crate::downloader::config::BatchConfig;
use crate::downloader::progress::ProgressState;
use crate::downloader::window::{WindowClock, WindowSchedule};
use crate::downloader::{
    BatchJob, BatchReport, DownloadError, ItemFailure, ItemOutcome, JobStatus, RateBudget,
};
use crate::endpoint::EndpointDescriptor;
use crate::fetcher::{ApiClient, FetcherError};
use crate::metrics::{record_item_outcome, record_window_wait, BatchMetrics};
use crate::output::{ArtifactStore, OutputError};
use crate::shutdown::SharedShutdown;
use crate::{Artifact, ItemId};
use futures::future::join_all;
use indicatif::ProgressBar;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn, Instrument};

/// Runs batches against one API session and one artifact store
pub struct BatchExecutor {
    api: Arc<ApiClient>,
    store: ArtifactStore,
    config: BatchConfig,
    schedule: Option<Arc<dyn WindowSchedule>>,
    shutdown: Option<SharedShutdown>,
    progress_bar: Option<ProgressBar>,
}

impl BatchExecutor {
    /// Create an executor with default settings
    ///
    /// Window waits follow the wall clock, aligned to the configured window
    /// length, unless a schedule is supplied with [`Self::with_schedule`].
    pub fn new(api: Arc<ApiClient>, store: ArtifactStore) -> Self {
        Self {
            api,
            store,
            config: BatchConfig::default(),
            schedule: None,
            shutdown: None,
            progress_bar: None,
        }
    }

    /// Use different batch settings
    pub fn with_config(mut self, config: BatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the wall-clock window schedule
    pub fn with_schedule(mut self, schedule: Arc<dyn WindowSchedule>) -> Self {
        self.schedule = Some(schedule);
        self
    }

    /// Attach a shared shutdown handle for graceful cancellation.
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Report item progress on a terminal progress bar
    pub fn with_progress_bar(mut self, progress_bar: ProgressBar) -> Self {
        self.progress_bar = Some(progress_bar);
        self
    }

    /// Batch settings in effect
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Fetch and persist one identifier
    ///
    /// Returns [`ItemOutcome::Skipped`] without any request when the artifact
    /// already exists. Non-200 statuses and transport failures become
    /// [`ItemOutcome::Failed`]; only HTTP 429 is returned as an error.
    pub async fn process_item(
        &self,
        id: ItemId,
        descriptor: &EndpointDescriptor,
    ) -> Result<ItemOutcome, DownloadError> {
        let endpoint = descriptor.endpoint();
        let category = descriptor.category();
        let artifact_name = descriptor.artifact_name_of(id);

        if self.store.exists(category, &artifact_name).await {
            info!(id = id, endpoint = endpoint.label(), "Skipping, already fetched");
            record_item_outcome(endpoint.key(), "skipped");
            return Ok(ItemOutcome::Skipped);
        }

        let url = descriptor.url_of(id);
        debug!(id = id, endpoint = endpoint.label(), url = %url, "Requesting item");

        let body = match self.api.get_json(&url, endpoint.key()).await {
            Ok(body) => body,
            Err(e) if e.is_fatal() => {
                record_item_outcome(endpoint.key(), "rate_limited");
                return Err(e.into());
            }
            Err(e) => {
                warn!(
                    id = id,
                    endpoint = endpoint.label(),
                    category = %category,
                    reason = %e,
                    "Failed to fetch item"
                );
                record_item_outcome(endpoint.key(), "failed");
                return Ok(ItemOutcome::Failed {
                    reason: describe_fetch_error(&e),
                });
            }
        };

        let outcome = match self.store.save(category, &artifact_name, &body).await {
            Ok(_) => ItemOutcome::Fetched(Artifact {
                id,
                endpoint,
                category,
                name: artifact_name,
                body,
            }),
            Err(OutputError::AlreadyExists(path)) => {
                info!(
                    id = id,
                    path = %path.display(),
                    "Artifact appeared while fetching, keeping existing file"
                );
                ItemOutcome::Skipped
            }
            Err(e) => {
                warn!(
                    id = id,
                    endpoint = endpoint.label(),
                    category = %category,
                    reason = %e,
                    "Failed to persist item"
                );
                ItemOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        record_item_outcome(endpoint.key(), outcome.label());
        Ok(outcome)
    }

    /// Run a whole batch
    ///
    /// Dispatches chunks sized by the current rate budget, waiting for the
    /// next window whenever the budget is smaller than what is left. Items
    /// that fail are listed in the report; the run itself only fails on HTTP
    /// 429, an exhausted window ceiling or a shutdown request.
    pub async fn execute(&self, job: &BatchJob) -> Result<BatchReport, DownloadError> {
        let endpoint = job.descriptor().endpoint();
        let span = tracing::info_span!(
            "execute_batch",
            endpoint = endpoint.key(),
            total = job.len()
        );

        async {
            self.config
                .validate()
                .map_err(DownloadError::ValidationError)?;

            info!(label = endpoint.label(), "Starting batch");
            let batch_metrics = BatchMetrics::start(endpoint.key(), job.len());
            let started = Instant::now();

            let mut report = BatchReport::new(endpoint.key(), job.len());
            let result = self.run(job, &mut report).await;
            report.elapsed = started.elapsed();

            match &result {
                Ok(()) => {
                    report.status = JobStatus::Done;
                    batch_metrics.record_success(
                        report.fetched.len(),
                        report.skipped.len(),
                        report.failed.len(),
                    );
                }
                Err(e) => {
                    report.status = e.terminal_status();
                    batch_metrics.record_failure(&e.to_string());
                }
            }

            if let Some(pb) = &self.progress_bar {
                pb.finish_and_clear();
            }

            info!(
                status = ?report.status,
                processed = report.processed(),
                elapsed_secs = report.elapsed.as_secs_f64(),
                fetched = report.fetched.len(),
                skipped = report.skipped.len(),
                failed = report.failed.len(),
                chunks = report.chunks.len(),
                windows_waited = report.windows_waited,
                "Batch finished"
            );

            result.map(|()| report)
        }
        .instrument(span)
        .await
    }

    async fn run(&self, job: &BatchJob, report: &mut BatchReport) -> Result<(), DownloadError> {
        let descriptor = job.descriptor();
        if let Some(pb) = &self.progress_bar {
            pb.set_length(job.len() as u64);
        }

        let pending = self.pending_ids(job, report).await;
        let mut remaining: &[ItemId] = &pending;
        let mut progress = ProgressState::new(descriptor.endpoint().label(), pending.len() as u64);

        if remaining.is_empty() {
            info!(skipped = report.skipped.len(), "Nothing left to fetch");
            return Ok(());
        }

        if !self.api.budget().is_known() {
            self.refresh_budget().await?;
        }

        loop {
            if self.shutdown_requested() {
                info!(remaining = remaining.len(), "Shutdown requested, stopping batch");
                return Err(DownloadError::Cancelled);
            }

            report.status = JobStatus::Dispatching;
            let budget = self.api.budget().snapshot().remaining() as usize;
            let (chunk, rest) = remaining.split_at(remaining.len().min(budget));

            if !chunk.is_empty() {
                self.dispatch_chunk(chunk, descriptor, report, &mut progress)
                    .await?;
            }
            remaining = rest;

            if remaining.is_empty() {
                return Ok(());
            }

            if let Some(max_cycles) = self.config.max_window_cycles {
                if report.windows_waited >= max_cycles {
                    return Err(DownloadError::BudgetExhausted {
                        cycles: report.windows_waited,
                        remaining: remaining.len(),
                    });
                }
            }

            report.status = JobStatus::WaitingForWindow;
            self.wait_for_window(remaining.len()).await?;
            report.windows_waited += 1;
            self.refresh_budget().await?;
        }
    }

    /// Identifiers whose artifact is still missing, in job order
    ///
    /// Persisted ones are recorded as skipped up front so a fully archived
    /// batch needs no request at all, not even a budget probe.
    async fn pending_ids(&self, job: &BatchJob, report: &mut BatchReport) -> Vec<ItemId> {
        let descriptor = job.descriptor();
        let endpoint = descriptor.endpoint();
        let mut pending = Vec::with_capacity(job.len());

        for &id in job.ids() {
            let artifact_name = descriptor.artifact_name_of(id);
            if self.store.exists(descriptor.category(), &artifact_name).await {
                report.record(id, &ItemOutcome::Skipped);
                record_item_outcome(endpoint.key(), "skipped");
                if let Some(pb) = &self.progress_bar {
                    pb.inc(1);
                }
            } else {
                pending.push(id);
            }
        }

        if !report.skipped.is_empty() {
            info!(
                skipped = report.skipped.len(),
                pending = pending.len(),
                "Skipping identifiers already archived"
            );
        }
        pending
    }

    /// Fan out one chunk and wait for every unit, even after a 429
    async fn dispatch_chunk(
        &self,
        chunk: &[ItemId],
        descriptor: &EndpointDescriptor,
        report: &mut BatchReport,
        progress: &mut ProgressState,
    ) -> Result<(), DownloadError> {
        info!(
            chunk = report.chunks.len() + 1,
            size = chunk.len(),
            first_id = chunk[0],
            "Dispatching chunk"
        );
        let started = Instant::now();
        report.chunks.push(chunk.to_vec());

        let outcomes = join_all(chunk.iter().map(|&id| async move {
            let outcome = self.process_item(id, descriptor).await;
            if let Some(pb) = &self.progress_bar {
                pb.inc(1);
            }
            (id, outcome)
        }))
        .await;

        let mut fatal = None;
        for (id, outcome) in outcomes {
            match outcome {
                Ok(outcome) => report.record(id, &outcome),
                Err(e) => {
                    report.failed.push(ItemFailure {
                        id,
                        reason: e.to_string(),
                    });
                    fatal.get_or_insert(e);
                }
            }
        }

        progress.record_chunk(chunk.len() as u64);
        info!(
            size = chunk.len(),
            elapsed_secs = started.elapsed().as_secs_f64(),
            "Chunk completed"
        );
        info!("{}", progress.format_progress());

        match fatal {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn wait_for_window(&self, remaining: usize) -> Result<(), DownloadError> {
        let wait = match &self.schedule {
            Some(schedule) => schedule.until_next_window(),
            None => WindowClock::new(self.config.window_minutes).until_next_window(),
        };
        warn!(
            wait_minutes = wait.as_secs() / 60,
            wait_secs = wait.as_secs() % 60,
            remaining = remaining,
            "Rate limit budget exhausted, waiting for next window"
        );
        record_window_wait(wait.as_secs());
        if let Some(pb) = &self.progress_bar {
            pb.set_message(format!("waiting {}s for the next rate-limit window", wait.as_secs()));
        }

        if let Some(shutdown) = &self.shutdown {
            tokio::select! {
                _ = tokio::time::sleep(wait) => {},
                _ = shutdown.wait_for_shutdown() => {
                    info!(remaining = remaining, "Shutdown requested during window wait");
                    return Err(DownloadError::Cancelled);
                }
            }
        } else {
            tokio::time::sleep(wait).await;
        }

        if let Some(pb) = &self.progress_bar {
            pb.set_message(String::new());
        }
        Ok(())
    }

    /// Probe the API for a live usage signal
    ///
    /// A 429 is fatal. Any other probe failure leaves the session with no
    /// budget, which sends the coordinator into another window wait.
    async fn refresh_budget(&self) -> Result<RateBudget, DownloadError> {
        let budget = match self.api.probe().await {
            Ok(budget) => budget,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                warn!(error = %e, "Rate limit probe failed, assuming no budget");
                let budget = RateBudget::default();
                self.api.budget().observe(budget);
                budget
            }
        };
        info!(remaining = budget.remaining(), "Rate limit budget refreshed");
        Ok(budget)
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .map(|s| s.is_shutdown_requested())
            .unwrap_or(false)
    }
}

fn describe_fetch_error(e: &FetcherError) -> String {
    match e {
        FetcherError::HttpStatus { status, reason } => format!("{status} {reason}"),
        other => other.to_string(),
    }
}
