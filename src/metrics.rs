//! Observability metrics
//!
//! Request outcomes, 429s, the session's rate budget and per-batch results are
//! recorded through the `metrics` facade. Without an installed recorder every
//! call is a no-op, so library users and tests pay nothing unless the binary
//! starts the Prometheus exporter.

use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::Lazy;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Global metrics registry initialization flag
static METRICS_INITIALIZED: Lazy<RwLock<bool>> = Lazy::new(|| RwLock::new(false));

/// Correlation ID generator for request tracing
static CORRELATION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Initialize metrics system with Prometheus exporter
///
/// Idempotent: a second call is a no-op.
///
/// # Arguments
/// * `addr` - Socket address to bind Prometheus scrape endpoint (e.g., "0.0.0.0:9090")
pub async fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    let mut initialized = METRICS_INITIALIZED.write().await;
    if *initialized {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    info!("Initializing metrics system on {}", addr);

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        "http_requests_total",
        Unit::Count,
        "Total number of HTTP requests made to the API"
    );
    describe_counter!(
        "http_429_errors_total",
        Unit::Count,
        "Total number of 429 rate limit errors received"
    );
    describe_histogram!(
        "http_request_duration_seconds",
        Unit::Seconds,
        "HTTP request duration in seconds"
    );
    describe_gauge!(
        "rate_budget_remaining",
        Unit::Count,
        "Requests remaining in the current rate-limit window"
    );
    describe_counter!(
        "items_processed_total",
        Unit::Count,
        "Items processed, labelled by endpoint and outcome"
    );
    describe_counter!(
        "rate_limit_windows_waited_total",
        Unit::Count,
        "Number of rate-limit windows waited for"
    );
    describe_counter!(
        "batches_completed_total",
        Unit::Count,
        "Total number of batches that reached DONE"
    );
    describe_counter!(
        "batches_failed_total",
        Unit::Count,
        "Total number of batches stopped on an error"
    );

    *initialized = true;
    info!("Metrics system initialized successfully on {}", addr);
    Ok(())
}

/// Generate a new correlation ID for request tracing
pub fn generate_correlation_id() -> String {
    let id = CORRELATION_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    format!("req-{id:08x}")
}

/// Timing and outcome of one HTTP request
pub struct HttpRequestMetrics {
    endpoint: String,
    start_time: Instant,
    correlation_id: String,
}

impl HttpRequestMetrics {
    /// Start recording a new HTTP request
    pub fn start(endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        let correlation_id = generate_correlation_id();

        debug!(
            correlation_id = %correlation_id,
            endpoint = %endpoint,
            "Starting HTTP request metrics"
        );

        Self {
            endpoint,
            start_time: Instant::now(),
            correlation_id,
        }
    }

    /// Record completion of the HTTP request
    pub fn record_complete(&self, status_code: u16) {
        let duration = self.start_time.elapsed();

        counter!(
            "http_requests_total",
            "endpoint" => self.endpoint.clone(),
            "status" => status_code.to_string(),
        )
        .increment(1);

        histogram!(
            "http_request_duration_seconds",
            "endpoint" => self.endpoint.clone(),
        )
        .record(duration.as_secs_f64());

        if status_code == 429 {
            counter!(
                "http_429_errors_total",
                "endpoint" => self.endpoint.clone(),
            )
            .increment(1);

            warn!(
                correlation_id = %self.correlation_id,
                endpoint = %self.endpoint,
                duration_ms = duration.as_millis(),
                "Rate limit error (429) recorded"
            );
        }

        debug!(
            correlation_id = %self.correlation_id,
            endpoint = %self.endpoint,
            status = status_code,
            duration_ms = duration.as_millis(),
            "HTTP request completed"
        );
    }

    /// Record a network error (no status code)
    pub fn record_network_error(&self) {
        let duration = self.start_time.elapsed();

        counter!(
            "http_requests_total",
            "endpoint" => self.endpoint.clone(),
            "status" => "network_error",
        )
        .increment(1);

        warn!(
            correlation_id = %self.correlation_id,
            endpoint = %self.endpoint,
            duration_ms = duration.as_millis(),
            "Network error recorded"
        );
    }

    /// Get the correlation ID for this request
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }
}

/// Record the budget last reported by the server
pub fn record_rate_budget(remaining: u32) {
    gauge!("rate_budget_remaining").set(f64::from(remaining));
}

/// Record one item outcome
pub fn record_item_outcome(endpoint: &str, outcome: &'static str) {
    counter!(
        "items_processed_total",
        "endpoint" => endpoint.to_string(),
        "outcome" => outcome,
    )
    .increment(1);
}

/// Record a window wait
pub fn record_window_wait(wait_secs: u64) {
    counter!("rate_limit_windows_waited_total").increment(1);
    debug!(wait_secs = wait_secs, "Window wait recorded");
}

/// Per-batch metrics
pub struct BatchMetrics {
    endpoint: String,
    start_time: Instant,
}

impl BatchMetrics {
    /// Start tracking a batch
    pub fn start(endpoint: impl Into<String>, total: usize) -> Self {
        let endpoint = endpoint.into();

        info!(endpoint = %endpoint, total = total, "Batch started");

        Self {
            endpoint,
            start_time: Instant::now(),
        }
    }

    /// Record a batch that reached DONE
    pub fn record_success(&self, fetched: usize, skipped: usize, failed: usize) {
        let duration = self.start_time.elapsed();

        counter!(
            "batches_completed_total",
            "endpoint" => self.endpoint.clone(),
        )
        .increment(1);

        info!(
            endpoint = %self.endpoint,
            fetched = fetched,
            skipped = skipped,
            failed = failed,
            duration_secs = duration.as_secs_f64(),
            "Batch completed"
        );
    }

    /// Record a batch stopped on an error
    pub fn record_failure(&self, error: &str) {
        let duration = self.start_time.elapsed();

        counter!(
            "batches_failed_total",
            "endpoint" => self.endpoint.clone(),
        )
        .increment(1);

        error!(
            endpoint = %self.endpoint,
            error = %error,
            duration_secs = duration.as_secs_f64(),
            "Batch failed"
        );
    }
}
