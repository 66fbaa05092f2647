//! Progress accounting for long-running batches.
//!
//! A batch that spans several rate-limit windows can run for hours. This
//! module keeps the counters used to report how far a batch has come, how
//! fast items are being processed and roughly how long is left.

use std::time::{Duration, Instant};

/// Progress state of one batch run.
#[derive(Debug, Clone)]
pub struct ProgressState {
    /// Identifiers that reached an outcome so far.
    pub items_processed: u64,
    /// Identifiers in the batch.
    pub total_expected: u64,
    /// Chunks dispatched so far.
    pub chunks_dispatched: u32,
    /// Timestamp when the batch started.
    pub start_time: Instant,
    /// Items per second, including time spent waiting for windows.
    pub current_rate: f64,
    /// Label for logs.
    pub label: String,
}

impl ProgressState {
    /// Start tracking a batch of `total_expected` identifiers.
    pub fn new(label: impl Into<String>, total_expected: u64) -> Self {
        Self {
            items_processed: 0,
            total_expected,
            chunks_dispatched: 0,
            start_time: Instant::now(),
            current_rate: 0.0,
            label: label.into(),
        }
    }

    /// Account for a settled chunk of `items` identifiers.
    pub fn record_chunk(&mut self, items: u64) {
        self.items_processed = self.items_processed.saturating_add(items);
        self.chunks_dispatched += 1;
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.current_rate = self.items_processed as f64 / elapsed;
        }
    }

    /// Completion percentage (0-100).
    pub fn percentage(&self) -> f64 {
        if self.total_expected == 0 {
            return 100.0;
        }
        (self.items_processed as f64 / self.total_expected as f64) * 100.0
    }

    /// Identifiers not yet dispatched.
    pub fn pending(&self) -> u64 {
        self.total_expected.saturating_sub(self.items_processed)
    }

    /// Estimate remaining time from the observed rate.
    pub fn estimate_remaining(&self) -> Option<Duration> {
        let pending = self.pending();
        if pending == 0 || self.current_rate <= 0.0 {
            return None;
        }
        Some(Duration::from_secs_f64(pending as f64 / self.current_rate))
    }

    /// Human-readable progress string for logging.
    pub fn format_progress(&self) -> String {
        let mut parts = vec![format!(
            "[PROGRESS] {} {}/{} items",
            self.label, self.items_processed, self.total_expected
        )];
        parts.push(format!("- {:.1}% complete", self.percentage()));
        parts.push(format!("({} chunks)", self.chunks_dispatched));

        if let Some(remaining) = self.estimate_remaining() {
            parts.push(format!("- ~{} remaining", format_duration(remaining)));
        }

        parts.join(" ")
    }
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else {
        format!("{:.1}h", secs as f64 / 3600.0)
    }
}
