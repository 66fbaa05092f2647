//! Batch job structures, item outcomes and status tracking

use crate::endpoint::EndpointDescriptor;
use crate::{Artifact, ItemId};
use serde::Serialize;
use std::collections::HashSet;
use std::time::Duration;

/// One batch: a deduplicated identifier set and the endpoint to fetch for each
#[derive(Debug, Clone)]
pub struct BatchJob {
    descriptor: EndpointDescriptor,
    ids: Vec<ItemId>,
}

impl BatchJob {
    /// Create a job; duplicate identifiers are dropped, keeping first occurrence
    pub fn new(descriptor: EndpointDescriptor, ids: impl IntoIterator<Item = ItemId>) -> Self {
        let mut seen = HashSet::new();
        let ids = ids.into_iter().filter(|id| seen.insert(*id)).collect();
        Self { descriptor, ids }
    }

    /// Endpoint descriptor shared by every unit of the batch
    pub fn descriptor(&self) -> &EndpointDescriptor {
        &self.descriptor
    }

    /// Identifiers in dispatch order
    pub fn ids(&self) -> &[ItemId] {
        &self.ids
    }

    /// Number of identifiers
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether there is nothing to fetch
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Coordinator state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Not started
    #[default]
    Init,
    /// A chunk is in flight
    Dispatching,
    /// Budget exhausted, sleeping until the next window
    WaitingForWindow,
    /// Every identifier was dispatched
    Done,
    /// Stopped on a fatal error
    Failed,
    /// Stopped on a shutdown request
    Cancelled,
}

/// Result of processing one identifier
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    /// Fetched and persisted
    Fetched(Artifact),
    /// Artifact already existed; nothing was requested
    Skipped,
    /// Request or persistence failed; nothing was written
    Failed {
        /// Status line or error text
        reason: String,
    },
}

impl ItemOutcome {
    /// Short label for logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            ItemOutcome::Fetched(_) => "fetched",
            ItemOutcome::Skipped => "skipped",
            ItemOutcome::Failed { .. } => "failed",
        }
    }
}

/// A failed identifier and why it failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    /// Identifier
    pub id: ItemId,
    /// Status line or error text
    pub reason: String,
}

/// Summary of a batch run
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// Endpoint registry key
    pub endpoint: String,
    /// Final coordinator state
    pub status: JobStatus,
    /// Identifiers in the batch
    pub total: usize,
    /// Identifiers fetched and persisted
    pub fetched: Vec<ItemId>,
    /// Identifiers whose artifact already existed
    pub skipped: Vec<ItemId>,
    /// Identifiers that failed
    pub failed: Vec<ItemFailure>,
    /// Non-empty chunks in dispatch order
    pub chunks: Vec<Vec<ItemId>>,
    /// Number of rate-limit windows waited
    pub windows_waited: u32,
    /// Wall-clock duration of the run
    #[serde(serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

impl BatchReport {
    /// Empty report for `endpoint` with `total` identifiers
    pub fn new(endpoint: impl Into<String>, total: usize) -> Self {
        Self {
            endpoint: endpoint.into(),
            total,
            ..Self::default()
        }
    }

    /// Record a unit's outcome
    pub fn record(&mut self, id: ItemId, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::Fetched(_) => self.fetched.push(id),
            ItemOutcome::Skipped => self.skipped.push(id),
            ItemOutcome::Failed { reason } => self.failed.push(ItemFailure {
                id,
                reason: reason.clone(),
            }),
        }
    }

    /// Identifiers that reached any outcome
    pub fn processed(&self) -> usize {
        self.fetched.len() + self.skipped.len() + self.failed.len()
    }

    /// All dispatched identifiers, chunk by chunk
    pub fn dispatched(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.chunks.iter().flatten().copied()
    }
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}
