//! Reputation repository port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{OutcomeEntry, RecordedOutcome, ReputationRecord};

/// Durable store of per-worker reputation.
#[async_trait]
pub trait ReputationRepository: Send + Sync {
    /// Fold one outcome into the worker's record and append it to the
    /// history, as a single atomic read-modify-write per worker.
    ///
    /// Creates the record from the neutral prior when the worker is new.
    async fn apply_outcome(
        &self,
        outcome: &RecordedOutcome,
        alpha: f64,
    ) -> DomainResult<ReputationRecord>;

    /// Get the current record for a worker.
    async fn get(&self, worker_id: &str) -> DomainResult<Option<ReputationRecord>>;

    /// List all records, ordered by worker id.
    async fn list(&self) -> DomainResult<Vec<ReputationRecord>>;

    /// Outcome history for a worker, newest first.
    async fn history(&self, worker_id: &str, limit: u32) -> DomainResult<Vec<OutcomeEntry>>;
}
