//! Reputation ledger service.
//!
//! Updates for the same worker are serialized through a per-worker async
//! lock; different workers proceed independently. A worker's lock entry is
//! dropped from the map once no update holds or awaits it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::Mutex;
use tracing::{info, instrument};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    OutcomeEntry, OutcomeScore, RecordedOutcome, ReputationRecord, SupervisionLevel, WorkerStats,
    EMA_ALPHA, NEUTRAL_REPUTATION,
};
use crate::domain::ports::ReputationRepository;

/// Result of a stats query: one worker, or everyone.
#[derive(Debug, Clone, PartialEq)]
pub enum StatsReport {
    Worker(Option<WorkerStats>),
    All(Vec<WorkerStats>),
}

type LockMap = StdMutex<HashMap<String, Arc<Mutex<()>>>>;

pub struct ReputationLedger<R: ReputationRepository> {
    repository: Arc<R>,
    alpha: f64,
    locks: LockMap,
}

impl<R: ReputationRepository> ReputationLedger<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self::with_alpha(repository, EMA_ALPHA)
    }

    pub fn with_alpha(repository: Arc<R>, alpha: f64) -> Self {
        Self {
            repository,
            alpha,
            locks: StdMutex::new(HashMap::new()),
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Fold a score into the worker's reputation.
    pub async fn record_outcome(&self, worker_id: &str, score: OutcomeScore) -> DomainResult<ReputationRecord> {
        self.record(RecordedOutcome::new(worker_id, score)).await
    }

    /// Fold a score with task metadata into the worker's reputation and history.
    #[instrument(skip(self, outcome), fields(worker_id = %outcome.worker_id, score = outcome.score))]
    pub async fn record(&self, outcome: RecordedOutcome) -> DomainResult<ReputationRecord> {
        if outcome.worker_id.trim().is_empty() {
            return Err(DomainError::ValidationFailed("worker id must not be empty".to_string()));
        }
        if !outcome.score.is_finite() {
            return Err(DomainError::ValidationFailed(format!(
                "score must be finite, got {}",
                outcome.score
            )));
        }

        // Declared first so it drops last, after our clone of the lock.
        let _prune = PruneOnDrop {
            locks: &self.locks,
            worker_id: &outcome.worker_id,
        };
        let key_lock = self.lock_for(&outcome.worker_id)?;
        let _guard = key_lock.lock().await;

        let record = self.repository.apply_outcome(&outcome, self.alpha).await?;
        info!(
            reputation = record.reputation,
            outcome_count = record.outcome_count,
            supervision_level = %record.supervision_level(),
            "reputation updated"
        );
        Ok(record)
    }

    pub async fn get_stats(&self, worker_id: Option<&str>) -> DomainResult<StatsReport> {
        match worker_id {
            Some(id) => Ok(StatsReport::Worker(
                self.repository.get(id).await?.map(WorkerStats::from),
            )),
            None => Ok(StatsReport::All(
                self.repository
                    .list()
                    .await?
                    .into_iter()
                    .map(WorkerStats::from)
                    .collect(),
            )),
        }
    }

    /// Current supervision level, using the neutral prior for unknown workers.
    pub async fn supervision_level(&self, worker_id: &str) -> DomainResult<SupervisionLevel> {
        let reputation = self
            .repository
            .get(worker_id)
            .await?
            .map_or(NEUTRAL_REPUTATION, |r| r.reputation);
        Ok(SupervisionLevel::for_reputation(reputation))
    }

    pub async fn history(&self, worker_id: &str, limit: u32) -> DomainResult<Vec<OutcomeEntry>> {
        self.repository.history(worker_id, limit).await
    }

    fn lock_for(&self, worker_id: &str) -> DomainResult<Arc<Mutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| DomainError::Storage("ledger lock map poisoned".to_string()))?;
        Ok(locks
            .entry(worker_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone())
    }
}

/// Removes a worker's lock entry on drop when the map holds the only handle.
///
/// Handles are only cloned under the map lock, so a count of one there means
/// no other update is waiting on the entry.
struct PruneOnDrop<'a> {
    locks: &'a LockMap,
    worker_id: &'a str,
}

impl Drop for PruneOnDrop<'_> {
    fn drop(&mut self) {
        let Ok(mut locks) = self.locks.lock() else {
            return;
        };
        if locks
            .get(self.worker_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(self.worker_id);
        }
    }
}
