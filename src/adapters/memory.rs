//! In-memory reputation store for tests and ephemeral runs.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::errors::DomainResult;
use crate::domain::models::{OutcomeEntry, RecordedOutcome, ReputationRecord};
use crate::domain::ports::ReputationRepository;

#[derive(Default)]
struct State {
    records: BTreeMap<String, ReputationRecord>,
    history: HashMap<String, Vec<OutcomeEntry>>,
}

/// Reputation store backed by process memory. Nothing survives a restart.
#[derive(Default)]
pub struct InMemoryReputationRepository {
    state: Mutex<State>,
}

impl InMemoryReputationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReputationRepository for InMemoryReputationRepository {
    async fn apply_outcome(
        &self,
        outcome: &RecordedOutcome,
        alpha: f64,
    ) -> DomainResult<ReputationRecord> {
        let mut state = self.state.lock().await;

        let previous = state
            .records
            .get(&outcome.worker_id)
            .cloned()
            .unwrap_or_else(|| ReputationRecord::neutral(&outcome.worker_id, outcome.recorded_at));
        let updated = previous.apply(outcome.score, alpha, outcome.recorded_at);

        state
            .records
            .insert(updated.worker_id.clone(), updated.clone());
        state
            .history
            .entry(updated.worker_id.clone())
            .or_default()
            .push(OutcomeEntry::from_outcome(outcome, updated.reputation));

        Ok(updated)
    }

    async fn get(&self, worker_id: &str) -> DomainResult<Option<ReputationRecord>> {
        Ok(self.state.lock().await.records.get(worker_id).cloned())
    }

    async fn list(&self) -> DomainResult<Vec<ReputationRecord>> {
        Ok(self.state.lock().await.records.values().cloned().collect())
    }

    async fn history(&self, worker_id: &str, limit: u32) -> DomainResult<Vec<OutcomeEntry>> {
        let state = self.state.lock().await;
        Ok(state
            .history
            .get(worker_id)
            .map(|entries| {
                entries
                    .iter()
                    .rev()
                    .take(limit as usize)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{OutcomeScore, EMA_ALPHA};

    #[tokio::test]
    async fn applies_ema_from_neutral_prior() {
        let repo = InMemoryReputationRepository::new();
        let record = repo
            .apply_outcome(&RecordedOutcome::new("w", OutcomeScore::Hallucination), EMA_ALPHA)
            .await
            .unwrap();
        assert!((record.reputation + 0.3).abs() < 1e-12);
        assert_eq!(repo.get("w").await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn history_is_newest_first() {
        let repo = InMemoryReputationRepository::new();
        repo.apply_outcome(&RecordedOutcome::new("w", OutcomeScore::Verified), EMA_ALPHA)
            .await
            .unwrap();
        repo.apply_outcome(&RecordedOutcome::new("w", OutcomeScore::HonestFailure), EMA_ALPHA)
            .await
            .unwrap();

        let history = repo.history("w", 10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!((history[0].score - 0.0).abs() < f64::EPSILON);
        assert!((history[1].score - 1.0).abs() < f64::EPSILON);
        assert!(repo.history("other", 10).await.unwrap().is_empty());
    }
}
