//! SQLite implementation of the ReputationRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    OutcomeEntry, RecordedOutcome, ReputationRecord, SelfReportedStatus,
};
use crate::domain::ports::ReputationRepository;

#[derive(Clone)]
pub struct SqliteReputationRepository {
    pool: SqlitePool,
}

impl SqliteReputationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReputationRepository for SqliteReputationRepository {
    async fn apply_outcome(
        &self,
        outcome: &RecordedOutcome,
        alpha: f64,
    ) -> DomainResult<ReputationRecord> {
        let now = outcome.recorded_at.to_rfc3339();
        let mut tx = self.pool.begin().await?;

        // The EMA is computed inside the upsert so the read-modify-write is one
        // statement. A new worker starts from 0.0, which reduces to alpha * score.
        let row: ReputationRow = sqlx::query_as(
            r#"INSERT INTO reputation (worker_id, reputation, outcome_count, updated_at)
               VALUES (?, MAX(-1.0, MIN(1.0, ? * ?)), 1, ?)
               ON CONFLICT(worker_id) DO UPDATE SET
                   reputation = MAX(-1.0, MIN(1.0, (1.0 - ?) * reputation + ? * ?)),
                   outcome_count = outcome_count + 1,
                   updated_at = excluded.updated_at
               RETURNING worker_id, reputation, outcome_count, updated_at"#,
        )
        .bind(&outcome.worker_id)
        .bind(alpha)
        .bind(outcome.score)
        .bind(&now)
        .bind(alpha)
        .bind(alpha)
        .bind(outcome.score)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"INSERT INTO outcome_history (task_id, worker_id, objective, status, score,
               reputation_after, recorded_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&outcome.task_id)
        .bind(&outcome.worker_id)
        .bind(&outcome.objective)
        .bind(outcome.status.map(|s| s.as_str()))
        .bind(outcome.score)
        .bind(row.reputation)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        row.try_into()
    }

    async fn get(&self, worker_id: &str) -> DomainResult<Option<ReputationRecord>> {
        let row: Option<ReputationRow> = sqlx::query_as(
            "SELECT worker_id, reputation, outcome_count, updated_at FROM reputation WHERE worker_id = ?",
        )
        .bind(worker_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.try_into()).transpose()
    }

    async fn list(&self) -> DomainResult<Vec<ReputationRecord>> {
        let rows: Vec<ReputationRow> = sqlx::query_as(
            "SELECT worker_id, reputation, outcome_count, updated_at FROM reputation ORDER BY worker_id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn history(&self, worker_id: &str, limit: u32) -> DomainResult<Vec<OutcomeEntry>> {
        let rows: Vec<HistoryRow> = sqlx::query_as(
            r#"SELECT task_id, worker_id, objective, status, score, reputation_after, recorded_at
               FROM outcome_history WHERE worker_id = ?
               ORDER BY id DESC LIMIT ?"#,
        )
        .bind(worker_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }
}

#[derive(sqlx::FromRow)]
struct ReputationRow {
    worker_id: String,
    reputation: f64,
    outcome_count: i64,
    updated_at: String,
}

impl TryFrom<ReputationRow> for ReputationRecord {
    type Error = DomainError;

    fn try_from(row: ReputationRow) -> Result<Self, Self::Error> {
        let outcome_count = u64::try_from(row.outcome_count).map_err(|_| {
            DomainError::SerializationError(format!(
                "Negative outcome count for {}: {}",
                row.worker_id, row.outcome_count
            ))
        })?;

        Ok(ReputationRecord {
            updated_at: super::parse_datetime(&row.updated_at)?,
            worker_id: row.worker_id,
            reputation: row.reputation,
            outcome_count,
        })
    }
}

#[derive(sqlx::FromRow)]
struct HistoryRow {
    task_id: Option<String>,
    worker_id: String,
    objective: Option<String>,
    status: Option<String>,
    score: f64,
    reputation_after: f64,
    recorded_at: String,
}

impl TryFrom<HistoryRow> for OutcomeEntry {
    type Error = DomainError;

    fn try_from(row: HistoryRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .map(|s| {
                SelfReportedStatus::from_str(&s)
                    .ok_or_else(|| DomainError::SerializationError(format!("Invalid status: {s}")))
            })
            .transpose()?;

        Ok(OutcomeEntry {
            recorded_at: super::parse_datetime(&row.recorded_at)?,
            worker_id: row.worker_id,
            task_id: row.task_id,
            objective: row.objective,
            status,
            score: row.score,
            reputation_after: row.reputation_after,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;
    use crate::domain::models::{OutcomeScore, EMA_ALPHA};

    async fn setup_test_repo() -> SqliteReputationRepository {
        let pool = create_migrated_test_pool().await.unwrap();
        SqliteReputationRepository::new(pool)
    }

    #[tokio::test]
    async fn test_first_outcome_starts_from_neutral() {
        let repo = setup_test_repo().await;

        let record = repo
            .apply_outcome(&RecordedOutcome::new("worker-a", OutcomeScore::Verified), EMA_ALPHA)
            .await
            .unwrap();

        assert_eq!(record.worker_id, "worker-a");
        assert!((record.reputation - 0.3).abs() < 1e-9);
        assert_eq!(record.outcome_count, 1);
    }

    #[tokio::test]
    async fn test_updates_fold_into_existing_record() {
        let repo = setup_test_repo().await;

        repo.apply_outcome(&RecordedOutcome::new("w", OutcomeScore::Verified), EMA_ALPHA)
            .await
            .unwrap();
        let record = repo
            .apply_outcome(&RecordedOutcome::new("w", OutcomeScore::Hallucination), EMA_ALPHA)
            .await
            .unwrap();

        // 0.7 * 0.3 + 0.3 * -1.0
        assert!((record.reputation - (-0.09)).abs() < 1e-9);
        assert_eq!(record.outcome_count, 2);

        let stored = repo.get("w").await.unwrap().unwrap();
        assert!((stored.reputation - record.reputation).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_reputation_is_clamped() {
        let repo = setup_test_repo().await;
        let mut outcome = RecordedOutcome::new("w", OutcomeScore::Verified);
        outcome.score = 5.0;

        let record = repo.apply_outcome(&outcome, 1.0).await.unwrap();
        assert!((record.reputation - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_get_unknown_worker() {
        let repo = setup_test_repo().await;
        assert!(repo.get("nobody").await.unwrap().is_none());
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_is_ordered_by_worker() {
        let repo = setup_test_repo().await;
        for worker in ["zeta", "alpha", "mid"] {
            repo.apply_outcome(&RecordedOutcome::new(worker, OutcomeScore::HonestFailure), EMA_ALPHA)
                .await
                .unwrap();
        }

        let ids: Vec<String> = repo.list().await.unwrap().into_iter().map(|r| r.worker_id).collect();
        assert_eq!(ids, vec!["alpha", "mid", "zeta"]);
    }

    #[tokio::test]
    async fn test_history_newest_first_with_limit() {
        let repo = setup_test_repo().await;
        for (i, score) in [OutcomeScore::Verified, OutcomeScore::HonestFailure, OutcomeScore::Hallucination]
            .into_iter()
            .enumerate()
        {
            let outcome = RecordedOutcome::new("w", score).for_task(
                format!("TASK-{i}"),
                "objective",
                SelfReportedStatus::Success,
            );
            repo.apply_outcome(&outcome, EMA_ALPHA).await.unwrap();
        }

        let history = repo.history("w", 2).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].task_id.as_deref(), Some("TASK-2"));
        assert_eq!(history[1].task_id.as_deref(), Some("TASK-1"));
        assert_eq!(history[0].status, Some(SelfReportedStatus::Success));
        assert!((history[0].score + 1.0).abs() < f64::EPSILON);
    }
}
