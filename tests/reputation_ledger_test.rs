mod common;

use std::sync::Arc;

use governed_agents::adapters::sqlite::initialize_database;
use governed_agents::adapters::{MockReviewer, SqliteReputationRepository};
use governed_agents::domain::models::{DatabaseConfig, RecordedOutcome};
use governed_agents::services::StatsReport;
use governed_agents::{
    DomainError, OutcomeScore, ReputationLedger, SelfReportedStatus, SupervisionLevel, TaskContract,
    WorkerClaim,
};
use sqlx::SqlitePool;

use common::{orchestrator_with, temp_dir};

type FileLedger = Arc<ReputationLedger<SqliteReputationRepository>>;

async fn file_ledger_with_pool(dir: &tempfile::TempDir) -> (FileLedger, SqlitePool) {
    let config = DatabaseConfig {
        path: dir.path().join("nested/reputation.db").display().to_string(),
        max_connections: 4,
    };
    let pool = initialize_database(&config).await.expect("database should initialize");
    let ledger = Arc::new(ReputationLedger::new(Arc::new(SqliteReputationRepository::new(
        pool.clone(),
    ))));
    (ledger, pool)
}

async fn file_ledger(dir: &tempfile::TempDir) -> FileLedger {
    file_ledger_with_pool(dir).await.0
}

#[tokio::test]
async fn test_reputation_survives_reopening_the_database() {
    let dir = temp_dir();
    {
        let ledger = file_ledger(&dir).await;
        ledger.record_outcome("w-persist", OutcomeScore::Verified).await.unwrap();
        ledger.record_outcome("w-persist", OutcomeScore::Verified).await.unwrap();
    }

    let reopened = file_ledger(&dir).await;
    let StatsReport::Worker(Some(stats)) = reopened.get_stats(Some("w-persist")).await.unwrap() else {
        panic!("worker should exist after reopening");
    };
    assert_eq!(stats.outcome_count, 2);
    assert!((stats.reputation - 0.51).abs() < 1e-9);
    assert_eq!(stats.supervision_level, SupervisionLevel::Supervised);
}

#[tokio::test]
async fn test_history_is_newest_first_with_task_metadata() {
    let dir = temp_dir();
    let ledger = file_ledger(&dir).await;

    ledger
        .record(
            RecordedOutcome::new("w-hist", OutcomeScore::Verified).for_task(
                "TASK-1",
                "first objective",
                SelfReportedStatus::Success,
            ),
        )
        .await
        .unwrap();
    ledger
        .record(
            RecordedOutcome::new("w-hist", OutcomeScore::Hallucination).for_task(
                "TASK-2",
                "second objective",
                SelfReportedStatus::Success,
            ),
        )
        .await
        .unwrap();

    let history = ledger.history("w-hist", 10).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].task_id.as_deref(), Some("TASK-2"));
    assert!((history[0].score + 1.0).abs() < f64::EPSILON);
    assert!((history[0].reputation_after - (0.7 * 0.3 - 0.3)).abs() < 1e-9);
    assert_eq!(history[1].objective.as_deref(), Some("first objective"));

    assert_eq!(ledger.history("w-hist", 1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_concurrent_updates_on_file_database_are_not_lost() {
    let dir = temp_dir();
    let ledger = file_ledger(&dir).await;

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let ledger = ledger.clone();
            let score = if i % 2 == 0 {
                OutcomeScore::Verified
            } else {
                OutcomeScore::HonestFailure
            };
            tokio::spawn(async move { ledger.record_outcome("w-busy", score).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let StatsReport::Worker(Some(stats)) = ledger.get_stats(Some("w-busy")).await.unwrap() else {
        panic!("worker should exist");
    };
    assert_eq!(stats.outcome_count, 16);
    assert!((-1.0..=1.0).contains(&stats.reputation));
    assert_eq!(ledger.history("w-busy", 100).await.unwrap().len(), 16);
}

#[tokio::test]
async fn test_stats_for_all_workers_are_sorted_by_id() {
    let dir = temp_dir();
    let ledger = file_ledger(&dir).await;
    for id in ["zeta", "alpha", "mu"] {
        ledger.record_outcome(id, OutcomeScore::BlockerConfirmed).await.unwrap();
    }

    let StatsReport::All(all) = ledger.get_stats(None).await.unwrap() else {
        panic!("expected all-worker report");
    };
    let ids: Vec<&str> = all.iter().map(|s| s.worker_id.as_str()).collect();
    assert_eq!(ids, vec!["alpha", "mu", "zeta"]);
}

#[tokio::test]
async fn test_orchestrator_records_into_sqlite() {
    let dir = temp_dir();
    let ledger = file_ledger(&dir).await;
    let orchestrator = orchestrator_with(ledger.clone(), Arc::new(MockReviewer::approving()));
    let contract = TaskContract::builder("Delete production logs")
        .allow_blocker(true)
        .build()
        .unwrap();

    let report = orchestrator
        .verify_and_record(&contract, &WorkerClaim::blocked("Permission denied"), "w-blocked")
        .await
        .unwrap();
    assert_eq!(report.score, OutcomeScore::BlockerConfirmed);

    let history = ledger.history("w-blocked", 5).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].task_id.as_deref(), Some(contract.task_id.as_str()));
    assert_eq!(history[0].status, Some(SelfReportedStatus::Blocked));
    assert_eq!(
        ledger.supervision_level("w-blocked").await.unwrap(),
        SupervisionLevel::Suspended
    );
}

#[tokio::test]
async fn test_closed_store_fails_record_outcome() {
    let dir = temp_dir();
    let (ledger, pool) = file_ledger_with_pool(&dir).await;
    ledger.record_outcome("w-down", OutcomeScore::Verified).await.unwrap();

    pool.close().await;

    let err = ledger
        .record_outcome("w-down", OutcomeScore::Verified)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Storage(_)), "{err:?}");
}

#[tokio::test]
async fn test_orchestrator_surfaces_storage_failure_without_history() {
    let dir = temp_dir();
    let (ledger, pool) = file_ledger_with_pool(&dir).await;
    let orchestrator = orchestrator_with(ledger, Arc::new(MockReviewer::approving()));
    let contract = TaskContract::builder("Rotate credentials")
        .allow_blocker(true)
        .build()
        .unwrap();

    pool.close().await;

    let err = orchestrator
        .verify_and_record(&contract, &WorkerClaim::blocked("Vault sealed"), "w-sealed")
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Storage(_)), "{err:?}");

    let reopened = file_ledger(&dir).await;
    assert!(reopened.history("w-sealed", 10).await.unwrap().is_empty());
    assert!(matches!(
        reopened.get_stats(Some("w-sealed")).await.unwrap(),
        StatsReport::Worker(None)
    ));
}
