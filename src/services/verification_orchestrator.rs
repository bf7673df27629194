//! Verification orchestrator.
//!
//! Picks deterministic or council verification per contract, scores the
//! verdict against the worker's self-report, and writes the score to the
//! reputation ledger.

use std::future::Future;
use std::sync::Arc;

use tracing::{info, info_span, warn, Instrument};

use super::council::Council;
use super::gate_engine::GateEngine;
use super::grounding_gate::{GroundingGate, GroundingLimits};
use super::reputation_ledger::ReputationLedger;
use super::scoring::ScoringPolicy;
use super::structural_gate::StructuralGate;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    CouncilSettings, GateId, GateResult, LayerReport, OutcomeScore, RecordedOutcome,
    ReputationRecord, SelfReportedStatus, TaskContract, VerificationConfig, VerificationMode,
    VerificationVerdict, WorkerClaim,
};
use crate::domain::ports::{CommandRunner, ReputationRepository, Reviewer, UrlProber};

/// Everything one verified-and-recorded run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationReport {
    pub verdict: VerificationVerdict,
    pub score: OutcomeScore,
    pub record: ReputationRecord,
}

pub struct VerificationOrchestrator<R: ReputationRepository> {
    gates: GateEngine,
    structural: StructuralGate,
    grounding: GroundingGate,
    council: Council,
    scoring: ScoringPolicy,
    ledger: Arc<ReputationLedger<R>>,
}

impl<R: ReputationRepository> VerificationOrchestrator<R> {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        prober: Arc<dyn UrlProber>,
        reviewer: Arc<dyn Reviewer>,
        ledger: Arc<ReputationLedger<R>>,
        config: &VerificationConfig,
    ) -> Self {
        Self {
            gates: GateEngine::new(runner, config.command_timeout()),
            structural: StructuralGate::new(config.min_section_chars),
            grounding: GroundingGate::new(prober, GroundingLimits::from(config)),
            council: Council::new(reviewer, config.reviewer_timeout()),
            scoring: ScoringPolicy::new(),
            ledger,
        }
    }

    pub fn ledger(&self) -> &ReputationLedger<R> {
        &self.ledger
    }

    /// Verify a claim without touching the ledger.
    pub async fn verify(&self, contract: &TaskContract, claim: &WorkerClaim) -> DomainResult<VerificationVerdict> {
        contract.validate()?;

        if claim.status == SelfReportedStatus::Blocked && contract.allow_blocker {
            info!(task_id = %contract.task_id, "blocker acknowledged, gates not run");
            return Ok(VerificationVerdict::blocker_acknowledged(&claim.details));
        }

        let verdict = match &contract.mode {
            VerificationMode::Deterministic => self.gates.evaluate(contract, claim).await,
            VerificationMode::Council(settings) => {
                self.verify_council(contract, settings, &claim.output).await
            }
        };
        Ok(verdict)
    }

    /// Verify, score, and record under the worker's identity.
    pub async fn verify_and_record(
        &self,
        contract: &TaskContract,
        claim: &WorkerClaim,
        worker_id: &str,
    ) -> DomainResult<VerificationReport> {
        let span = info_span!(
            "verify_and_record",
            task_id = %contract.task_id,
            worker_id,
            mode = contract.mode.as_str(),
            status = %claim.status,
        );

        async {
            let verdict = self.verify(contract, claim).await?;
            let score = self.scoring.classify(claim.status, &verdict, claim.retry_count);

            let outcome = RecordedOutcome::new(worker_id, score).for_task(
                &contract.task_id,
                &contract.objective,
                claim.status,
            );
            let record = self.ledger.record(outcome).await?;

            info!(
                passed = verdict.passed,
                score = score.value(),
                reputation = record.reputation,
                supervision_level = %record.supervision_level(),
                "verification recorded"
            );
            Ok(VerificationReport {
                verdict,
                score,
                record,
            })
        }
        .instrument(span)
        .await
    }

    /// Like [`Self::verify_and_record`], abandoning the run if `cancel`
    /// resolves first. In-flight work is dropped and nothing is recorded.
    pub async fn verify_and_record_until<F>(
        &self,
        contract: &TaskContract,
        claim: &WorkerClaim,
        worker_id: &str,
        cancel: F,
    ) -> DomainResult<VerificationReport>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            () = cancel => {
                warn!(task_id = %contract.task_id, worker_id, "verification cancelled, no score recorded");
                Err(DomainError::Cancelled)
            }
            result = self.verify_and_record(contract, claim, worker_id) => result,
        }
    }

    async fn verify_council(
        &self,
        contract: &TaskContract,
        settings: &CouncilSettings,
        output: &str,
    ) -> VerificationVerdict {
        let structural = self.structural.evaluate(settings, output);
        let mut warnings = structural.warnings.clone();
        if let Some(check) = structural.failed_check {
            warn!(task_id = %contract.task_id, check = check.as_str(), "structural layer failed, skipping grounding and council");
            return layer_failure(GateId::Structural(check), structural);
        }

        let grounding = self.grounding.evaluate(settings, output).await;
        warnings.extend(grounding.warnings.iter().cloned());
        if let Some(check) = grounding.failed_check {
            warn!(task_id = %contract.task_id, check = check.as_str(), "grounding layer failed, skipping council");
            let mut verdict = layer_failure(GateId::Grounding(check), grounding);
            verdict.warnings = warnings;
            return verdict;
        }

        let mut verdict = self.council.review(contract, settings, output).await;
        verdict.warnings = warnings;
        verdict
    }
}

fn layer_failure<C: Copy>(gate: GateId, report: LayerReport<C>) -> VerificationVerdict {
    VerificationVerdict::from_gates(
        vec![GateResult::fail(gate, report.failures.join("; "))],
        report.warnings,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryReputationRepository;
    use crate::adapters::reviewers::{MockReview, MockReviewer};
    use crate::domain::models::{StructuralCheck, TaskType};
    use crate::domain::ports::{CommandOutcome, CommandRequest, CommandStatus, ProbeOutcome};
    use async_trait::async_trait;
    use std::time::Duration;

    struct PassingRunner;

    #[async_trait]
    impl CommandRunner for PassingRunner {
        async fn run(&self, _request: &CommandRequest) -> CommandOutcome {
            CommandOutcome::new(CommandStatus::Exited(0))
        }
    }

    struct SlowRunner;

    #[async_trait]
    impl CommandRunner for SlowRunner {
        async fn run(&self, _request: &CommandRequest) -> CommandOutcome {
            tokio::time::sleep(Duration::from_secs(30)).await;
            CommandOutcome::new(CommandStatus::Exited(0))
        }
    }

    struct ReachableProber;

    #[async_trait]
    impl UrlProber for ReachableProber {
        async fn probe(&self, _url: &str, _timeout: Duration) -> ProbeOutcome {
            ProbeOutcome::Status(200)
        }
    }

    fn orchestrator(
        runner: Arc<dyn CommandRunner>,
        reviewer: Arc<MockReviewer>,
    ) -> VerificationOrchestrator<InMemoryReputationRepository> {
        let ledger = Arc::new(ReputationLedger::new(Arc::new(InMemoryReputationRepository::new())));
        VerificationOrchestrator::new(
            runner,
            Arc::new(ReachableProber),
            reviewer,
            ledger,
            &VerificationConfig::default(),
        )
    }

    #[tokio::test]
    async fn acknowledged_blocker_scores_half_without_running_gates() {
        let orchestrator = orchestrator(Arc::new(SlowRunner), Arc::new(MockReviewer::approving()));
        let contract = TaskContract::builder("Write to /etc")
            .test_command("pytest")
            .allow_blocker(true)
            .build()
            .unwrap();

        let report = orchestrator
            .verify_and_record(&contract, &WorkerClaim::blocked("Permission denied"), "w")
            .await
            .unwrap();

        assert!(report.verdict.blocker_confirmed);
        assert!(report.verdict.gates.is_empty());
        assert_eq!(report.score, OutcomeScore::BlockerConfirmed);
        assert!((report.record.reputation - 0.15).abs() < 1e-12);
    }

    #[tokio::test]
    async fn blocker_without_permission_is_verified_normally() {
        let orchestrator = orchestrator(Arc::new(PassingRunner), Arc::new(MockReviewer::approving()));
        let contract = TaskContract::builder("obj").build().unwrap();

        let report = orchestrator
            .verify_and_record(&contract, &WorkerClaim::blocked("stuck"), "w")
            .await
            .unwrap();
        assert!(!report.verdict.blocker_confirmed);
        assert_eq!(report.score, OutcomeScore::HonestFailure);
    }

    #[tokio::test]
    async fn structural_failure_never_calls_reviewers() {
        let reviewer = Arc::new(MockReviewer::approving());
        let orchestrator = orchestrator(Arc::new(PassingRunner), reviewer.clone());
        let contract = TaskContract::builder("Research topic")
            .council(CouncilSettings::new(TaskType::Research))
            .build()
            .unwrap();
        let claim = WorkerClaim::success().with_output(vec!["word"; 180].join(" "));

        let report = orchestrator.verify_and_record(&contract, &claim, "w").await.unwrap();
        assert_eq!(report.verdict.failed_gate, Some(GateId::Structural(StructuralCheck::WordCount)));
        assert_eq!(report.score, OutcomeScore::Hallucination);
        assert_eq!(reviewer.call_count(), 0);
    }

    #[tokio::test]
    async fn council_pass_records_full_score() {
        let reviewer = Arc::new(MockReviewer::new(vec![
            MockReview::approve(0.9),
            MockReview::approve(0.7),
            MockReview::reject(0.6, "could be shorter"),
        ]));
        let orchestrator = orchestrator(Arc::new(PassingRunner), reviewer.clone());
        let mut settings = CouncilSettings::new(TaskType::Writing);
        settings.pass_threshold = 0.6;
        let contract = TaskContract::builder("Write a blog post").council(settings).build().unwrap();
        let claim = WorkerClaim::success().with_output(vec!["word"; 80].join(" "));

        let report = orchestrator.verify_and_record(&contract, &claim, "w").await.unwrap();
        assert!(report.verdict.passed, "{}", report.verdict.summary);
        assert_eq!(report.score, OutcomeScore::Verified);
        assert_eq!(reviewer.call_count(), 3);
    }

    #[tokio::test]
    async fn cancellation_records_nothing() {
        let orchestrator = orchestrator(Arc::new(SlowRunner), Arc::new(MockReviewer::approving()));
        let contract = TaskContract::builder("obj").test_command("pytest").build().unwrap();

        let err = orchestrator
            .verify_and_record_until(
                &contract,
                &WorkerClaim::success(),
                "w",
                tokio::time::sleep(Duration::from_millis(50)),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Cancelled));
        assert!(orchestrator.ledger().history("w", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_literal_contract_is_rejected_before_scoring() {
        let orchestrator = orchestrator(Arc::new(PassingRunner), Arc::new(MockReviewer::approving()));
        let mut contract = TaskContract::builder("obj").build().unwrap();
        contract.objective.clear();

        let err = orchestrator
            .verify_and_record(&contract, &WorkerClaim::success(), "w")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidContract(_)));
        assert!(orchestrator.ledger().history("w", 10).await.unwrap().is_empty());
    }
}
