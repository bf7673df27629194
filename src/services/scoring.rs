//! Outcome scoring.
//!
//! A claimed success that verification contradicts scores -1.0, below an
//! honest failure. That override takes precedence over every other rule.

use tracing::debug;

use crate::domain::models::{OutcomeScore, SelfReportedStatus, VerificationVerdict};

/// What verification concluded, independent of what the worker said.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictOutcome {
    Pass,
    Fail,
    BlockerConfirmed,
}

impl From<&VerificationVerdict> for VerdictOutcome {
    fn from(verdict: &VerificationVerdict) -> Self {
        if verdict.passed {
            Self::Pass
        } else if verdict.blocker_confirmed {
            Self::BlockerConfirmed
        } else {
            Self::Fail
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    FirstAttempt,
    Retried,
}

impl RetryState {
    pub fn from_count(retry_count: u32) -> Self {
        if retry_count == 0 {
            Self::FirstAttempt
        } else {
            Self::Retried
        }
    }
}

/// Maps status × verdict × retries onto the fixed score set.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringPolicy;

impl ScoringPolicy {
    pub fn new() -> Self {
        Self
    }

    pub fn score(&self, status: SelfReportedStatus, verdict: &VerificationVerdict, retry_count: u32) -> f64 {
        self.classify(status, verdict, retry_count).value()
    }

    pub fn classify(
        &self,
        status: SelfReportedStatus,
        verdict: &VerificationVerdict,
        retry_count: u32,
    ) -> OutcomeScore {
        let outcome = score_outcome(
            status,
            VerdictOutcome::from(verdict),
            RetryState::from_count(retry_count),
        );
        debug!(
            status = %status,
            passed = verdict.passed,
            blocker_confirmed = verdict.blocker_confirmed,
            retry_count,
            score = outcome.as_str(),
            "outcome scored"
        );
        outcome
    }
}

/// The full scoring table.
pub fn score_outcome(status: SelfReportedStatus, outcome: VerdictOutcome, retry: RetryState) -> OutcomeScore {
    use RetryState::{FirstAttempt, Retried};
    use SelfReportedStatus::{Blocked, Failure, Success};
    use VerdictOutcome::{BlockerConfirmed, Fail, Pass};

    match (status, outcome, retry) {
        (Success, Fail | BlockerConfirmed, _) => OutcomeScore::Hallucination,
        (Success, Pass, FirstAttempt) => OutcomeScore::Verified,
        (Success, Pass, Retried) => OutcomeScore::VerifiedAfterRetry,
        (Blocked, BlockerConfirmed, _) => OutcomeScore::BlockerConfirmed,
        (Blocked, Pass | Fail, _) => OutcomeScore::HonestFailure,
        (Failure, _, _) => OutcomeScore::HonestFailure,
    }
}
