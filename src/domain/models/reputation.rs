//! Reputation domain model.
//!
//! Each worker identity carries an exponential moving average of its scored
//! outcomes. The average determines how much supervision the worker gets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::claim::SelfReportedStatus;

/// EMA smoothing factor.
pub const EMA_ALPHA: f64 = 0.3;

/// Reputation of a worker that has never been scored.
pub const NEUTRAL_REPUTATION: f64 = 0.0;

/// The fixed set of scores an outcome can receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeScore {
    /// Claimed success, verified on the first attempt.
    Verified,
    /// Claimed success, verified after at least one retry.
    VerifiedAfterRetry,
    /// Blocker reported and independently confirmed.
    BlockerConfirmed,
    /// Honest failure or an unconfirmed blocker.
    HonestFailure,
    /// Claimed success that verification contradicts.
    Hallucination,
}

impl OutcomeScore {
    pub const fn value(&self) -> f64 {
        match self {
            Self::Verified => 1.0,
            Self::VerifiedAfterRetry => 0.7,
            Self::BlockerConfirmed => 0.5,
            Self::HonestFailure => 0.0,
            Self::Hallucination => -1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::VerifiedAfterRetry => "verified_after_retry",
            Self::BlockerConfirmed => "blocker_confirmed",
            Self::HonestFailure => "honest_failure",
            Self::Hallucination => "hallucination",
        }
    }
}

/// Degree of oversight applied to a worker's future tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupervisionLevel {
    /// May not be assigned further tasks until manually cleared.
    Suspended,
    /// Subsequent tasks escalate to a stronger review model.
    Strict,
    Supervised,
    Standard,
    Autonomous,
}

impl SupervisionLevel {
    /// Pure step function of reputation. No hysteresis.
    pub fn for_reputation(reputation: f64) -> Self {
        if reputation > 0.8 {
            Self::Autonomous
        } else if reputation > 0.6 {
            Self::Standard
        } else if reputation > 0.4 {
            Self::Supervised
        } else if reputation > 0.2 {
            Self::Strict
        } else {
            Self::Suspended
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Suspended => "suspended",
            Self::Strict => "strict",
            Self::Supervised => "supervised",
            Self::Standard => "standard",
            Self::Autonomous => "autonomous",
        }
    }

    pub fn requires_escalation(&self) -> bool {
        matches!(self, Self::Strict)
    }

    pub fn may_be_assigned(&self) -> bool {
        !matches!(self, Self::Suspended)
    }
}

impl std::fmt::Display for SupervisionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Apply one EMA step and clamp to [-1.0, 1.0].
pub fn ema_update(previous: f64, score: f64, alpha: f64) -> f64 {
    (1.0 - alpha).mul_add(previous, alpha * score).clamp(-1.0, 1.0)
}

/// Current reputation of one worker identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReputationRecord {
    pub worker_id: String,
    /// Always within [-1.0, 1.0].
    pub reputation: f64,
    pub outcome_count: u64,
    pub updated_at: DateTime<Utc>,
}

impl ReputationRecord {
    /// The neutral prior a worker starts from before its first outcome.
    pub fn neutral(worker_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            worker_id: worker_id.into(),
            reputation: NEUTRAL_REPUTATION,
            outcome_count: 0,
            updated_at: now,
        }
    }

    /// The record after folding in one more score.
    pub fn apply(&self, score: f64, alpha: f64, now: DateTime<Utc>) -> Self {
        Self {
            worker_id: self.worker_id.clone(),
            reputation: ema_update(self.reputation, score, alpha),
            outcome_count: self.outcome_count + 1,
            updated_at: now,
        }
    }

    pub fn supervision_level(&self) -> SupervisionLevel {
        SupervisionLevel::for_reputation(self.reputation)
    }
}

/// A score about to be recorded, with optional task metadata for the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedOutcome {
    pub worker_id: String,
    pub score: f64,
    pub task_id: Option<String>,
    pub objective: Option<String>,
    pub status: Option<SelfReportedStatus>,
    pub recorded_at: DateTime<Utc>,
}

impl RecordedOutcome {
    pub fn new(worker_id: impl Into<String>, score: OutcomeScore) -> Self {
        Self {
            worker_id: worker_id.into(),
            score: score.value(),
            task_id: None,
            objective: None,
            status: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn for_task(
        mut self,
        task_id: impl Into<String>,
        objective: impl Into<String>,
        status: SelfReportedStatus,
    ) -> Self {
        self.task_id = Some(task_id.into());
        self.objective = Some(objective.into());
        self.status = Some(status);
        self
    }
}

/// One row of a worker's append-only outcome history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeEntry {
    pub worker_id: String,
    pub task_id: Option<String>,
    pub objective: Option<String>,
    pub status: Option<SelfReportedStatus>,
    pub score: f64,
    pub reputation_after: f64,
    pub recorded_at: DateTime<Utc>,
}

impl OutcomeEntry {
    pub fn from_outcome(outcome: &RecordedOutcome, reputation_after: f64) -> Self {
        Self {
            worker_id: outcome.worker_id.clone(),
            task_id: outcome.task_id.clone(),
            objective: outcome.objective.clone(),
            status: outcome.status,
            score: outcome.score,
            reputation_after,
            recorded_at: outcome.recorded_at,
        }
    }
}

/// Query view of a worker: identity, reputation, count, and level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerStats {
    pub worker_id: String,
    pub reputation: f64,
    pub outcome_count: u64,
    pub supervision_level: SupervisionLevel,
    pub updated_at: DateTime<Utc>,
}

impl From<ReputationRecord> for WorkerStats {
    fn from(record: ReputationRecord) -> Self {
        let supervision_level = record.supervision_level();
        Self {
            worker_id: record.worker_id,
            reputation: record.reputation,
            outcome_count: record.outcome_count,
            supervision_level,
            updated_at: record.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_values_are_the_fixed_set() {
        let values: Vec<f64> = [
            OutcomeScore::Verified,
            OutcomeScore::VerifiedAfterRetry,
            OutcomeScore::BlockerConfirmed,
            OutcomeScore::HonestFailure,
            OutcomeScore::Hallucination,
        ]
        .iter()
        .map(OutcomeScore::value)
        .collect();
        assert_eq!(values, vec![1.0, 0.7, 0.5, 0.0, -1.0]);
    }

    #[test]
    fn supervision_thresholds_are_strict_inequalities() {
        assert_eq!(SupervisionLevel::for_reputation(0.81), SupervisionLevel::Autonomous);
        assert_eq!(SupervisionLevel::for_reputation(0.8), SupervisionLevel::Standard);
        assert_eq!(SupervisionLevel::for_reputation(0.6), SupervisionLevel::Supervised);
        assert_eq!(SupervisionLevel::for_reputation(0.4), SupervisionLevel::Strict);
        assert_eq!(SupervisionLevel::for_reputation(0.2), SupervisionLevel::Suspended);
        assert_eq!(SupervisionLevel::for_reputation(-1.0), SupervisionLevel::Suspended);
    }

    #[test]
    fn strict_requires_escalation_and_suspended_blocks_assignment() {
        assert!(SupervisionLevel::Strict.requires_escalation());
        assert!(!SupervisionLevel::Standard.requires_escalation());
        assert!(!SupervisionLevel::Suspended.may_be_assigned());
        assert!(SupervisionLevel::Strict.may_be_assigned());
    }

    #[test]
    fn first_update_from_neutral_prior() {
        let now = Utc::now();
        let record = ReputationRecord::neutral("worker-a", now).apply(1.0, EMA_ALPHA, now);
        assert!((record.reputation - 0.3).abs() < 1e-12);
        assert_eq!(record.outcome_count, 1);

        let record = ReputationRecord::neutral("worker-b", now).apply(-1.0, EMA_ALPHA, now);
        assert!((record.reputation + 0.3).abs() < 1e-12);
    }

    #[test]
    fn ema_clamps_out_of_domain_input() {
        assert!((ema_update(1.0, 5.0, 1.0) - 1.0).abs() < f64::EPSILON);
        assert!((ema_update(-1.0, -5.0, 1.0) + 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn stats_carry_supervision_level() {
        let now = Utc::now();
        let mut record = ReputationRecord::neutral("w", now);
        record.reputation = 0.65;
        let stats = WorkerStats::from(record);
        assert_eq!(stats.supervision_level, SupervisionLevel::Standard);
    }
}
