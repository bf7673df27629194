//! Worker claim domain model.
//!
//! What an untrusted worker says about its own work. The self-reported
//! status is one input to scoring and is never treated as ground truth.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Status a worker reports for its own task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelfReportedStatus {
    Success,
    Blocked,
    Failure,
}

impl SelfReportedStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Blocked => "blocked",
            Self::Failure => "failure",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "success" | "done" | "complete" => Some(Self::Success),
            "blocked" => Some(Self::Blocked),
            "failure" | "failed" => Some(Self::Failure),
            _ => None,
        }
    }
}

impl std::fmt::Display for SelfReportedStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A worker's claimed completion of a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerClaim {
    pub status: SelfReportedStatus,
    /// Free-text details supplied with the report.
    #[serde(default)]
    pub details: String,
    /// Produced text output, verified in council mode.
    #[serde(default)]
    pub output: String,
    /// Deliverables beyond the contract's required files, relative to the
    /// contract working directory. Included in the parse gate.
    #[serde(default)]
    pub deliverables: Vec<PathBuf>,
    /// How many times the task was retried before this claim.
    #[serde(default)]
    pub retry_count: u32,
}

impl WorkerClaim {
    pub fn new(status: SelfReportedStatus) -> Self {
        Self {
            status,
            details: String::new(),
            output: String::new(),
            deliverables: Vec::new(),
            retry_count: 0,
        }
    }

    pub fn success() -> Self {
        Self::new(SelfReportedStatus::Success)
    }

    pub fn blocked(details: impl Into<String>) -> Self {
        Self::new(SelfReportedStatus::Blocked).with_details(details)
    }

    pub fn failure(details: impl Into<String>) -> Self {
        Self::new(SelfReportedStatus::Failure).with_details(details)
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self
    }

    pub fn with_deliverable(mut self, path: impl Into<PathBuf>) -> Self {
        self.deliverables.push(path.into());
        self
    }

    pub fn with_retries(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }
}
