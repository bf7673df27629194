//! Task contract domain model.
//!
//! A contract is the immutable description of what "done" means for one
//! delegated task. It is built once through [`TaskContractBuilder`], which
//! rejects malformed or self-contradictory contracts before any
//! verification begins.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::profile::{TaskProfile, TaskType};
use crate::domain::errors::ContractError;

/// Default pass threshold for council verdicts.
pub const DEFAULT_PASS_THRESHOLD: f64 = 0.5;

/// Default number of reviewers in a council.
pub const DEFAULT_COUNCIL_SIZE: usize = 3;

/// Settings that only apply to council-mode verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouncilSettings {
    /// Task type tag selecting the structural/grounding profile.
    pub task_type: TaskType,
    /// Number of independent reviewers (at least 1).
    pub council_size: usize,
    /// Minimum word count; `None` uses the profile default.
    pub min_words: Option<usize>,
    /// Section headings that must be present in the output.
    pub required_sections: Vec<String>,
    /// Minimum approval ratio θ, applied in addition to strict majority.
    pub pass_threshold: f64,
}

impl CouncilSettings {
    pub fn new(task_type: TaskType) -> Self {
        Self {
            task_type,
            council_size: DEFAULT_COUNCIL_SIZE,
            min_words: None,
            required_sections: Vec::new(),
            pass_threshold: DEFAULT_PASS_THRESHOLD,
        }
    }

    pub fn profile(&self) -> &'static TaskProfile {
        self.task_type.profile()
    }

    /// Effective minimum word count: the contract override or the profile default.
    pub fn effective_min_words(&self) -> usize {
        self.min_words.unwrap_or(self.profile().min_words)
    }
}

/// How a contract's deliverables are verified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum VerificationMode {
    /// Files, tests, lint, and parse gates for code-shaped deliverables.
    Deterministic,
    /// Structural, grounding, and council layers for open-ended text.
    Council(CouncilSettings),
}

impl VerificationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deterministic => "deterministic",
            Self::Council(_) => "council",
        }
    }
}

/// Immutable description of one delegated task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskContract {
    pub task_id: String,
    pub objective: String,
    /// Advisory only; shown to reviewers, never checked programmatically.
    pub acceptance_criteria: Vec<String>,
    /// Paths relative to `working_dir`, in declaration order, without duplicates.
    pub required_files: Vec<PathBuf>,
    pub working_dir: PathBuf,
    pub test_command: Option<String>,
    pub lint_command: Option<String>,
    /// Whether a self-reported blocker may be acknowledged instead of verified.
    pub allow_blocker: bool,
    pub mode: VerificationMode,
}

impl TaskContract {
    pub fn builder(objective: impl Into<String>) -> TaskContractBuilder {
        TaskContractBuilder::new(objective)
    }

    pub fn council(&self) -> Option<&CouncilSettings> {
        match &self.mode {
            VerificationMode::Council(settings) => Some(settings),
            VerificationMode::Deterministic => None,
        }
    }

    /// Absolute location of a deliverable path.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.working_dir.join(path)
    }

    /// Re-check the invariants the builder enforces.
    ///
    /// Contracts can also be deserialized or built literally, so the
    /// orchestrator validates again before verifying.
    pub fn validate(&self) -> Result<(), ContractError> {
        if self.objective.trim().is_empty() {
            return Err(ContractError::EmptyObjective);
        }

        for path in &self.required_files {
            if path.as_os_str().is_empty() {
                return Err(ContractError::EmptyRequiredPath);
            }
            if path.is_absolute() {
                return Err(ContractError::AbsoluteRequiredPath(
                    path.display().to_string(),
                ));
            }
        }

        if matches!(&self.test_command, Some(cmd) if cmd.trim().is_empty()) {
            return Err(ContractError::BlankCommand { gate: "tests" });
        }
        if matches!(&self.lint_command, Some(cmd) if cmd.trim().is_empty()) {
            return Err(ContractError::BlankCommand { gate: "lint" });
        }

        if let VerificationMode::Council(settings) = &self.mode {
            if settings.council_size < 1 {
                return Err(ContractError::InvalidCouncilSize(settings.council_size));
            }
            let theta = settings.pass_threshold;
            if !theta.is_finite() || !(0.0..=1.0).contains(&theta) {
                return Err(ContractError::InvalidPassThreshold(theta));
            }
        }

        Ok(())
    }
}

/// Builder for [`TaskContract`].
#[derive(Debug, Clone)]
pub struct TaskContractBuilder {
    task_id: Option<String>,
    objective: String,
    acceptance_criteria: Vec<String>,
    required_files: Vec<PathBuf>,
    working_dir: PathBuf,
    test_command: Option<String>,
    lint_command: Option<String>,
    allow_blocker: bool,
    mode: VerificationMode,
}

impl TaskContractBuilder {
    pub fn new(objective: impl Into<String>) -> Self {
        Self {
            task_id: None,
            objective: objective.into(),
            acceptance_criteria: Vec::new(),
            required_files: Vec::new(),
            working_dir: PathBuf::from("."),
            test_command: None,
            lint_command: None,
            allow_blocker: false,
            mode: VerificationMode::Deterministic,
        }
    }

    pub fn task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn criterion(mut self, criterion: impl Into<String>) -> Self {
        self.acceptance_criteria.push(criterion.into());
        self
    }

    pub fn criteria<I, S>(mut self, criteria: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.acceptance_criteria
            .extend(criteria.into_iter().map(Into::into));
        self
    }

    pub fn required_file(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if !self.required_files.contains(&path) {
            self.required_files.push(path);
        }
        self
    }

    pub fn required_files<I, P>(self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        paths
            .into_iter()
            .fold(self, |builder, path| builder.required_file(path))
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    pub fn test_command(mut self, command: impl Into<String>) -> Self {
        self.test_command = Some(command.into());
        self
    }

    pub fn lint_command(mut self, command: impl Into<String>) -> Self {
        self.lint_command = Some(command.into());
        self
    }

    pub fn allow_blocker(mut self, allow: bool) -> Self {
        self.allow_blocker = allow;
        self
    }

    pub fn council(mut self, settings: CouncilSettings) -> Self {
        self.mode = VerificationMode::Council(settings);
        self
    }

    pub fn build(self) -> Result<TaskContract, ContractError> {
        let contract = TaskContract {
            task_id: self.task_id.unwrap_or_else(generate_task_id),
            objective: self.objective,
            acceptance_criteria: self.acceptance_criteria,
            required_files: self.required_files,
            working_dir: self.working_dir,
            test_command: self.test_command,
            lint_command: self.lint_command,
            allow_blocker: self.allow_blocker,
            mode: self.mode,
        };
        contract.validate()?;
        Ok(contract)
    }
}

/// Generate a short task identifier of the form `TASK-xxxxxxxx`.
pub fn generate_task_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("TASK-{}", &id[..8])
}
