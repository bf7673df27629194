//! Deterministic verification: files, tests, lint, and parse gates.
//!
//! Gates run in a fixed order and the first failure short-circuits the rest,
//! so a missing file is reported even when the tests would also fail.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::source_check::{check_in_process, SourceKind};
use crate::domain::models::{GateId, GateResult, TaskContract, VerificationVerdict, WorkerClaim};
use crate::domain::ports::{CommandOutcome, CommandRequest, CommandRunner, CommandStatus};

/// Parses a Python file without writing bytecode next to it.
const PYTHON_PARSE_SCRIPT: &str = "import ast, sys; ast.parse(open(sys.argv[1], 'rb').read(), sys.argv[1])";

/// The gates this engine owns, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeterministicGate {
    Files,
    Tests,
    Lint,
    Parse,
}

impl DeterministicGate {
    const ORDER: [Self; 4] = [Self::Files, Self::Tests, Self::Lint, Self::Parse];

    const fn id(self) -> GateId {
        match self {
            Self::Files => GateId::Files,
            Self::Tests => GateId::Tests,
            Self::Lint => GateId::Lint,
            Self::Parse => GateId::Parse,
        }
    }
}

// ---------------------------------------------------------------------------
// GateEngine
// ---------------------------------------------------------------------------

pub struct GateEngine {
    runner: Arc<dyn CommandRunner>,
    command_timeout: Duration,
}

impl GateEngine {
    pub fn new(runner: Arc<dyn CommandRunner>, command_timeout: Duration) -> Self {
        Self {
            runner,
            command_timeout,
        }
    }

    /// Evaluate `Files ∧ Tests ∧ Lint ∧ Parse` for a claim.
    pub async fn evaluate(&self, contract: &TaskContract, claim: &WorkerClaim) -> VerificationVerdict {
        let mut gates = Vec::with_capacity(DeterministicGate::ORDER.len());

        for stage in DeterministicGate::ORDER {
            let gate = stage.id();
            let started = Instant::now();
            let result = match stage {
                DeterministicGate::Files => self.check_files(contract).await,
                DeterministicGate::Tests => self.check_tests(contract).await,
                DeterministicGate::Lint => self.check_lint(contract).await,
                DeterministicGate::Parse => self.check_parse(contract, claim).await,
            };

            debug!(
                task_id = %contract.task_id,
                gate = %gate,
                passed = result.passed,
                duration_ms = started.elapsed().as_millis() as u64,
                reason = %result.reason,
                "gate evaluated"
            );

            let passed = result.passed;
            gates.push(result);
            if !passed {
                warn!(
                    task_id = %contract.task_id,
                    gate = %gate,
                    "gate failed, skipping remaining gates"
                );
                break;
            }
        }

        let verdict = VerificationVerdict::from_gates(gates, Vec::new());
        info!(
            task_id = %contract.task_id,
            passed = verdict.passed,
            summary = %verdict.summary,
            "deterministic verification complete"
        );
        verdict
    }

    async fn check_files(&self, contract: &TaskContract) -> GateResult {
        for path in &contract.required_files {
            let absolute = contract.resolve(path);
            match tokio::fs::metadata(&absolute).await {
                Ok(meta) if !meta.is_file() => {
                    return GateResult::fail(
                        GateId::Files,
                        format!("Required path is not a file: {}", path.display()),
                    );
                }
                Ok(meta) if meta.len() == 0 => {
                    return GateResult::fail(
                        GateId::Files,
                        format!("Required file is empty: {}", path.display()),
                    );
                }
                Ok(_) => {}
                Err(_) => {
                    return GateResult::fail(
                        GateId::Files,
                        format!("Required file missing: {}", path.display()),
                    );
                }
            }
        }

        GateResult::pass(
            GateId::Files,
            format!("{} required file(s) present", contract.required_files.len()),
        )
    }

    async fn check_tests(&self, contract: &TaskContract) -> GateResult {
        let Some(command) = &contract.test_command else {
            return GateResult::pass(GateId::Tests, "No test command configured");
        };

        let outcome = self.run_shell(command, contract).await;
        match &outcome.status {
            CommandStatus::Exited(0) => GateResult::pass(GateId::Tests, "Tests passed"),
            _ => GateResult::fail(GateId::Tests, describe_failure("Test command", &outcome)),
        }
    }

    async fn check_lint(&self, contract: &TaskContract) -> GateResult {
        let Some(command) = &contract.lint_command else {
            return GateResult::pass(GateId::Lint, "No lint command configured");
        };

        let outcome = self.run_shell(command, contract).await;
        if outcome.tool_missing() {
            info!(task_id = %contract.task_id, command = %command, "lint tool not installed, skipping");
            return GateResult::pass(GateId::Lint, "Lint tool not installed; skipped");
        }
        match &outcome.status {
            CommandStatus::Exited(0) => GateResult::pass(GateId::Lint, "Lint clean"),
            _ => GateResult::fail(GateId::Lint, describe_failure("Lint command", &outcome)),
        }
    }

    async fn check_parse(&self, contract: &TaskContract, claim: &WorkerClaim) -> GateResult {
        let mut checked = 0usize;

        for path in deliverables(contract, claim) {
            let Some(kind) = SourceKind::from_path(&path) else {
                continue;
            };
            let absolute = contract.resolve(&path);

            let result = if kind.is_in_process() {
                match tokio::fs::read_to_string(&absolute).await {
                    Ok(source) => check_in_process(kind, &source).map(|()| true),
                    Err(e) => Err(format!("cannot read file: {e}")),
                }
            } else {
                self.check_python(&absolute, contract).await
            };

            match result {
                Ok(true) => checked += 1,
                Ok(false) => {
                    debug!(path = %path.display(), kind = kind.as_str(), "no checker available, skipped");
                }
                Err(reason) => {
                    return GateResult::fail(
                        GateId::Parse,
                        format!("{} does not parse as {}: {reason}", path.display(), kind.as_str()),
                    );
                }
            }
        }

        GateResult::pass(GateId::Parse, format!("{checked} source file(s) parsed"))
    }

    /// `Ok(false)` when no interpreter is available.
    async fn check_python(&self, path: &std::path::Path, contract: &TaskContract) -> Result<bool, String> {
        let request = CommandRequest::new("python3", &contract.working_dir, self.command_timeout)
            .args(["-c", PYTHON_PARSE_SCRIPT])
            .arg(path.display().to_string());
        let outcome = self.runner.run(&request).await;

        if outcome.tool_missing() {
            return Ok(false);
        }
        match &outcome.status {
            CommandStatus::Exited(0) => Ok(true),
            _ => Err(outcome
                .tail()
                .map_or_else(|| describe_status(&outcome.status), str::to_string)),
        }
    }

    async fn run_shell(&self, command: &str, contract: &TaskContract) -> CommandOutcome {
        let request = CommandRequest::shell(command, &contract.working_dir, self.command_timeout);
        self.runner.run(&request).await
    }
}

/// Required files followed by extra claimed deliverables, without duplicates.
fn deliverables(contract: &TaskContract, claim: &WorkerClaim) -> Vec<PathBuf> {
    let mut paths = contract.required_files.clone();
    for path in &claim.deliverables {
        if !paths.contains(path) {
            paths.push(path.clone());
        }
    }
    paths
}

fn describe_status(status: &CommandStatus) -> String {
    match status {
        CommandStatus::Exited(code) => format!("exited with status {code}"),
        CommandStatus::Terminated => "terminated by a signal".to_string(),
        CommandStatus::TimedOut => "timed out".to_string(),
        CommandStatus::NotFound => "command not found".to_string(),
        CommandStatus::SpawnFailed(reason) => format!("failed to start: {reason}"),
    }
}

fn describe_failure(what: &str, outcome: &CommandOutcome) -> String {
    let status = describe_status(&outcome.status);
    match outcome.tail() {
        Some(tail) if matches!(outcome.status, CommandStatus::Exited(_)) => {
            format!("{what} {status}: {tail}")
        }
        _ => format!("{what} {status}"),
    }
}
