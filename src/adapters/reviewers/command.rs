//! Reviewer that pipes the prompt to an external command.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::{CommandRequest, CommandRunner, CommandStatus, ReviewRequest, Reviewer};

/// Runs `program args...` per review, writing the prompt to stdin and
/// returning stdout as the raw review.
pub struct CommandReviewer {
    runner: Arc<dyn CommandRunner>,
    program: String,
    args: Vec<String>,
    working_dir: PathBuf,
    timeout: Duration,
}

impl CommandReviewer {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        program: impl Into<String>,
        working_dir: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            runner,
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
            timeout,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

#[async_trait]
impl Reviewer for CommandReviewer {
    fn name(&self) -> &str {
        &self.program
    }

    async fn review(&self, request: &ReviewRequest) -> DomainResult<String> {
        let command = CommandRequest::new(&self.program, &self.working_dir, self.timeout)
            .args(self.args.iter().cloned())
            .stdin(request.prompt.clone());

        let outcome = self.runner.run(&command).await;
        debug!(
            reviewer = %self.program,
            seat = request.seat,
            status = ?outcome.status,
            "reviewer command finished"
        );

        match outcome.status {
            CommandStatus::Exited(0) => Ok(outcome.stdout),
            CommandStatus::Exited(code) => Err(DomainError::Reviewer(format!(
                "{} exited with status {code}: {}",
                self.program,
                outcome.tail().unwrap_or("no output")
            ))),
            CommandStatus::Terminated => Err(DomainError::Reviewer(format!(
                "{} was terminated by a signal",
                self.program
            ))),
            CommandStatus::TimedOut => Err(DomainError::Reviewer(format!(
                "{} timed out after {:?}",
                self.program, self.timeout
            ))),
            CommandStatus::NotFound => Err(DomainError::Reviewer(format!(
                "{} not found",
                self.program
            ))),
            CommandStatus::SpawnFailed(reason) => Err(DomainError::Reviewer(format!(
                "failed to start {}: {reason}",
                self.program
            ))),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::adapters::process::TokioCommandRunner;

    fn reviewer(program: &str) -> CommandReviewer {
        CommandReviewer::new(
            Arc::new(TokioCommandRunner::new()),
            program,
            std::env::temp_dir(),
            Duration::from_secs(10),
        )
    }

    #[tokio::test]
    async fn returns_stdout_of_successful_command() {
        let reviewer = reviewer("cat");
        let raw = reviewer
            .review(&ReviewRequest {
                seat: 0,
                prompt: r#"{"verdict": "approve"}"#.to_string(),
            })
            .await
            .unwrap();
        assert_eq!(raw, r#"{"verdict": "approve"}"#);
    }

    #[tokio::test]
    async fn non_zero_exit_is_a_reviewer_error() {
        let reviewer = reviewer("sh").with_args(["-c", "echo broken >&2; exit 2"]);
        let err = reviewer
            .review(&ReviewRequest {
                seat: 0,
                prompt: String::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Reviewer(msg) if msg.contains("broken")));
    }
}
