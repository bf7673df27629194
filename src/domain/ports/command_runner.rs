//! Command runner port - interface for executing external tools.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

/// Exit status of a finished command invocation.
///
/// Execution problems are values, not errors: a gate maps each variant to
/// its own pass/fail policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandStatus {
    /// Process exited with this code.
    Exited(i32),
    /// Process was killed by a signal.
    Terminated,
    /// Process did not finish within the timeout and was killed.
    TimedOut,
    /// The program could not be found.
    NotFound,
    /// The process could not be started for another reason.
    SpawnFailed(String),
}

/// Exit code shells use for "command not found".
pub const SHELL_NOT_FOUND_EXIT: i32 = 127;

/// A command to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub timeout: Duration,
    /// Text written to the process's stdin, if any.
    pub stdin: Option<String>,
}

impl CommandRequest {
    pub fn new(program: impl Into<String>, working_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
            timeout,
            stdin: None,
        }
    }

    /// Run `command` through `sh -c`.
    pub fn shell(command: &str, working_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self::new("sh", working_dir, timeout).args(["-c", command])
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Human-readable command line for logs and gate reasons.
    pub fn display(&self) -> String {
        if self.program == "sh" && self.args.len() == 2 && self.args[0] == "-c" {
            return self.args[1].clone();
        }
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub status: CommandStatus,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl CommandOutcome {
    pub fn new(status: CommandStatus) -> Self {
        Self {
            status,
            stdout: String::new(),
            stderr: String::new(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn success(&self) -> bool {
        self.status == CommandStatus::Exited(0)
    }

    /// Whether the tool itself is absent, as opposed to having run and failed.
    pub fn tool_missing(&self) -> bool {
        matches!(
            self.status,
            CommandStatus::NotFound | CommandStatus::Exited(SHELL_NOT_FOUND_EXIT)
        )
    }

    /// Last non-empty line of combined output, for gate reasons.
    pub fn tail(&self) -> Option<&str> {
        self.stderr
            .lines()
            .chain(self.stdout.lines())
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .last()
    }
}

/// Executes external commands under a caller-supplied timeout.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the command to completion or until the timeout elapses.
    async fn run(&self, request: &CommandRequest) -> CommandOutcome;
}
